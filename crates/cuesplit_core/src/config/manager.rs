//! Settings file handling.
//!
//! The file is always replaced through a temporary sibling and a rename, so
//! a crash never leaves a half-written config. Single sections can be
//! rewritten with `toml_edit` without touching the rest of the document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, EncodingSettings, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot edit settings file: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("Settings file not found: {}", .0.display())]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file and the in-memory [`Settings`].
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// `<config dir>/cue-splitter/settings.toml`, or `.config/settings.toml`
    /// when the platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("cue-splitter"))
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("settings.toml")
    }

    /// Nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read an existing settings file.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let text = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&text)?;
        Ok(())
    }

    /// Read the settings file, or write a default one when there is none.
    ///
    /// A file with missing or unknown sections, or with an encoder quality
    /// that does not parse, is rewritten in full.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            self.settings = Settings::default();
            return self.save();
        }

        let text = fs::read_to_string(&self.config_path)?;
        let doc: DocumentMut = text.parse()?;
        let mut settings: Settings = toml::from_str(&text)?;
        let mut rewrite = !sections_match(&doc);

        if let Err(e) = settings.encoding.profile() {
            tracing::warn!("Resetting [encoding] to defaults: {}", e);
            settings.encoding = EncodingSettings::default();
            rewrite = true;
        }

        self.settings = settings;
        if rewrite {
            tracing::debug!("Rewriting {}", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Create the output and log folders.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        fs::create_dir_all(self.output_folder())?;
        fs::create_dir_all(self.logs_folder())?;
        Ok(())
    }

    pub fn output_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.output_folder)
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Write every section, each under a short comment.
    pub fn save(&self) -> ConfigResult<()> {
        let mut text = String::from("# cue-splitter settings\n");
        for section in ConfigSection::all() {
            text.push_str(&format!(
                "\n# {}\n[{}]\n{}",
                section.comment(),
                section.table_name(),
                self.section_body(*section)?
            ));
        }
        self.write_atomically(&text)?;
        Ok(())
    }

    /// Replace one table in the file on disk with the in-memory values.
    ///
    /// Other tables keep their on-disk content and comments, including hand
    /// edits made since the file was loaded.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match fs::read_to_string(&self.config_path) {
            Ok(text) => text.parse::<DocumentMut>()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let body: DocumentMut = self.section_body(section)?.parse()?;
        doc[section.table_name()] = Item::Table(body.as_table().clone());

        self.write_atomically(&doc.to_string())?;
        Ok(())
    }

    /// Fields of one section, without its `[header]`.
    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Encoding => toml::to_string_pretty(&s.encoding)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Pipeline => toml::to_string_pretty(&s.pipeline)?,
            ConfigSection::Hooks => toml::to_string_pretty(&s.hooks)?,
        };
        Ok(body)
    }

    fn write_atomically(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.config_path)
    }
}

/// True when the document has exactly the known tables.
fn sections_match(doc: &DocumentMut) -> bool {
    let known = ConfigSection::all();
    let no_unknown = doc
        .iter()
        .all(|(key, _)| known.iter().any(|s| s.table_name() == key));
    let none_missing = known.iter().all(|s| doc.contains_key(s.table_name()));
    no_unknown && none_missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputFormat;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cue-splitter").join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        for section in ConfigSection::all() {
            assert!(content.contains(&format!("[{}]", section.table_name())));
        }
    }

    #[test]
    fn generated_file_loads_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().pipeline.cover_size, 500);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        fs::write(
            &config_path,
            "[paths]\noutput_folder = \"my_music\"\n[encoding]\nformat = \"flac\"\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.output_folder, "my_music");
        assert_eq!(manager.settings().encoding.format, OutputFormat::Flac);

        // Missing sections were written back with defaults
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[tools]"));
        assert!(content.contains("my_music"));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("nope.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        // Hand edit on disk that the in-memory settings do not know about
        let content = fs::read_to_string(&config_path).unwrap();
        fs::write(&config_path, content.replace("rsgain = \"rsgain\"", "rsgain = \"/opt/rsgain\"")).unwrap();

        manager.settings_mut().logging.compact = false;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("/opt/rsgain"));
    }

    #[test]
    fn invalid_quality_resets_encoding() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        fs::write(&config_path, "[encoding]\nformat = \"mp3\"\nmp3_quality = \"V12\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().encoding.format, OutputFormat::Ogg);
        assert!(manager.settings().encoding.profile().is_ok());
        assert!(!fs::read_to_string(&config_path).unwrap().contains("V12"));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }

    #[test]
    fn default_path_ends_with_settings_file() {
        let path = ConfigManager::default_path();
        assert!(path.ends_with("settings.toml"));
    }
}
