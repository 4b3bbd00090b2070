//! Configuration management for cue-splitter.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use cuesplit_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(ConfigManager::default_path());
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().pipeline.embed_cover = true;
//! config.update_section(ConfigSection::Pipeline).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    auto_concurrency, ConfigSection, EncodingSettings, HookSettings, LoggingSettings,
    PathSettings, PipelineSettings, Settings, ToolSettings,
};
