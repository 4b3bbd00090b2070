//! cue-splitter core - backend logic for splitting cuesheet album images.
//!
//! This crate contains all business logic with zero UI dependencies.
//! It can be used by the command-line front end or a GUI.

pub mod cancel;
pub mod config;
pub mod cover;
pub mod cuesheet;
pub mod hooks;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod naming;
pub mod orchestrator;
pub mod tagging;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
