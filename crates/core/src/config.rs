//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the stores. Nothing in
//! this crate reads environment variables while a run is in progress.

use crate::constants::{DEFAULT_ANSWER_DIR, DEFAULT_PROTOCOL_DIR};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    protocol_dir: PathBuf,
    answer_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if either path is empty, or if both point at the same
    /// directory (answer logs must never land among protocol definitions).
    pub fn new(protocol_dir: PathBuf, answer_dir: PathBuf) -> CoreResult<Self> {
        if protocol_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "protocol_dir cannot be empty".into(),
            ));
        }
        if answer_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput("answer_dir cannot be empty".into()));
        }
        if protocol_dir == answer_dir {
            return Err(CoreError::InvalidInput(
                "protocol_dir and answer_dir must differ".into(),
            ));
        }

        Ok(Self {
            protocol_dir,
            answer_dir,
        })
    }

    pub fn protocol_dir(&self) -> &Path {
        &self.protocol_dir
    }

    pub fn answer_dir(&self) -> &Path {
        &self.answer_dir
    }
}

/// Build a `CoreConfig` from optional raw values (typically environment variables).
///
/// Empty or whitespace-only values fall back to the defaults.
pub fn core_config_from_env_values(
    protocol_dir: Option<String>,
    answer_dir: Option<String>,
) -> CoreResult<CoreConfig> {
    fn or_default(value: Option<String>, default: &str) -> PathBuf {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    }

    CoreConfig::new(
        or_default(protocol_dir, DEFAULT_PROTOCOL_DIR),
        or_default(answer_dir, DEFAULT_ANSWER_DIR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults() {
        let cfg = core_config_from_env_values(None, Some("   ".into())).expect("defaults");
        assert_eq!(cfg.protocol_dir(), Path::new(DEFAULT_PROTOCOL_DIR));
        assert_eq!(cfg.answer_dir(), Path::new(DEFAULT_ANSWER_DIR));
    }

    #[test]
    fn uses_provided_values() {
        let cfg = core_config_from_env_values(Some(" /srv/protocols ".into()), Some("/srv/out".into()))
            .expect("explicit");
        assert_eq!(cfg.protocol_dir(), Path::new("/srv/protocols"));
        assert_eq!(cfg.answer_dir(), Path::new("/srv/out"));
    }

    #[test]
    fn rejects_shared_directory() {
        let err = CoreConfig::new("data".into(), "data".into()).expect_err("same dir");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("must differ")));
    }

    #[test]
    fn rejects_empty_paths() {
        let err = CoreConfig::new(PathBuf::new(), "answers".into()).expect_err("empty");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("protocol_dir")));
    }
}
