//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. Read and strip a UTF-8 BOM
//! 3. YAML parsing into [`ChoreographyConfig`]
//! 4. Validation (errors abort, warnings are returned)

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::schema::ChoreographyConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};

/// Limits applied before a configuration is parsed.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("STAGEHAND_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: ChoreographyConfig,

    /// Warnings found during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
    strict: bool,
}

impl ConfigLoader {
    /// Creates a loader with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the size limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ConfigLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Treats validation warnings as errors.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if the file does not exist,
    /// `ConfigError::Unreadable` if it cannot be read as UTF-8 text,
    /// `ConfigError::InvalidValue` if it exceeds the size limit,
    /// `ConfigError::ParseError` on malformed YAML and
    /// `ConfigError::ValidationError` if validation finds errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|e| read_error(path, e))?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        self.check_size(file_size)?;

        let raw = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;

        self.load_str(&raw, path)
    }

    /// Parses and validates configuration text; `origin` labels errors.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file access errors.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        self.check_size(raw.len())?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let config: ChoreographyConfig =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let result = Validator::new().validate(&config);
        let (mut errors, warnings) = (result.errors, result.warnings);
        if self.strict {
            errors.extend(warnings.iter().cloned());
        }
        if !errors.is_empty() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors,
            });
        }

        for issue in &warnings {
            warn!(origin = %origin.display(), "{issue}");
        }
        Ok(LoadResult { config, warnings })
    }

    fn check_size(&self, size: usize) -> Result<(), ConfigError> {
        if size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }
        Ok(())
    }
}

/// Loads `path` when given, or returns the built-in choreography.
///
/// # Errors
///
/// Propagates [`ConfigLoader::load`] errors.
pub fn load_or_default(path: Option<&PathBuf>) -> Result<LoadResult, ConfigError> {
    match path {
        Some(path) => ConfigLoader::new().load(path),
        None => {
            let config = ChoreographyConfig::default();
            let warnings = Validator::new().validate(&config).warnings;
            Ok(LoadResult { config, warnings })
        }
    }
}

fn read_error(path: &Path, source: std::io::Error) -> ConfigError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ConfigError::MissingFile {
            path: path.to_path_buf(),
        }
    } else {
        ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
