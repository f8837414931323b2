use crate::attenuation::AttenuationPolicy;
use crate::config::error::{ConfigError, Result};
use chrono::FixedOffset;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "QUAKE_TRIAGE";
const APP_DIR: &str = "quake-triage";

/// Root triage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Step table and FAR ceiling
    #[serde(default)]
    pub attenuation: AttenuationPolicy,

    /// Run-time knobs for the engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Location resolver data
    #[serde(default)]
    pub gazetteer: GazetteerConfig,
}

/// Engine execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-lookup timeout before degrading to FAR
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    /// Upper bound on in-flight account evaluations
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Offset applied to timestamps without a zone, e.g. "+09:00"
    #[serde(default = "default_utc_offset")]
    pub default_utc_offset: String,

    /// Enable schema validation
    #[serde(default = "default_true")]
    pub schema_validation: bool,
}

impl EngineConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Parsed `default_utc_offset`.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.default_utc_offset).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "engine.default_utc_offset '{}' is not of the form +HH:MM",
                self.default_utc_offset
            ))
        })
    }
}

/// Gazetteer sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerConfig {
    /// Extra centroid file (JSON array of entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Seed with the bundled prefecture centroids
    #[serde(default = "default_true")]
    pub include_builtin: bool,
}

fn default_lookup_timeout_ms() -> u64 {
    500
}
fn default_max_concurrency() -> usize {
    64
}
fn default_utc_offset() -> String {
    "+09:00".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: default_lookup_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            default_utc_offset: default_utc_offset(),
            schema_validation: default_true(),
        }
    }
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            path: None,
            include_builtin: default_true(),
        }
    }
}

/// `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let sign = match raw.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let (hours, minutes) = raw[1..].split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (QUAKE_TRIAGE_ prefix)
    pub fn load(&self) -> Result<TriageConfig> {
        let mut builder = Config::builder();

        let defaults_json = serde_json::to_string(&TriageConfig::default())?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // QUAKE_TRIAGE_ENGINE__LOOKUP_TIMEOUT_MS=200
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let triage_config: TriageConfig = builder.build()?.try_deserialize()?;

        if triage_config.engine.schema_validation {
            let validator = crate::config::validator::SchemaValidator::new()?;
            validator.validate(&triage_config)?;
        }
        triage_config.engine.utc_offset()?;
        if triage_config.engine.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_concurrency must be at least 1".to_string(),
            ));
        }

        tracing::debug!(
            path = ?self.config_path,
            lookup_timeout_ms = triage_config.engine.lookup_timeout_ms,
            max_concurrency = triage_config.engine.max_concurrency,
            "Configuration loaded"
        );
        Ok(triage_config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./quake-triage.toml
    /// 2. XDG config: ~/.config/quake-triage/config.toml
    /// 3. Home directory: ~/.quake-triage.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from(format!("./{APP_DIR}.toml"));
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join(APP_DIR).join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(format!(".{APP_DIR}.toml")))
            .filter(|path| path.exists())
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<TriageConfig> {
        match Self::find_config_file() {
            Some(path) => ConfigLoader::new().with_file(path).load(),
            None => ConfigLoader::new().load(),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
