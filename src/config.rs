//! Search configuration and difficulty profiles.
//!
//! [`MctsConfig`] is the immutable parameter set handed to a search engine.
//! Three built-in profiles exist (normal, hard, god); a TOML file can
//! override any key per profile or for all profiles at once:
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [mcts.default]
//! confidence_value = 2.0
//!
//! [mcts.hard]
//! max_count = 4000
//! rave_param = "none"
//! ```
//!
//! Each key is taken from the profile section, else from `[mcts.default]`,
//! else from the built-in profile.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "C4MCTS_CONFIG";
/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV_VAR: &str = "C4MCTS_LOG_LEVEL";

/// Standard locations to search for connect4.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "connect4.toml",    // Current directory
    "../connect4.toml", // Parent directory (when running from subdirectory)
];

/// Configuration for one Monte Carlo Tree Search player.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Number of simulations per search.
    pub max_count: u32,

    /// Maximum number of tree nodes walked per simulation before the
    /// rollout takes over.
    pub max_depth: usize,

    /// Weight of the exploration term in UCB1.
    pub confidence_value: f64,

    /// RAVE decay parameter. `None` disables AMAF blending.
    pub rave_param: Option<f64>,

    /// Keep the tree between moves of the same game.
    pub reuse_tree: bool,

    /// Sample the played move from the visit distribution instead of
    /// playing the best one.
    pub randomize_action: bool,

    /// Share of the rollout result in the backed-up reward; the rest comes
    /// from the evaluator estimate. 0 skips rollouts entirely.
    pub rollout_weight: f64,

    /// Temperature of the visit distribution used by `randomize_action`.
    pub temperature: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Difficulty::Normal.config()
    }
}

impl MctsConfig {
    /// Builder pattern: set number of simulations.
    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    /// Builder pattern: set selection depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_confidence_value(mut self, confidence_value: f64) -> Self {
        self.confidence_value = confidence_value;
        self
    }

    pub fn with_rave_param(mut self, rave_param: Option<f64>) -> Self {
        self.rave_param = rave_param;
        self
    }

    pub fn with_reuse_tree(mut self, reuse_tree: bool) -> Self {
        self.reuse_tree = reuse_tree;
        self
    }

    pub fn with_randomize_action(mut self, randomize_action: bool) -> Self {
        self.randomize_action = randomize_action;
        self
    }

    pub fn with_rollout_weight(mut self, rollout_weight: f64) -> Self {
        self.rollout_weight = rollout_weight;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Rejects parameter combinations the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_count == 0 {
            return Err(invalid("max_count", "must be at least 1"));
        }
        if !(self.confidence_value >= 0.0 && self.confidence_value.is_finite()) {
            return Err(invalid(
                "confidence_value",
                format!("must be a non-negative number, got {}", self.confidence_value),
            ));
        }
        if let Some(rave) = self.rave_param {
            if !(rave >= 0.0 && rave.is_finite()) {
                return Err(invalid(
                    "rave_param",
                    format!("must be a non-negative number or \"none\", got {}", rave),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.rollout_weight) {
            return Err(invalid(
                "rollout_weight",
                format!("must lie in [0, 1], got {}", self.rollout_weight),
            ));
        }
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(invalid(
                "temperature",
                format!("must be positive, got {}", self.temperature),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Named strength profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Normal,
    Hard,
    God,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Normal, Difficulty::Hard, Difficulty::God];

    /// Profile name as used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::God => "god",
        }
    }

    /// Built-in parameters of this profile
    pub fn config(self) -> MctsConfig {
        let (max_count, max_depth, rave_param) = match self {
            Difficulty::Normal => (500, 2, None),
            Difficulty::Hard => (2000, 5, Some(1.0)),
            Difficulty::God => (10000, 100, Some(1.0)),
        };
        MctsConfig {
            max_count,
            max_depth,
            confidence_value: 4.0,
            rave_param,
            reuse_tree: true,
            randomize_action: false,
            rollout_weight: 1.0,
            temperature: 1.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownProfile(s.trim().to_string()))
    }
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log: LogConfig,
    profiles: BTreeMap<Difficulty, MctsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            profiles: Difficulty::ALL.into_iter().map(|d| (d, d.config())).collect(),
        }
    }
}

impl AppConfig {
    /// Parameters of a difficulty profile
    pub fn profile(&self, difficulty: Difficulty) -> &MctsConfig {
        &self.profiles[&difficulty]
    }

    /// Parses TOML text; `path` is only used in error messages.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        raw.resolve()
    }
}

/// On-disk layout; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    log: RawLog,
    mcts: BTreeMap<String, RawProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLog {
    level: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawProfile {
    max_count: Option<u32>,
    max_depth: Option<usize>,
    confidence_value: Option<f64>,
    rave_param: Option<RaveSetting>,
    reuse_tree: Option<bool>,
    randomize_action: Option<bool>,
    rollout_weight: Option<f64>,
    temperature: Option<f64>,
}

/// `rave_param` is either a number or the string "none"
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RaveSetting {
    Value(f64),
    Keyword(String),
}

impl RaveSetting {
    fn resolve(&self) -> Result<Option<f64>, ConfigError> {
        match self {
            RaveSetting::Value(v) => Ok(Some(*v)),
            RaveSetting::Keyword(k) if k.eq_ignore_ascii_case("none") => Ok(None),
            RaveSetting::Keyword(k) => Err(invalid(
                "rave_param",
                format!("expected a number or \"none\", got \"{}\"", k),
            )),
        }
    }
}

const DEFAULT_SECTION: &str = "default";

impl RawConfig {
    fn resolve(self) -> Result<AppConfig, ConfigError> {
        for name in self.mcts.keys() {
            if name != DEFAULT_SECTION {
                name.parse::<Difficulty>()?;
            }
        }

        let fallback = self.mcts.get(DEFAULT_SECTION).cloned().unwrap_or_default();
        let mut profiles = BTreeMap::new();
        for difficulty in Difficulty::ALL {
            let section = self
                .mcts
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(difficulty.name()))
                .map(|(_, p)| p.clone())
                .unwrap_or_default();
            let config = merge(&section, &fallback, difficulty.config())?;
            config.validate()?;
            profiles.insert(difficulty, config);
        }

        let log = LogConfig {
            level: self.log.level.unwrap_or_else(|| LogConfig::default().level),
        };
        Ok(AppConfig { log, profiles })
    }
}

/// Per key: profile section, else default section, else built-in value.
fn merge(section: &RawProfile, fallback: &RawProfile, base: MctsConfig) -> Result<MctsConfig, ConfigError> {
    macro_rules! pick {
        ($field:ident) => {
            section.$field.or(fallback.$field).unwrap_or(base.$field)
        };
    }

    let rave_param = match section.rave_param.as_ref().or(fallback.rave_param.as_ref()) {
        Some(setting) => setting.resolve()?,
        None => base.rave_param,
    };

    Ok(MctsConfig {
        max_count: pick!(max_count),
        max_depth: pick!(max_depth),
        confidence_value: pick!(confidence_value),
        rave_param,
        reuse_tree: pick!(reuse_tree),
        randomize_action: pick!(randomize_action),
        rollout_weight: pick!(rollout_weight),
        temperature: pick!(temperature),
    })
}

/// Load the configuration.
///
/// Searches in the following order:
/// 1. Path specified by the `C4MCTS_CONFIG` environment variable
/// 2. Current directory (connect4.toml)
/// 3. Parent directory (../connect4.toml)
///
/// Without a file the built-in profiles are used. Environment overrides are
/// applied last.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config = match find_config_file() {
        Some(path) => load_from_path(&path)?,
        None => {
            debug!("No connect4.toml found, using built-in defaults");
            AppConfig::default()
        }
    };
    Ok(apply_env_overrides(config))
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&path);
        if path.exists() {
            return Some(path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    CONFIG_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load configuration from a specific path, without environment overrides.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = AppConfig::from_toml(&content, path)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Apply environment variable overrides to a configuration.
pub fn apply_env_overrides(config: AppConfig) -> AppConfig {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

fn apply_overrides_from(mut config: AppConfig, lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    if let Some(level) = lookup(LOG_LEVEL_ENV_VAR) {
        debug!("{} overrides log level with {}", LOG_LEVEL_ENV_VAR, level);
        config.log.level = level;
    }
    config
}
