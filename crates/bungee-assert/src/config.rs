use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable selecting the guard's [`TrapPolicy`].
pub const FP_TRAPS_VAR: &str = "BUNGEE_FP_TRAPS";

/// How a floating-point guard uses hardware trap-on-occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapPolicy {
    /// Trap where the platform can, otherwise check flags at scope exit.
    #[default]
    Auto,
    /// Never trap; violations are found by the flag check at scope exit.
    FlagsOnly,
    /// Trap support is mandatory; its absence is an assertion failure.
    Require,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("BUNGEE_FP_TRAPS={0:?} is not one of auto, off, flags, require, on")]
    UnknownTrapPolicy(String),
}

impl FromStr for TrapPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(TrapPolicy::Auto),
            "off" | "flags" => Ok(TrapPolicy::FlagsOnly),
            "require" | "on" => Ok(TrapPolicy::Require),
            _ => Err(ConfigError::UnknownTrapPolicy(s.to_owned())),
        }
    }
}

/// Process-wide settings, read from the environment once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub trap_policy: TrapPolicy,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        if let Some(val) = lookup(FP_TRAPS_VAR) {
            config.trap_policy = val.parse()?;
        }
        Ok(config)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// The cached configuration, loading it on first use.
///
/// A malformed variable is logged and replaced by defaults: a typo in a
/// debugging knob should not change what the program computes.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(|| match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::warn!("{err}; using defaults");
            Config::default()
        }
    })
}

pub fn trap_policy() -> TrapPolicy {
    get().trap_policy
}
