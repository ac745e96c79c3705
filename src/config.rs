//! Runtime settings loaded from `config/config.toml` and the environment
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::reversal::DEFAULT_MIN_REASON_LEN;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "CLAIMS_LEDGER";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_min_reason_len")]
    pub min_reason_len: usize,
    #[serde(default = "default_audit_tree")]
    pub audit_tree: String,
}

fn default_db_path() -> String {
    "data/claims_ledger.db".to_string()
}

fn default_min_reason_len() -> usize {
    DEFAULT_MIN_REASON_LEN
}

fn default_audit_tree() -> String {
    "audit_log".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            min_reason_len: default_min_reason_len(),
            audit_tree: default_audit_tree(),
        }
    }
}

impl LedgerConfig {
    /// Reads the `[ledger]` section of the optional config file, overridden by
    /// `CLAIMS_LEDGER__LEDGER__*` environment variables, for example
    /// `CLAIMS_LEDGER__LEDGER__MIN_REASON_LEN=20`.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(env_source());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config file, falling back to env");
                Config::builder().add_source(env_source()).build()?
            }
        };

        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<LedgerConfig>("ledger") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Ledger configuration could not be loaded: {e}"
            ))),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn missing_section_uses_defaults() {
        let settings = Config::builder().build().unwrap();
        let cfg = LedgerConfig::from_settings(&settings).unwrap();

        assert_eq!(cfg, LedgerConfig::default());
        assert_eq!(cfg.min_reason_len, 10);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str(
                "[ledger]\nmin_reason_len = 20\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg = LedgerConfig::from_settings(&settings).unwrap();

        assert_eq!(cfg.min_reason_len, 20);
        assert_eq!(cfg.audit_tree, "audit_log");
        assert_eq!(cfg.db_path, "data/claims_ledger.db");
    }

    #[test]
    fn environment_overrides_use_the_ledger_section() {
        let vars = config::Map::from([
            ("CLAIMS_LEDGER__LEDGER__MIN_REASON_LEN".to_string(), "25".to_string()),
            ("CLAIMS_LEDGER__LEDGER__AUDIT_TREE".to_string(), "audit_v2".to_string()),
            // without the section segment the value never reaches `[ledger]`
            ("CLAIMS_LEDGER__DB_PATH".to_string(), "ignored.db".to_string()),
        ]);
        let settings = Config::builder()
            .add_source(env_source().source(Some(vars)))
            .build()
            .unwrap();
        let cfg = LedgerConfig::from_settings(&settings).unwrap();

        assert_eq!(cfg.min_reason_len, 25);
        assert_eq!(cfg.audit_tree, "audit_v2");
        assert_eq!(cfg.db_path, "data/claims_ledger.db");
    }
}
