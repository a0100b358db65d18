use crate::engine::FeeInputs;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Skills and standings used when a request does not supply its own.
    pub default_fees: FeeInputs,
    pub reconcile_mode: ReconcileMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    Sequential,
    /// One blocking worker per item.
    Parallel,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let accounting_level = parse_level(&env_map, "ACCOUNTING_LEVEL")?;
        let broker_relations_level = parse_level(&env_map, "BROKER_RELATIONS_LEVEL")?;
        let corp_standing = parse_standing(&env_map, "CORP_STANDING")?;
        let faction_standing = parse_standing(&env_map, "FACTION_STANDING")?;

        let reconcile_mode = match env_map
            .get("RECONCILE_MODE")
            .map(|s| s.as_str())
            .unwrap_or("sequential")
        {
            "sequential" => ReconcileMode::Sequential,
            "parallel" => ReconcileMode::Parallel,
            other => {
                return Err(ConfigError::InvalidValue(
                    "RECONCILE_MODE".to_string(),
                    format!("must be sequential or parallel, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            default_fees: FeeInputs::new(accounting_level, broker_relations_level)
                .with_standings(corp_standing, faction_standing),
            reconcile_mode,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            default_fees: FeeInputs::default(),
            reconcile_mode: ReconcileMode::Sequential,
        }
    }
}

fn parse_level(env_map: &HashMap<String, String>, key: &str) -> Result<i64, ConfigError> {
    let level = env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or("0")
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be an integer".to_string()))?;
    if !(0..=5).contains(&level) {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 0 and 5, got {}", level),
        ));
    }
    Ok(level)
}

fn parse_standing(env_map: &HashMap<String, String>, key: &str) -> Result<f64, ConfigError> {
    let standing = env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or("0")
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a number".to_string()))?;
    if !standing.is_finite() || !(-10.0..=10.0).contains(&standing) {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between -10 and 10, got {}", standing),
        ));
    }
    Ok(standing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_fees, FeeInputs::default());
        assert_eq!(config.reconcile_mode, ReconcileMode::Sequential);
    }

    #[test]
    fn test_skills_and_standings() {
        let config = Config::from_env_map(env(&[
            ("PORT", "9000"),
            ("ACCOUNTING_LEVEL", "4"),
            ("BROKER_RELATIONS_LEVEL", "3"),
            ("CORP_STANDING", "2.5"),
            ("FACTION_STANDING", "-1"),
            ("RECONCILE_MODE", "parallel"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_fees.accounting_level, 4);
        assert_eq!(config.default_fees.broker_relations_level, 3);
        assert_eq!(config.default_fees.corp_standing, 2.5);
        assert_eq!(config.default_fees.faction_standing, -1.0);
        assert_eq!(config.reconcile_mode, ReconcileMode::Parallel);
    }

    #[test]
    fn test_invalid_port() {
        match Config::from_env_map(env(&[("PORT", "not_a_number")])) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_level_out_of_range() {
        match Config::from_env_map(env(&[("ACCOUNTING_LEVEL", "6")])) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "ACCOUNTING_LEVEL"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_standing_out_of_range() {
        match Config::from_env_map(env(&[("FACTION_STANDING", "10.5")])) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "FACTION_STANDING"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_reconcile_mode() {
        match Config::from_env_map(env(&[("RECONCILE_MODE", "lifo")])) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "RECONCILE_MODE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
