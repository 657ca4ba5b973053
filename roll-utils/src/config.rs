use sheet_dice_roll::Placeholders;
use std::{convert::TryInto, path::Path, time::Duration};
use toml::{map::Map, Value};

pub const DEFAULT_RNG_WORKERS: u32 = 4;
pub const DEFAULT_RNG_RESEED_S: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct RollerConfig {
    pub rng_workers: u32,
    pub rng_reseed: Duration,
    /// Extra values substituted into every text expression. A bonus damage
    /// passed with a request overrides the `DB` entry here.
    pub placeholders: Placeholders,
}

impl Default for RollerConfig {
    fn default() -> Self {
        RollerConfig {
            rng_workers: DEFAULT_RNG_WORKERS,
            rng_reseed: Duration::from_secs(DEFAULT_RNG_RESEED_S),
            placeholders: Placeholders::new(),
        }
    }
}

impl RollerConfig {
    /// Reads the config file, falling back to the defaults for anything that
    /// is missing or unreadable.
    pub fn load<P: AsRef<Path>>(config_path: P) -> RollerConfig {
        let config_path = config_path.as_ref();
        let mut config: Map<String, Value> = match std::fs::read_to_string(config_path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(a) => a,
                Err(e) => {
                    log::warn!("Unable to parse config: {}", e);
                    Map::new()
                }
            },
            Err(e) => {
                log::warn!(
                    "Unable to read config file {}: {}",
                    config_path.display(),
                    e
                );
                Map::new()
            }
        };
        RollerConfig::from_config(&mut config)
    }

    /// Missing keys are filled in with their defaults, so the map can be
    /// written back as a complete config.
    pub fn from_config(config: &mut Map<String, Value>) -> RollerConfig {
        let rng_workers: u32 = match config
            .get("rng_workers")
            .and_then(|t| t.as_integer())
            .and_then(|t| t.try_into().ok())
            .filter(|t| *t > 0)
        {
            Some(t) => t,
            None => {
                log::warn!(
                    "unable to read rng_workers, overwriting with {}",
                    DEFAULT_RNG_WORKERS
                );
                config.insert(
                    "rng_workers".to_string(),
                    Value::from(DEFAULT_RNG_WORKERS),
                );
                DEFAULT_RNG_WORKERS
            }
        };
        let rng_reseed = Duration::from_secs(
            match config
                .get("rng_reseed_s")
                .and_then(|t| t.as_integer())
                .and_then(|t| t.try_into().ok())
                .filter(|t| *t > 0)
            {
                Some(t) => t,
                None => {
                    log::warn!(
                        "unable to read rng_reseed_s, overwriting with {}",
                        DEFAULT_RNG_RESEED_S
                    );
                    config.insert(
                        "rng_reseed_s".to_string(),
                        Value::from(DEFAULT_RNG_RESEED_S as i64),
                    );
                    DEFAULT_RNG_RESEED_S
                }
            },
        );
        RollerConfig {
            rng_workers,
            rng_reseed,
            placeholders: read_placeholders(config),
        }
    }
}

fn read_placeholders(config: &Map<String, Value>) -> Placeholders {
    let mut placeholders = Placeholders::new();
    match config.get("placeholders") {
        None => {}
        Some(Value::Table(table)) => {
            for (name, value) in table.iter() {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Integer(i) => i.to_string(),
                    _ => {
                        log::warn!("ignoring placeholder {}: value must be a string or integer", name);
                        continue;
                    }
                };
                if let Err(e) = placeholders.insert(name, value) {
                    log::warn!("ignoring placeholder: {}", e);
                }
            }
        }
        Some(_) => log::warn!("unable to read placeholders, expected a table"),
    }
    placeholders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Map<String, Value> {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_full_config() {
        let mut config = parse(
            r#"
            rng_workers = 2
            rng_reseed_s = 60

            [placeholders]
            DB = "1d4"
            STR = 3
            "#,
        );
        let roller = RollerConfig::from_config(&mut config);
        assert_eq!(roller.rng_workers, 2);
        assert_eq!(roller.rng_reseed, Duration::from_secs(60));
        assert_eq!(roller.placeholders.get("DB"), Some("1d4"));
        assert_eq!(roller.placeholders.get("STR"), Some("3"));
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let mut config = parse("rng_workers = \"many\"\nrng_reseed_s = 0\n");
        let roller = RollerConfig::from_config(&mut config);
        assert_eq!(roller, RollerConfig::default());
        assert_eq!(config.get("rng_workers").and_then(|v| v.as_integer()), Some(4));
        assert_eq!(config.get("rng_reseed_s").and_then(|v| v.as_integer()), Some(300));
    }

    #[test]
    fn test_bad_placeholders_are_skipped() {
        let mut config = parse(
            r#"
            [placeholders]
            db = "1"
            KH = "2"
            DEX = true
            CON = "1d6"
            "#,
        );
        let roller = RollerConfig::from_config(&mut config);
        assert_eq!(roller.placeholders.get("CON"), Some("1d6"));
        assert_eq!(roller.placeholders.get("db"), None);
        assert_eq!(roller.placeholders.get("KH"), None);
        assert_eq!(roller.placeholders.get("DEX"), None);
    }

    #[test]
    fn test_missing_file() {
        let roller = RollerConfig::load("/nonexistent/sheet-roller.toml");
        assert_eq!(roller, RollerConfig::default());
    }
}
