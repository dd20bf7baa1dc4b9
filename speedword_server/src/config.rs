use std::{env, path::PathBuf};

use speedword_core::rules::GameRules;

use crate::errors::ConfigError;

pub const ADDR_VAR: &str = "SPEEDWORD_ADDR";
pub const DICT_VAR: &str = "SPEEDWORD_DICT";
pub const STARTING_TILES_VAR: &str = "SPEEDWORD_STARTING_TILES";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
    pub dictionary_path: PathBuf,
    pub starting_tiles: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8888".into(),
            dictionary_path: PathBuf::from("sowpods.txt"),
            starting_tiles: GameRules::default().starting_tiles,
        }
    }
}

impl ServerConfig {
    /// Reads the environment (after `.env` has been loaded). The first
    /// command line argument, if any, overrides the listen address.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok(), env::args().nth(1))
    }

    pub fn from_lookup<F>(lookup: F, addr_override: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = addr_override.or_else(|| lookup(ADDR_VAR)) {
            config.addr = addr;
        }
        if let Some(path) = lookup(DICT_VAR) {
            config.dictionary_path = PathBuf::from(path);
        }
        if let Some(count) = lookup(STARTING_TILES_VAR) {
            config.starting_tiles = match count.trim().parse() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: STARTING_TILES_VAR,
                        value: count,
                        expected: "a positive number",
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn rules(&self) -> GameRules {
        GameRules {
            starting_tiles: self.starting_tiles,
            ..GameRules::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]), None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.rules().starting_tiles, 12);
    }

    #[test]
    fn reads_variables() {
        let config = ServerConfig::from_lookup(
            lookup(&[
                (ADDR_VAR, "127.0.0.1:9000"),
                (DICT_VAR, "/srv/words.txt"),
                (STARTING_TILES_VAR, " 21 "),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.dictionary_path, PathBuf::from("/srv/words.txt"));
        assert_eq!(config.rules().starting_tiles, 21);
    }

    #[test]
    fn argument_beats_environment() {
        let config = ServerConfig::from_lookup(
            lookup(&[(ADDR_VAR, "127.0.0.1:9000")]),
            Some("0.0.0.0:7000".into()),
        )
        .unwrap();
        assert_eq!(config.addr, "0.0.0.0:7000");
    }

    #[test]
    fn rejects_bad_tile_counts() {
        for bad in ["zero", "0", "-3"] {
            let err =
                ServerConfig::from_lookup(lookup(&[(STARTING_TILES_VAR, bad)]), None).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    var: STARTING_TILES_VAR,
                    value: bad.to_string(),
                    expected: "a positive number",
                }
            );
        }
    }
}
