use crate::{
    android::deploy::{Backoff, FailureClassifier},
    opts::DontKill,
    util::cli::{Report, Reportable},
};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const FILE_NAME: &str = "split-deploy.toml";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Deploy {
    #[serde(default)]
    pub dont_kill: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Retry {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> u32 {
    2
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Install {
    pub device_not_found_pattern: Option<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file at {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Failed to parse config file at {path:?}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("`install.device-not-found-pattern` isn't a valid regex: {0}")]
    PatternInvalid(#[from] once_cell_regex::exports::regex::Error),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::ReadFailed { path, source } => {
                Report::error(format!("Failed to read config file at {:?}", path), source)
            }
            Self::ParseFailed { path, source } => Report::error(
                format!("Failed to parse config file at {:?}", path),
                source,
            ),
            Self::PatternInvalid(_) => Report::error("Config is invalid", self),
        }
    }
}

/// Settings read from `split-deploy.toml`. Everything is optional.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub deploy: Deploy,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub install: Install,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::ReadFailed {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| Error::ParseFailed {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads `path` if given; otherwise `split-deploy.toml` in `dir` if it's
    /// there, or the defaults if it isn't.
    pub fn load_or_default(path: Option<&Path>, dir: impl AsRef<Path>) -> Result<Self, Error> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = dir.as_ref().join(FILE_NAME);
                if path.is_file() {
                    log::info!("loading config from {:?}", path);
                    Self::load(path)
                } else {
                    log::info!("no config at {:?}; using defaults", path);
                    Ok(Self::default())
                }
            }
        }
    }

    /// The command line wins over the file.
    pub fn dont_kill(&self, flag: bool) -> DontKill {
        DontKill::from_flag(flag || self.deploy.dont_kill)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
            self.retry.multiplier,
        )
    }

    pub fn classifier(&self) -> Result<FailureClassifier, Error> {
        match self.install.device_not_found_pattern.as_deref() {
            Some(pattern) => Ok(FailureClassifier::with_device_not_found(pattern)?),
            None => Ok(FailureClassifier::default()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::android::deploy::{Decision, FailureKind, RetryPolicy as _};

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backoff(), Backoff::default());
        assert_eq!(config.dont_kill(false), DontKill::No);
        assert_eq!(
            config
                .classifier()
                .unwrap()
                .classify(Some("device 'emulator-5554' not found")),
            FailureKind::DeviceNotFound
        );
    }

    #[test]
    fn test_parse() {
        let config: Config = toml::from_str(
            r#"
            [deploy]
            dont-kill = true

            [retry]
            max-attempts = 5
            initial-delay-ms = 250

            [install]
            device-not-found-pattern = "no device '.*'"
            "#,
        )
        .unwrap();
        assert_eq!(config.dont_kill(false), DontKill::Yes);
        assert_eq!(config.retry.max_delay_ms, 10_000);
        let mut backoff = config.backoff();
        assert_eq!(backoff.max_attempts(), 5);
        assert_eq!(
            backoff.decide(1, FailureKind::Untyped, None),
            Decision::Retry {
                delay: Duration::from_millis(250)
            }
        );
        assert_eq!(
            config.classifier().unwrap().classify(Some("no device 'R58M123'")),
            FailureKind::DeviceNotFound
        );
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("[retry]\nmax-attemps = 5\n").is_err());
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let config: Config =
            toml::from_str("[install]\ndevice-not-found-pattern = \"device '(.*' not found\"\n")
                .unwrap();
        assert!(matches!(config.classifier(), Err(Error::PatternInvalid(_))));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_or_default(None, dir.path()).unwrap(),
            Config::default()
        );
        fs::write(dir.path().join(FILE_NAME), "[deploy]\ndont-kill = true\n").unwrap();
        assert!(Config::load_or_default(None, dir.path()).unwrap().deploy.dont_kill);
        assert!(matches!(
            Config::load_or_default(Some(&dir.path().join("elsewhere.toml")), dir.path()),
            Err(Error::ReadFailed { .. })
        ));
    }
}
