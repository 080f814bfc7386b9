use std::fmt;

use crate::{paths, referral, slug};

#[derive(Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub daemon: Option<DaemonConfig>,
    pub referral: Option<ReferralConfig>,
    pub domains: Option<DomainsConfig>,
}

#[derive(Default, serde::Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub debug: bool,
}

#[derive(Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReferralConfig {
    pub secret: Option<Secret>,
    pub length: Option<usize>,
}

#[derive(Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainsConfig {
    pub max_tries: Option<usize>,
}

/// HMAC key for referral codes. Never printed.
#[derive(Clone, serde::Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Config {
    /// `REFCODE_SECRET` wins over the config file. Empty values count as
    /// missing.
    pub fn referral_secret(&self) -> Result<Secret, referral::Error> {
        std::env::var("REFCODE_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(Secret)
            .or_else(|| {
                self.referral
                    .as_ref()
                    .and_then(|r| r.secret.clone())
                    .filter(|s| !s.0.is_empty())
            })
            .ok_or(referral::Error::MissingSecret)
    }

    pub fn referral_length(&self) -> usize {
        self.referral
            .as_ref()
            .and_then(|r| r.length)
            .unwrap_or(referral::DEFAULT_LENGTH)
    }

    pub fn domain_max_tries(&self) -> usize {
        self.domains
            .as_ref()
            .and_then(|d| d.max_tries)
            .unwrap_or(slug::DEFAULT_MAX_TRIES)
    }
}

pub fn load() -> anyhow::Result<Config> {
    let path = paths::config_dir()?.join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.referral_length(), 12);
        assert_eq!(config.domain_max_tries(), 50);
    }

    #[test]
    fn test_parses_kebab_case_keys() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            debug = true

            [referral]
            secret = "hunter2"
            length = 16

            [domains]
            max-tries = 5
            "#,
        )
        .unwrap();

        assert!(config.daemon.as_ref().unwrap().debug);
        let referral = config.referral.as_ref().unwrap();
        assert_eq!(referral.secret.as_ref().unwrap().expose(), "hunter2");
        assert_eq!(config.referral_length(), 16);
        assert_eq!(config.domain_max_tries(), 5);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret("hunter2".to_string());
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
