use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::ApiArgs;

pub const DEFAULT_LIST_BASE_URL: &str = "https://api.myanimelist.net/v2";
pub const DEFAULT_DETAIL_BASE_URL: &str = "https://api.jikan.moe/v4";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const LIST_BASE_URL_VAR: &str = "ANILYTICS_LIST_BASE_URL";
const DETAIL_BASE_URL_VAR: &str = "ANILYTICS_DETAIL_BASE_URL";
const CLIENT_ID_VAR: &str = "ANILYTICS_CLIENT_ID";
const TIMEOUT_SECS_VAR: &str = "ANILYTICS_TIMEOUT_SECS";

#[derive(Clone)]
pub struct ApiConfig {
    pub list_base_url: String,
    pub detail_base_url: String,
    pub client_id: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("list_base_url", &self.list_base_url)
            .field("detail_base_url", &self.detail_base_url)
            .field("client_id", &self.client_id.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let timeout_secs = match non_empty(TIMEOUT_SECS_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroU64>()
                .with_context(|| format!("parse {TIMEOUT_SECS_VAR}={raw:?} (whole seconds, at least 1)"))?
                .get(),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            list_base_url: non_empty(LIST_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_LIST_BASE_URL.to_owned()),
            detail_base_url: non_empty(DETAIL_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_DETAIL_BASE_URL.to_owned()),
            client_id: non_empty(CLIENT_ID_VAR),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Flags given on the command line take precedence over the environment.
    pub fn with_overrides(mut self, args: &ApiArgs) -> Self {
        if let Some(url) = args.list_base_url.clone() {
            self.list_base_url = url;
        }
        if let Some(url) = args.detail_base_url.clone() {
            self.detail_base_url = url;
        }
        if let Some(client_id) = args.client_id.clone() {
            self.client_id = Some(client_id);
        }
        if let Some(secs) = args.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        self
    }

    pub fn resolve(args: &ApiArgs) -> anyhow::Result<Self> {
        let config = Self::from_env()
            .context("read api config from environment")?
            .with_overrides(args);
        anyhow::ensure!(
            !config.timeout.is_zero(),
            "request timeout must be at least 1 second"
        );
        Ok(config)
    }

    pub fn require_client_id(&self) -> anyhow::Result<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing list API client id (--client-id or {CLIENT_ID_VAR})"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = ApiConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.list_base_url, DEFAULT_LIST_BASE_URL);
        assert_eq!(config.detail_base_url, DEFAULT_DETAIL_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.require_client_id().is_err());
    }

    #[test]
    fn flags_override_environment() {
        let config = ApiConfig::from_lookup(lookup(&[
            (CLIENT_ID_VAR, "from-env"),
            (TIMEOUT_SECS_VAR, "5"),
        ]))
        .expect("config")
        .with_overrides(&ApiArgs {
            client_id: Some("from-flag".to_owned()),
            ..ApiArgs::default()
        });
        assert_eq!(config.require_client_id().expect("client id"), "from-flag");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "soon")])).unwrap_err();
        assert!(format!("{err:#}").contains(TIMEOUT_SECS_VAR));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "0")])).unwrap_err();
        assert!(format!("{err:#}").contains(TIMEOUT_SECS_VAR));
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        let err = ApiConfig::resolve(&ApiArgs {
            timeout_secs: Some(0),
            ..ApiArgs::default()
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("at least 1 second"));
    }

    #[test]
    fn debug_output_redacts_client_id() {
        let config = ApiConfig::from_lookup(lookup(&[(CLIENT_ID_VAR, "s3cret")])).expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
