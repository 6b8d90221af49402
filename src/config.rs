use crate::content::{ContentId, GatewayFetcher, IpfsFetcher, KuboFetcher};

use hyper::{HeaderMap, Uri};
use serde::Deserialize;
use std::net::SocketAddr;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error(r#"threads must be a positive number or "cores", not {0:?}"#)]
    Threads(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ThreadsValue")]
pub enum ConfigThreads {
    Custom(NonZeroUsize),
    Cores,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ThreadsValue {
    Number(NonZeroUsize),
    Word(String),
}

impl TryFrom<ThreadsValue> for ConfigThreads {
    type Error = ConfigError;

    fn try_from(value: ThreadsValue) -> Result<Self, Self::Error> {
        match value {
            ThreadsValue::Number(threads) => Ok(Self::Custom(threads)),
            ThreadsValue::Word(word) if word.eq_ignore_ascii_case("cores") => Ok(Self::Cores),
            ThreadsValue::Word(word) => Err(ConfigError::Threads(word)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayUri(#[serde(with = "http_serde::uri")] pub Uri);

#[derive(Debug, Deserialize)]
pub struct IpfsConfig {
    #[serde(default = "KuboFetcher::default_api", with = "http_serde::uri")]
    pub api: Uri,
    #[serde(default)]
    pub gateway: Option<GatewayUri>,
    #[serde(default = "IpfsConfig::default_timeout")]
    pub timeout: NonZeroU64,
}

impl IpfsConfig {
    fn default_timeout() -> NonZeroU64 {
        NonZeroU64::new(KuboFetcher::default_timeout().as_secs()).unwrap_or(NonZeroU64::MIN)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.get())
    }

    pub fn fetcher(&self) -> IpfsFetcher {
        match &self.gateway {
            Some(GatewayUri(gateway)) => {
                IpfsFetcher::Gateway(GatewayFetcher::new(gateway.clone(), self.timeout()))
            }
            None => IpfsFetcher::Kubo(KuboFetcher::new(self.api.clone(), self.timeout())),
        }
    }
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api: KuboFetcher::default_api(),
            gateway: None,
            timeout: Self::default_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,
    #[serde(default = "Config::default_threads")]
    pub threads: ConfigThreads,
    #[serde(default = "Config::default_log_level")]
    pub log_level: log::Level,
    #[serde(default = "Config::default_ip_headers")]
    pub ip_headers: Vec<String>,
    #[serde(default = "Config::default_ip_headers_recursive")]
    pub ip_headers_recursive: bool,
    #[serde(default, with = "http_serde::header_map")]
    pub response_headers: HeaderMap,
    #[serde(default)]
    pub root: Option<ContentId>,
    #[serde(default)]
    pub ipfs: IpfsConfig,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 8080).into()
    }

    fn default_threads() -> ConfigThreads {
        ConfigThreads::Cores
    }

    fn default_log_level() -> log::Level {
        log::Level::Info
    }

    fn default_ip_headers() -> Vec<String> {
        vec!["X-FORWARDED-FOR".into()]
    }

    fn default_ip_headers_recursive() -> bool {
        true
    }
}

pub fn parse_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let toml_string = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&toml_string)?;
    Ok(config)
}
