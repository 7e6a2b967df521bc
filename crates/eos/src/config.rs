//! Client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use eos_session::SessionConfig;
use eos_world::{BinderConfig, FrameConfig};

use crate::EosError;

/// Which transport carries the login request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// `POST <server_url>/api/login`.
    #[default]
    Http,
    /// One JSON line over a persistent TCP connection to `socket_addr`.
    Socket,
}

impl FromStr for TransportMode {
    type Err = EosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "socket" | "tcp" => Ok(Self::Socket),
            other => Err(EosError::Config(format!(
                "unknown transport {other:?} (expected \"http\" or \"socket\")"
            ))),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Socket => f.write_str("socket"),
        }
    }
}

/// Everything needed to build an [`EosClient`](crate::EosClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the HTTP login service. Default: `http://127.0.0.1:8080`.
    pub server_url: String,
    /// Address of the socket login service. Default: `127.0.0.1:9000`.
    pub socket_addr: String,
    pub transport: TransportMode,
    /// In HTTP mode, also open the socket at `socket_addr` to receive
    /// server pushes. Failing to reach it is logged, not fatal. In socket
    /// mode pushes share the login connection. Default: `true`.
    pub push_channel: bool,
    /// Bound on establishing the socket connection. Default: 5 s.
    pub connect_timeout: Duration,
    pub session: SessionConfig,
    pub binder: BinderConfig,
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            socket_addr: "127.0.0.1:9000".to_string(),
            transport: TransportMode::default(),
            push_channel: true,
            connect_timeout: Duration::from_secs(5),
            session: SessionConfig::default(),
            binder: BinderConfig::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Environment variable overriding [`server_url`](Self::server_url).
    pub const ENV_SERVER_URL: &'static str = "EOS_SERVER_URL";
    /// Environment variable overriding [`socket_addr`](Self::socket_addr).
    pub const ENV_SOCKET_ADDR: &'static str = "EOS_SOCKET_ADDR";
    /// Environment variable overriding [`transport`](Self::transport).
    pub const ENV_TRANSPORT: &'static str = "EOS_TRANSPORT";
    /// Environment variable overriding [`push_channel`](Self::push_channel).
    pub const ENV_PUSH_CHANNEL: &'static str = "EOS_PUSH_CHANNEL";

    /// Defaults, overridden by `EOS_SERVER_URL`, `EOS_SOCKET_ADDR`,
    /// `EOS_TRANSPORT` and `EOS_PUSH_CHANNEL` where set.
    pub fn from_env() -> Result<Self, EosError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, EosError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(Self::ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(addr) = get(Self::ENV_SOCKET_ADDR) {
            self.socket_addr = addr;
        }
        if let Some(mode) = get(Self::ENV_TRANSPORT) {
            self.transport = mode.parse()?;
        }
        if let Some(flag) = get(Self::ENV_PUSH_CHANNEL) {
            self.push_channel = parse_flag(Self::ENV_PUSH_CHANNEL, &flag)?;
        }
        Ok(self)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, EosError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(EosError::Config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}
