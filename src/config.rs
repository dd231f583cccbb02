//! Configuration loading and constants.
//!
//! Loads application configuration from TOML files and defines constants for
//! the HTTP surface, Cache-Control values, logging defaults, and the Kubernetes
//! deployment contract. `AppConfig` is the root configuration struct; every
//! section has defaults so an empty file (or no file at all) is a valid setup.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::path::Path;

use const_format::{concatcp, formatcp};
use serde::{Deserialize, Serialize};

// =============================================================================
// HTTP Surface
// =============================================================================

/// Route serving the confirmation message
pub const MESSAGE_PATH: &str = "/message";

/// Route used by liveness and readiness probes
pub const HEALTH_PATH: &str = "/health";

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The message never changes while the process runs, so caches may hold it briefly
pub const HTTP_CACHE_MESSAGE_MAX_AGE: u32 = 60;

pub const CACHE_CONTROL_MESSAGE: &str =
    formatcp!("public, max-age={}", HTTP_CACHE_MESSAGE_MAX_AGE);

// =============================================================================
// Server Defaults
// =============================================================================

/// Confirmation string returned by `GET /message`
pub const DEFAULT_MESSAGE: &str = "Message received: kube-message is up and running on Kubernetes!";

/// Listen on all interfaces so the pod IP is reachable
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Container port exposed by the image
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Seconds to drain in-flight requests after SIGTERM. Kubernetes waits 30s
/// before SIGKILL by default.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 25;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "kube_message=info,tower_http=info";

// =============================================================================
// Kubernetes Deployment Contract
// =============================================================================

pub const DEFAULT_APP_NAME: &str = "kube-message";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_IMAGE: &str = concatcp!(DEFAULT_APP_NAME, ":", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_REPLICAS: u32 = 2;
pub const DEFAULT_NODE_PORT: u16 = 30080;

/// Port range the API server accepts for `nodePort`
pub const NODE_PORT_RANGE: RangeInclusive<u16> = 30000..=32767;

/// Longest name Kubernetes accepts for a DNS-1035 label
pub const MAX_APP_NAME_LEN: usize = 63;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Payload served by the message endpoint
    #[serde(default)]
    pub message: MessageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Values rendered into the Deployment and Service manifests
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }

    /// Socket address the listener binds to.
    ///
    /// `host` may be an IPv4 literal, an IPv6 literal with or without brackets,
    /// or a hostname such as `localhost`, which resolves to its first address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let literal = self.host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = literal.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                ConfigError::Validation(format!("Invalid http.host '{}': {}", self.host, e))
            })?
            .next()
            .ok_or_else(|| {
                ConfigError::Validation(format!("http.host '{}' resolved to no address", self.host))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "MessageConfig::default_body")]
    pub body: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            body: Self::default_body(),
        }
    }
}

impl MessageConfig {
    fn default_body() -> String {
        DEFAULT_MESSAGE.to_string()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, for log collectors
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Container image pull policy, serialized the way the Kubernetes API spells it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ImagePullPolicy {
    Always,
    /// Use the image already present in the node's runtime (Minikube's docker daemon)
    #[default]
    IfNotPresent,
    Never,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KubernetesConfig {
    /// Name shared by the Deployment, the Service, the container and the `app` label
    #[serde(default = "KubernetesConfig::default_app_name")]
    pub app_name: String,
    #[serde(default = "KubernetesConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "KubernetesConfig::default_image")]
    pub image: String,
    #[serde(default)]
    pub image_pull_policy: ImagePullPolicy,
    #[serde(default = "KubernetesConfig::default_replicas")]
    pub replicas: u32,
    /// External port opened on every node
    #[serde(default = "KubernetesConfig::default_node_port")]
    pub node_port: u16,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            app_name: Self::default_app_name(),
            namespace: Self::default_namespace(),
            image: Self::default_image(),
            image_pull_policy: ImagePullPolicy::default(),
            replicas: Self::default_replicas(),
            node_port: Self::default_node_port(),
        }
    }
}

impl KubernetesConfig {
    fn default_app_name() -> String {
        DEFAULT_APP_NAME.to_string()
    }
    fn default_namespace() -> String {
        DEFAULT_NAMESPACE.to_string()
    }
    fn default_image() -> String {
        DEFAULT_IMAGE.to_string()
    }
    fn default_replicas() -> u32 {
        DEFAULT_REPLICAS
    }
    fn default_node_port() -> u16 {
        DEFAULT_NODE_PORT
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_dns_label(&self.app_name) {
            return Err(ConfigError::Validation(format!(
                "kubernetes.app_name '{}' must be a lowercase DNS label of at most {} characters",
                self.app_name, MAX_APP_NAME_LEN
            )));
        }
        if !is_dns1123_label(&self.namespace) {
            return Err(ConfigError::Validation(format!(
                "kubernetes.namespace '{}' must be a lowercase RFC 1123 label",
                self.namespace
            )));
        }
        if self.image.trim().is_empty() {
            return Err(ConfigError::Validation(
                "kubernetes.image must not be empty".to_string(),
            ));
        }
        if self.replicas == 0 {
            return Err(ConfigError::Validation(
                "kubernetes.replicas must be at least 1".to_string(),
            ));
        }
        if !NODE_PORT_RANGE.contains(&self.node_port) {
            return Err(ConfigError::Validation(format!(
                "kubernetes.node_port {} is outside {}-{}",
                self.node_port,
                NODE_PORT_RANGE.start(),
                NODE_PORT_RANGE.end()
            )));
        }
        Ok(())
    }
}

/// DNS-1035 label, required for Service names: starts with a letter.
fn is_dns_label(name: &str) -> bool {
    is_dns1123_label(name) && name.as_bytes()[0].is_ascii_lowercase()
}

/// RFC 1123 label, as used for namespaces: lowercase alphanumerics and '-',
/// starting and ending with an alphanumeric.
fn is_dns1123_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    let is_alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    !bytes.is_empty()
        && bytes.len() <= MAX_APP_NAME_LEN
        && is_alnum(&bytes[0])
        && is_alnum(&bytes[bytes.len() - 1])
        && bytes.iter().all(|b| is_alnum(b) || *b == b'-')
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load an explicitly requested file, or fall back to the default path.
    ///
    /// An explicit path that does not exist is an error. A missing default
    /// file means "run with built-in defaults", which is how the container
    /// image starts when no config is mounted.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_or_default_at(path, Path::new(DEFAULT_CONFIG_PATH))
    }

    /// [`AppConfig::load_or_default`] with the fallback location made explicit.
    pub fn load_or_default_at(
        path: Option<&Path>,
        default_path: &Path,
    ) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation(
                "http.port must be non-zero".to_string(),
            ));
        }
        self.http.bind_addr()?;

        if self.message.body.is_empty() {
            return Err(ConfigError::Validation(
                "message.body must not be empty".to_string(),
            ));
        }

        self.kubernetes.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.message.body, DEFAULT_MESSAGE);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.kubernetes.replicas, 2);
        assert_eq!(config.kubernetes.node_port, 30080);
        assert_eq!(config.kubernetes.image_pull_policy, ImagePullPolicy::IfNotPresent);
    }

    #[test]
    fn test_default_image_tracks_crate_version() {
        assert_eq!(
            DEFAULT_IMAGE,
            format!("kube-message:{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_cache_control_value() {
        assert_eq!(CACHE_CONTROL_MESSAGE, "public, max-age=60");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [http]
            port = 9090

            [message]
            body = "pong"

            [logging]
            format = "json"

            [kubernetes]
            replicas = 3
            image_pull_policy = "Never"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.host, DEFAULT_HTTP_HOST);
        assert_eq!(config.message.body, "pong");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.kubernetes.replicas, 3);
        assert_eq!(config.kubernetes.image_pull_policy, ImagePullPolicy::Never);
        assert_eq!(config.kubernetes.node_port, DEFAULT_NODE_PORT);
    }

    #[test]
    fn test_rejects_zero_port() {
        let err = AppConfig::from_toml("[http]\nport = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_bad_host() {
        let err = AppConfig::from_toml("[http]\nhost = \"not a host\"\n").unwrap_err();
        assert!(err.to_string().contains("http.host"));
    }

    #[test]
    fn test_rejects_empty_message() {
        let err = AppConfig::from_toml("[message]\nbody = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("message.body"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let err = AppConfig::from_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_node_port_outside_range() {
        let err = AppConfig::from_toml("[kubernetes]\nnode_port = 8080\n").unwrap_err();
        assert!(err.to_string().contains("node_port"));

        let err = AppConfig::from_toml("[kubernetes]\nnode_port = 32768\n").unwrap_err();
        assert!(err.to_string().contains("node_port"));

        assert!(AppConfig::from_toml("[kubernetes]\nnode_port = 30000\n").is_ok());
        assert!(AppConfig::from_toml("[kubernetes]\nnode_port = 32767\n").is_ok());
    }

    #[test]
    fn test_rejects_zero_replicas() {
        let err = AppConfig::from_toml("[kubernetes]\nreplicas = 0\n").unwrap_err();
        assert!(err.to_string().contains("replicas"));
    }

    #[test]
    fn test_app_name_must_be_dns_label() {
        for bad in ["", "Kube-Message", "kube_message", "-kube", "kube-", "1kube"] {
            let toml = format!("[kubernetes]\napp_name = \"{}\"\n", bad);
            assert!(AppConfig::from_toml(&toml).is_err(), "accepted '{}'", bad);
        }
        let long = "a".repeat(MAX_APP_NAME_LEN + 1);
        let toml = format!("[kubernetes]\napp_name = \"{}\"\n", long);
        assert!(AppConfig::from_toml(&toml).is_err());

        assert!(AppConfig::from_toml("[kubernetes]\napp_name = \"hello-k8s2\"\n").is_ok());
    }

    #[test]
    fn test_namespace_may_start_with_digit() {
        let config = AppConfig::from_toml("[kubernetes]\nnamespace = \"1team\"\n").unwrap();
        assert_eq!(config.kubernetes.namespace, "1team");

        for bad in ["", "Team", "team_a", "-team", "team-"] {
            let toml = format!("[kubernetes]\nnamespace = \"{}\"\n", bad);
            assert!(AppConfig::from_toml(&toml).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 8181\n").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.http.port, 8181);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = AppConfig::load_or_default(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_missing_default_file_uses_builtin_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("default.toml");

        let config = AppConfig::load_or_default_at(None, &default_path).unwrap();
        assert_eq!(config.http.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.message.body, DEFAULT_MESSAGE);
    }

    #[test]
    fn test_present_default_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("default.toml");
        std::fs::write(&default_path, "[message]\nbody = \"from the default file\"\n").unwrap();

        let config = AppConfig::load_or_default_at(None, &default_path).unwrap();
        assert_eq!(config.message.body, "from the default file");
    }

    #[test]
    fn test_explicit_path_wins_over_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("default.toml");
        std::fs::write(&default_path, "[http]\nport = 9001\n").unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[http]\nport = 9002\n").unwrap();

        let config = AppConfig::load_or_default_at(Some(&explicit), &default_path).unwrap();
        assert_eq!(config.http.port, 9002);
    }

    #[test]
    fn test_bind_addr() {
        let http = HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            shutdown_grace_seconds: 1,
        };
        assert_eq!(
            http.bind_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_bind_addr_accepts_ipv6_and_hostnames() {
        let mut http = HttpServerConfig::default();

        http.host = "::".to_string();
        assert_eq!(
            http.bind_addr().unwrap(),
            "[::]:8080".parse::<SocketAddr>().unwrap()
        );

        http.host = "[::1]".to_string();
        assert_eq!(
            http.bind_addr().unwrap(),
            "[::1]:8080".parse::<SocketAddr>().unwrap()
        );

        http.host = "localhost".to_string();
        let addr = http.bind_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);

        assert!(AppConfig::from_toml("[http]\nhost = \"localhost\"\n").is_ok());
    }
}
