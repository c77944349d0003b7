//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from HUBSPOT_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use hubspot_auth::{
    API_BASE_URL, AUTHORIZE_ENDPOINT, MAX_PENDING_STATES, OAuthSettings, REDIRECT_URI, SCOPES,
    STATE_TTL_SECS, StateMode,
};
use serde::Deserialize;

const CLIENT_ID_ENV: &str = "HUBSPOT_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "HUBSPOT_CLIENT_SECRET";
const REDIS_URL_ENV: &str = "REDIS_URL";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Inbound listener and outbound client settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Timeout for each vendor HTTP call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// HubSpot app registration and endpoints
#[derive(Debug, Deserialize)]
pub struct HubSpotConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub state_mode: StateMode,
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: u64,
    /// Cap on opaque state tokens awaiting a callback
    #[serde(default = "default_max_pending_states")]
    pub max_pending_states: usize,
}

/// Which key-value backend holds credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    File,
    Memory,
}

/// Credential store settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Credential file for the `file` backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_max_connections() -> usize {
    1000
}

fn default_timeout() -> u64 {
    30
}

fn default_redirect_uri() -> String {
    REDIRECT_URI.to_string()
}

fn default_scope() -> String {
    SCOPES.to_string()
}

fn default_authorize_url() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_api_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_state_ttl() -> u64 {
    STATE_TTL_SECS
}

fn default_max_pending_states() -> usize {
    MAX_PENDING_STATES
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("hubspot-credentials.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_secret_file: None,
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            authorize_url: default_authorize_url(),
            api_base_url: default_api_base_url(),
            state_mode: StateMode::default(),
            state_ttl_secs: default_state_ttl(),
            max_pending_states: default_max_pending_states(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            path: default_store_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file yields the defaults so the gateway can
    /// run from environment variables alone.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    /// Overlay env vars, resolve secrets and validate.
    ///
    /// Client id: HUBSPOT_CLIENT_ID, then `client_id` in the file.
    /// Client secret: HUBSPOT_CLIENT_SECRET, then `client_secret_file`.
    fn finish(mut self) -> common::Result<Self> {
        if let Ok(id) = std::env::var(CLIENT_ID_ENV) {
            self.hubspot.client_id = Some(id);
        }
        if self
            .hubspot
            .client_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
        {
            return Err(common::Error::MissingSecret(CLIENT_ID_ENV));
        }

        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            self.hubspot.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = self.hubspot.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                self.hubspot.client_secret = Some(Secret::new(secret));
            }
        }
        if self.hubspot.client_secret.is_none() {
            return Err(common::Error::MissingSecret(CLIENT_SECRET_ENV));
        }

        if let Ok(url) = std::env::var(REDIS_URL_ENV) {
            self.store.redis_url = url;
        }

        for (name, url) in [
            ("authorize_url", &self.hubspot.authorize_url),
            ("api_base_url", &self.hubspot.api_base_url),
            ("redirect_uri", &self.hubspot.redirect_uri),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.hubspot.state_ttl_secs == 0 {
            return Err(common::Error::Config(
                "state_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.hubspot.max_pending_states == 0 {
            return Err(common::Error::Config(
                "max_pending_states must be greater than 0".into(),
            ));
        }

        Ok(self)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("hubspot-gateway.toml")
    }

    /// OAuth settings for the auth crate. Only valid after `finish`, which
    /// guarantees both credentials are present.
    pub fn oauth_settings(&self) -> common::Result<OAuthSettings> {
        let client_id = self
            .hubspot
            .client_id
            .clone()
            .ok_or(common::Error::MissingSecret(CLIENT_ID_ENV))?;
        let client_secret = self
            .hubspot
            .client_secret
            .clone()
            .ok_or(common::Error::MissingSecret(CLIENT_SECRET_ENV))?;

        let mut settings = OAuthSettings::new(client_id, client_secret);
        settings.redirect_uri = self.hubspot.redirect_uri.clone();
        settings.scope = self.hubspot.scope.clone();
        settings.authorize_url = self.hubspot.authorize_url.clone();
        settings.api_base_url = self.hubspot.api_base_url.clone();
        Ok(settings)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.hubspot.state_ttl_secs)
    }

    pub fn vendor_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    /// Reset every variable `finish` reads. Caller must hold ENV_MUTEX.
    fn clear_env() {
        unsafe {
            remove_env(CLIENT_ID_ENV);
            remove_env(CLIENT_SECRET_ENV);
            remove_env(REDIS_URL_ENV);
        }
    }

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "0.0.0.0:8080"

[hubspot]
client_id = "file-client-id"
state_mode = "plain"

[store]
backend = "file"
path = "/var/lib/hubspot/credentials.json"
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_SECRET_ENV, "env-secret") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.hubspot.client_id.as_deref(), Some("file-client-id"));
        assert_eq!(config.hubspot.state_mode, StateMode::Plain);
        assert_eq!(config.hubspot.scope, "crm.objects.contacts.read");
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/hubspot/credentials.json")
        );

        clear_env();
    }

    #[test]
    fn test_env_only_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            set_env(CLIENT_ID_ENV, "env-client");
            set_env(CLIENT_SECRET_ENV, "env-secret");
        }

        let config = Config::load_or_default(Path::new("/nonexistent/hubspot.toml")).unwrap();
        assert_eq!(config.server.listen_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.hubspot.state_mode, StateMode::Opaque);
        assert_eq!(config.hubspot.max_pending_states, 10_000);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.redis_url, "redis://localhost:6379/0");

        let settings = config.oauth_settings().unwrap();
        assert_eq!(settings.client_id, "env-client");
        assert_eq!(settings.client_secret.expose(), "env-secret");
        assert_eq!(
            settings.redirect_uri,
            "http://localhost:8000/oauth2callback/hubspot"
        );

        clear_env();
    }

    #[test]
    fn test_env_client_id_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            set_env(CLIENT_ID_ENV, "env-client");
            set_env(CLIENT_SECRET_ENV, "env-secret");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.hubspot.client_id.as_deref(), Some("env-client"));

        clear_env();
    }

    #[test]
    fn test_missing_client_id_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_SECRET_ENV, "env-secret") };

        let err = Config::default().finish().unwrap_err();
        assert!(matches!(err, common::Error::MissingSecret(CLIENT_ID_ENV)));

        clear_env();
    }

    #[test]
    fn test_missing_client_secret_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_ID_ENV, "env-client") };

        let err = Config::default().finish().unwrap_err();
        assert!(matches!(err, common::Error::MissingSecret(CLIENT_SECRET_ENV)));

        clear_env();
    }

    #[test]
    fn test_client_secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();

        let path = write_config(
            dir.path(),
            &format!(
                r#"
[hubspot]
client_id = "cid"
client_secret_file = "{}"
"#,
                secret_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.hubspot.client_secret.as_ref().unwrap().expose(),
            "file-secret"
        );

        clear_env();
    }

    #[test]
    fn test_env_secret_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_SECRET_ENV, "env-secret") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[hubspot]
client_id = "cid"
client_secret_file = "/nonexistent/secret"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.hubspot.client_secret.as_ref().unwrap().expose(),
            "env-secret"
        );

        clear_env();
    }

    #[test]
    fn test_client_secret_file_nonexistent_returns_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[hubspot]
client_id = "cid"
client_secret_file = "/nonexistent/secret"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("client_secret_file"), "got: {err}");
    }

    #[test]
    fn test_redis_url_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            set_env(CLIENT_SECRET_ENV, "s");
            set_env(REDIS_URL_ENV, "redis://cache:6379/2");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[hubspot]
client_id = "cid"

[store]
redis_url = "redis://file:6379/0"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.redis_url, "redis://cache:6379/2");

        clear_env();
    }

    #[test]
    fn test_invalid_api_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_SECRET_ENV, "s") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[hubspot]
client_id = "cid"
api_base_url = "ftp://api.hubapi.com"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("api_base_url"), "got: {err}");

        clear_env();
    }

    #[test]
    fn test_zero_values_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env(CLIENT_SECRET_ENV, "s") };
        let dir = tempfile::tempdir().unwrap();

        for (section, field) in [
            ("server", "timeout_secs"),
            ("server", "max_connections"),
            ("hubspot", "state_ttl_secs"),
            ("hubspot", "max_pending_states"),
        ] {
            let extra = if section == "hubspot" {
                format!("[hubspot]\nclient_id = \"cid\"\n{field} = 0\n")
            } else {
                format!("[hubspot]\nclient_id = \"cid\"\n\n[{section}]\n{field} = 0\n")
            };
            let path = write_config(dir.path(), &extra);
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "got: {err}");
        }

        clear_env();
    }

    #[test]
    fn test_unknown_store_backend_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[store]\nbackend = \"sqlite\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(common::Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/etc/hubspot/gateway.toml"));
        assert_eq!(path, PathBuf::from("/etc/hubspot/gateway.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/from/env.toml") };
        let path = Config::resolve_path(None);
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/from/env.toml"));
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("hubspot-gateway.toml"));
    }
}
