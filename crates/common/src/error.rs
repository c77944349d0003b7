//! Configuration and startup errors

use thiserror::Error;

/// Errors raised while loading configuration and secrets.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required secret: {0}")]
    MissingSecret(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("api_base_url must be http(s)".into());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: api_base_url must be http(s)"
        );

        let missing = Error::MissingSecret("HUBSPOT_CLIENT_SECRET");
        assert_eq!(
            missing.to_string(),
            "Missing required secret: HUBSPOT_CLIENT_SECRET"
        );
    }

    #[test]
    fn toml_errors_convert() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("not = valid = toml");
        let err: Error = parse.unwrap_err().into();
        assert!(
            err.to_string().starts_with("TOML parse error:"),
            "got: {err}"
        );
    }
}
