//! Configuration validation logic.

use std::net::SocketAddr;

use ipnet::IpNet;
use url::Url;

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.listen_addr().parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Validation(format!(
            "server.listen is not a socket address: {}",
            config.server.listen
        )));
    }
    if config.server.service_net_cidr.parse::<IpNet>().is_err() {
        return Err(ConfigError::Validation(format!(
            "server.service_net_cidr is not a CIDR: {}",
            config.server.service_net_cidr
        )));
    }
    if config.server.shutdown_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server.shutdown_timeout_secs must be > 0".into(),
        ));
    }
    validate_http_url("directory.url", &config.directory.url)?;
    if config.directory.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "directory.timeout_secs must be > 0".into(),
        ));
    }
    validate_http_url("tunnel.dial_url", &config.tunnel.dial_url)?;
    if config.tunnel.callback_host.trim().is_empty() {
        return Err(ConfigError::Validation("tunnel.callback_host is empty".into()));
    }
    if let Some(listen) = &config.metrics.listen
        && listen.parse::<SocketAddr>().is_err()
    {
        return Err(ConfigError::Validation(format!(
            "metrics.listen is not a socket address: {listen}"
        )));
    }
    if let Some(format) = &config.logging.format
        && !matches!(format.as_str(), "json" | "pretty" | "compact")
    {
        return Err(ConfigError::Validation(
            "logging.format must be one of: json, pretty, compact".into(),
        ));
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::Validation(format!(
            "{field} must be http or https, got {}",
            url.scheme()
        ))),
        Err(e) => Err(ConfigError::Validation(format!("{field} is invalid: {e}"))),
    }
}
