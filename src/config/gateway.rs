use std::net::{IpAddr, SocketAddr};

use crate::config::helpers::{parse_env_or, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl GatewayConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            host: parse_string_env("GATEWAY_HOST", settings.gateway.host.clone())?,
            port: parse_env_or("GATEWAY_PORT", settings.gateway.port)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            key: "GATEWAY_HOST".to_string(),
            message: format!("'{}' is not an IP address", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = GatewayConfig {
            host: "0.0.0.0".to_string(),
            port: 8088,
        };
        assert_eq!(
            config.socket_addr().expect("addr"),
            "0.0.0.0:8088".parse::<SocketAddr>().expect("literal")
        );
    }

    #[test]
    fn hostname_is_rejected() {
        let config = GatewayConfig {
            host: "localhost".to_string(),
            port: 3000,
        };
        assert!(config.socket_addr().is_err());
    }
}
