//! Connection endpoint and configuration.
use std::time::Duration;

use crate::common::ByteStr;

/// Failure building or validating an [`Options`] value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OptionsError {
    #[error("net endpoint requires a host or an address")]
    MissingNetTarget,
    #[error("invalid port {0}")]
    InvalidPort(u32),
    #[error("unix socket directory must be an absolute path: {0:?}")]
    RelativeUdsDirectory(String),
    #[error("invalid IPv4/IPv6 address: {0:?}")]
    InvalidAddress(String),
    #[error("invalid hostname: {0:?}")]
    InvalidHostname(String),
    #[error("field {0} requires ssl_enabled = true")]
    TlsFieldWithoutTls(&'static str),
    #[error("timeout must be positive")]
    NonPositiveTimeout,
}

/// Transport endpoint: either a TCP/IP network target or a Unix-domain socket.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Net { host: Option<ByteStr>, address: Option<ByteStr>, port: u16 },
    Uds { directory: ByteStr, port: u16 },
}

impl Endpoint {
    fn validate(&self) -> Result<(), OptionsError> {
        match self {
            Endpoint::Net { host, address, port } => {
                if host.is_none() && address.is_none() {
                    return Err(OptionsError::MissingNetTarget);
                }
                if *port == 0 {
                    return Err(OptionsError::InvalidPort(*port as u32));
                }
                if let Some(address) = address {
                    if !is_ip_literal(address) {
                        return Err(OptionsError::InvalidAddress(address.to_string()));
                    }
                }
                if let Some(host) = host {
                    if !is_valid_hostname(host) {
                        return Err(OptionsError::InvalidHostname(host.to_string()));
                    }
                }
                Ok(())
            }
            Endpoint::Uds { directory, port: _ } => {
                if !directory.starts_with('/') {
                    return Err(OptionsError::RelativeUdsDirectory(directory.to_string()));
                }
                Ok(())
            }
        }
    }
}

fn is_ip_literal(s: &str) -> bool {
    s.parse::<std::net::Ipv4Addr>().is_ok() || s.parse::<std::net::Ipv6Addr>().is_ok()
}

fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

/// TLS-related settings. All fields are inert unless `enabled` is `true`.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    pub enabled: bool,
    pub compression_enabled: bool,
    pub certificate_authority_file: Option<ByteStr>,
    pub certificate_file: Option<ByteStr>,
    pub private_key_file: Option<ByteStr>,
    pub certificate_revocation_list_file: Option<ByteStr>,
    pub server_hostname_verification_enabled: bool,
}

/// TCP keepalive tuning.
#[derive(Debug, Clone, Default)]
pub struct KeepaliveOptions {
    pub enabled: bool,
    pub idle: Option<Duration>,
    pub interval: Option<Duration>,
    pub count: Option<u32>,
}

/// Immutable connection configuration (SPEC_FULL.md §4.1 / §6).
#[derive(Debug, Clone)]
pub struct Options {
    pub endpoint: Endpoint,
    pub username: ByteStr,
    pub database: Option<ByteStr>,
    pub password: Option<ByteStr>,
    pub kerberos_service_name: Option<ByteStr>,
    pub connect_timeout: Option<Duration>,
    pub wait_response_timeout: Option<Duration>,
    pub wait_last_response_timeout: Option<Duration>,
    pub keepalive: KeepaliveOptions,
    pub tls: TlsOptions,
}

impl Options {
    /// Start building options for a TCP connection to `host:port`.
    pub fn new(username: impl Into<ByteStr>, host: impl Into<ByteStr>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::Net { host: Some(host.into()), address: None, port },
            username: username.into(),
            database: None,
            password: None,
            kerberos_service_name: None,
            connect_timeout: None,
            wait_response_timeout: None,
            wait_last_response_timeout: None,
            keepalive: KeepaliveOptions::default(),
            tls: TlsOptions::default(),
        }
    }

    /// Start building options for a Unix-domain socket connection.
    pub fn new_uds(username: impl Into<ByteStr>, directory: impl Into<ByteStr>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::Uds { directory: directory.into(), port },
            username: username.into(),
            database: None,
            password: None,
            kerberos_service_name: None,
            connect_timeout: None,
            wait_response_timeout: None,
            wait_last_response_timeout: None,
            keepalive: KeepaliveOptions::default(),
            tls: TlsOptions::default(),
        }
    }

    pub fn database(mut self, database: impl Into<ByteStr>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn password(mut self, password: impl Into<ByteStr>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn wait_response_timeout(mut self, timeout: Duration) -> Self {
        self.wait_response_timeout = Some(timeout);
        self
    }

    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Build options from the standard `PG*` environment variables.
    ///
    /// Missing variables fall back to: host `localhost`, port `5432`, user from
    /// `whoami`-equivalent is not attempted here (the caller must set `PGUSER`).
    pub fn from_env() -> Result<Self, OptionsError> {
        let host = std::env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = std::env::var("PGPORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432);
        let user = std::env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string());

        let mut opts = Self::new(user, host, port);

        if let Ok(password) = std::env::var("PGPASSWORD") {
            opts = opts.password(password);
        }
        if let Ok(database) = std::env::var("PGDATABASE") {
            opts = opts.database(database);
        }
        if let Ok(timeout) = std::env::var("PGCONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                opts = opts.connect_timeout(Duration::from_secs(secs));
            }
        }
        if let Ok(mode) = std::env::var("PGSSLMODE") {
            opts.tls.enabled = matches!(mode.as_str(), "require" | "verify-ca" | "verify-full");
            opts.tls.server_hostname_verification_enabled = mode == "verify-full";
        }

        opts.validate()?;
        Ok(opts)
    }

    /// Run all validators; called both eagerly by setters and once more before
    /// `Connection::connect`.
    pub fn validate(&self) -> Result<(), OptionsError> {
        self.endpoint.validate()?;

        if let Some(timeout) = self.connect_timeout {
            if timeout.is_zero() {
                return Err(OptionsError::NonPositiveTimeout);
            }
        }

        if !self.tls.enabled {
            if self.tls.certificate_file.is_some() {
                return Err(OptionsError::TlsFieldWithoutTls("ssl_certificate_file"));
            }
            if self.tls.private_key_file.is_some() {
                return Err(OptionsError::TlsFieldWithoutTls("ssl_private_key_file"));
            }
        }

        Ok(())
    }

    pub(crate) fn host_for_tls(&self) -> Option<&str> {
        match &self.endpoint {
            Endpoint::Net { host, .. } => host.as_ref().map(|h| &***h),
            Endpoint::Uds { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_without_host_or_address_rejected() {
        let opts = Options {
            endpoint: Endpoint::Net { host: None, address: None, port: 5432 },
            ..Options::new("u", "h", 5432)
        };
        assert!(matches!(opts.validate(), Err(OptionsError::MissingNetTarget)));
    }

    #[test]
    fn tls_fields_require_tls_enabled() {
        let mut opts = Options::new("u", "localhost", 5432);
        opts.tls.certificate_file = Some("cert.pem".into());
        assert!(matches!(opts.validate(), Err(OptionsError::TlsFieldWithoutTls(_))));
        opts.tls.enabled = true;
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn hostname_validation_follows_rfc1123() {
        assert!(is_valid_hostname("db.internal"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname(&"a".repeat(300)));
    }
}
