//! `SSLRequest` negotiation and the `rustls`-backed TLS channel.
use std::{sync::Arc, time::Duration};

use rustls::{ClientConfig, ClientConnection};
use rustls_pki_types::ServerName;

use super::Transport;
use crate::{
    error::{ClientError, Error, Result},
    options::TlsOptions,
};

const SSL_REQUEST_CODE: i32 = (1234 << 16) | 5679;

fn client_config() -> Arc<ClientConfig> {
    let roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect::<rustls::RootCertStore>();
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Perform the PostgreSQL `SSLRequest` dance and, if the server agrees, wrap `transport`
/// in a TLS session. If the server declines and TLS is mandatory, fails with
/// [`ClientError::TlsRejectedByServer`].
pub(crate) fn negotiate(
    transport: &mut Transport,
    hostname: Option<&str>,
    tls: &TlsOptions,
    timeout: Option<Duration>,
) -> Result<()> {
    if !tls.enabled {
        return Ok(());
    }

    let mut request = [0u8; 8];
    request[0..4].copy_from_slice(&8i32.to_be_bytes());
    request[4..8].copy_from_slice(&SSL_REQUEST_CODE.to_be_bytes());
    transport.write_raw(&request, timeout)?;

    match transport.read_raw_byte(timeout)? {
        b'S' => {}
        b'N' => return Err(Error::client(ClientError::TlsRejectedByServer)),
        _ => {
            return Err(Error::client(ClientError::ProtocolViolation(
                "unexpected byte in response to SSLRequest".into(),
            )))
        }
    }

    let server_name: ServerName<'static> = match hostname {
        Some(host) if tls.server_hostname_verification_enabled => {
            ServerName::try_from(host.to_string())
                .map_err(|_| Error::client(ClientError::Generic(format!("invalid TLS server name {host:?}"))))?
        }
        _ => ServerName::try_from("localhost".to_string()).expect("static literal is a valid DNS name"),
    };

    let conn = ClientConnection::new(client_config(), server_name)
        .map_err(|e| Error::client(ClientError::Generic(format!("tls setup failed: {e}"))))?;

    transport.upgrade_to_tls(conn);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_request_code_matches_protocol_constant() {
        // https://www.postgresql.org/docs/current/protocol-message-formats.html#PROTOCOL-MESSAGE-FORMATS-SSLREQUEST
        assert_eq!(SSL_REQUEST_CODE, 80877103);
    }
}
