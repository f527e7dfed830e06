//! TLS client configuration for STARTTLS upgrades
//!
//! Local bridges ship self-signed certificates, so certificate checking is
//! opt-in through [`TlsConfig::verify`]. With verification enabled the
//! webpki root store is used.

use crate::config::TlsConfig;
use crate::error::{MailError, Result};
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use std::sync::Arc;
use std::time::SystemTime;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Accepts any server certificate. Only used when verification is disabled.
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

/// Build the rustls client config (rustls 0.21 API)
pub fn client_config(tls: &TlsConfig) -> ClientConfig {
    let builder = ClientConfig::builder().with_safe_defaults();

    if tls.verify {
        debug!("TLS certificate verification enabled");
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        debug!("TLS certificate verification disabled");
        builder
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    }
}

pub fn connector(tls: &TlsConfig) -> TlsConnector {
    TlsConnector::from(Arc::new(client_config(tls)))
}

/// SNI / verification name for a host or IP literal
pub fn server_name(host: &str) -> Result<ServerName> {
    ServerName::try_from(host)
        .map_err(|e| MailError::Tls(format!("Invalid server name '{}': {}", host, e)))
}
