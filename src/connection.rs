//! HTTP client construction
//!
//! The `reqwest::Client` is built once per `SmarterMailClient` and
//! shared by every request, so TLS settings are fixed at construction.

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::warn;

/// Build the HTTP client for `config`.
///
/// With `insecure_tls` set, server certificates are not verified at
/// all. Otherwise reqwest's default verification applies.
pub fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();

    let builder = if config.insecure_tls {
        warn!(
            "Certificate verification disabled for {}",
            config.service_url
        );
        builder.use_preconfigured_tls(insecure_tls_config()?)
    } else {
        builder
    };

    builder
        .build()
        .map_err(|e| Error::Tls(format!("Failed to build HTTP client: {e}")))
}

fn insecure_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
        .with_no_client_auth();
    Ok(config)
}

/// Certificate verifier that accepts all certificates
/// (for servers running on self-signed certs).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
