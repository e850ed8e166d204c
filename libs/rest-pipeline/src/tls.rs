//! TLS setup for the built-in transport.
//!
//! Native root certificates are loaded from the OS store once per process;
//! some platforms make that lookup slow.

use crate::config::{TlsRootConfig, TransportSecurity};
use crate::error::PipelineError;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls_pki_types::CertificateDer;
use std::sync::{Arc, OnceLock};

static NATIVE_ROOTS: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_roots() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }
    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }
    result.certs
}

/// Native root certificates, loaded on first use. May be empty.
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS.get_or_init(load_native_roots).as_slice()
}

/// The globally installed crypto provider, or aws-lc-rs without installing it.
pub fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// rustls client config trusting the native roots.
///
/// # Errors
/// Fails when the OS store is empty or none of its certificates parse, so
/// that a broken trust store surfaces when the transport is built rather
/// than on the first handshake.
pub fn native_roots_client_config() -> Result<rustls::ClientConfig, PipelineError> {
    let certs = native_root_certs();
    if certs.is_empty() {
        return Err(PipelineError::Tls(
            "no native root CA certificates found in OS certificate store".into(),
        ));
    }

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs.iter().cloned());
    if ignored > 0 {
        tracing::warn!(added, ignored, "some native root certificates could not be parsed");
    }
    if added == 0 {
        return Err(PipelineError::Tls(
            format!("none of the {} native root CA certificates could be parsed", certs.len())
                .into(),
        ));
    }

    rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map(|builder| {
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        })
        .map_err(|e| PipelineError::Tls(Box::new(e)))
}

/// HTTPS connector advertising h2 and http/1.1 via ALPN.
///
/// Plain `http://` connections are only possible with
/// `TransportSecurity::AllowInsecureHttp`.
///
/// # Errors
/// Returns `PipelineError::Tls` if the root store cannot be set up.
pub fn https_connector(
    tls_roots: TlsRootConfig,
    transport: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, PipelineError> {
    let allow_http = transport == TransportSecurity::AllowInsecureHttp;

    let builder = match tls_roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(crypto_provider())
            .map_err(|e| PipelineError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(native_roots_client_config()?),
    };

    let connector = if allow_http {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    };
    Ok(connector)
}
