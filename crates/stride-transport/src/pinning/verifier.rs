//! rustls integration for [`TrustValidator`].

use super::{ServerTrustChallenge, TrustDisposition, TrustValidator};
use crate::error::{Result, TransportError};
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::{CertificateDer, ServerName, SubjectPublicKeyInfoDer, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore,
    SignatureScheme,
};
use std::sync::Arc;
use webpki::EndEntityCert;

/// DER `SubjectPublicKeyInfo` (outer SEQUENCE included) of a leaf certificate.
///
/// `None` when the certificate does not parse.
pub fn end_entity_public_key_info(
    certificate: &CertificateDer<'_>,
) -> Option<SubjectPublicKeyInfoDer<'static>> {
    EndEntityCert::try_from(certificate)
        .ok()
        .map(|cert| cert.subject_public_key_info())
}

/// Certificate verifier that layers public-key pinning over webpki validation.
///
/// Chain validation against the bundled Mozilla roots always runs; the pin
/// verdict can only make a handshake stricter, never rescue an invalid chain.
#[derive(Debug)]
pub struct PinnedServerVerifier {
    platform: Arc<WebPkiServerVerifier>,
    validator: TrustValidator,
}

impl PinnedServerVerifier {
    /// Build a verifier over the bundled Mozilla roots, using `provider` for
    /// signature checks.
    pub fn new(validator: TrustValidator, provider: Arc<CryptoProvider>) -> Result<Self> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Self::with_roots(validator, roots, provider)
    }

    /// Build a verifier that validates chains against `roots`.
    pub fn with_roots(
        validator: TrustValidator,
        roots: RootCertStore,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self> {
        let platform = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        Ok(Self {
            platform,
            validator,
        })
    }
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        let chain = self.platform.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        );

        let host = server_name.to_str();
        let public_key_info = end_entity_public_key_info(end_entity);
        let challenge = ServerTrustChallenge::server_trust(&host, public_key_info.as_deref());

        match self.validator.evaluate(&challenge) {
            TrustDisposition::CancelChallenge => Err(TlsError::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            )),
            // Pin matched: the presented chain is accepted on its own validation.
            TrustDisposition::UseCredential => chain,
            TrustDisposition::PerformDefaultHandling(_) => chain,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.platform.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.platform.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.platform.supported_verify_schemes()
    }
}

/// rustls client configuration whose handshakes go through the pinned verifier.
pub(crate) fn pinned_client_config(validator: TrustValidator) -> Result<ClientConfig> {
    let provider = Arc::new(ring::default_provider());
    let verifier = PinnedServerVerifier::new(validator, Arc::clone(&provider))?;

    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Config(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}
