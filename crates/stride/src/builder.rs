//! Descriptor to wire-request translation

use crate::descriptor::RequestDescriptor;
use crate::error::{Error, Result};
use crate::{CLIENT_VERSION_HEADER, VERSION};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderName, HeaderValue};
use std::time::Duration;
use stride_transport::HttpRequest;
use tracing::warn;
use url::Url;

const JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Turns [`RequestDescriptor`]s into fully qualified [`HttpRequest`]s.
///
/// The base URL is treated as a directory: `https://api.stride.app/v1` and
/// `https://api.stride.app/v1/` both resolve `athlete` and `/athlete` to
/// `https://api.stride.app/v1/athlete`.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: Url,
    client_version: HeaderValue,
    timeout: Duration,
}

impl RequestBuilder {
    /// Create a builder rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str, client_version: &str, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!(
                "{base_url}: base URL must be an http(s) URL"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        base_url.set_query(None);
        base_url.set_fragment(None);

        let client_version = HeaderValue::from_str(client_version).unwrap_or_else(|_| {
            warn!(
                client_version,
                "Client version is not a valid header value, using crate version"
            );
            HeaderValue::from_static(VERSION)
        });

        Ok(Self {
            base_url,
            client_version,
            timeout,
        })
    }

    /// Normalized base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the wire request for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the path cannot be resolved, or if it
    /// resolves to a different origin than the base URL.
    pub fn build(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest> {
        let relative = descriptor.path().trim_start_matches('/');
        let mut url = self
            .base_url
            .join(relative)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", descriptor.path())))?;

        if url.origin() != self.base_url.origin() {
            return Err(Error::InvalidUrl(format!(
                "{} resolves outside {}",
                descriptor.path(),
                self.base_url
            )));
        }

        if let Some(params) = descriptor.query().filter(|params| !params.is_empty()) {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut request = HttpRequest::new(descriptor.method().into(), url)
            .with_header(ACCEPT, JSON)
            .with_header(CONTENT_TYPE, JSON)
            .with_header(
                HeaderName::from_static(CLIENT_VERSION_HEADER),
                self.client_version.clone(),
            )
            .with_timeout(self.timeout);

        if let Some(body) = descriptor.body() {
            request = request.with_body(body.clone());
        }

        Ok(request)
    }
}
