//! Logical request descriptions
//!
//! A [`RequestDescriptor`] says *what* to call: method, path, query and body.
//! It knows nothing about base URLs, credentials or headers; those are added
//! by the client when the descriptor is turned into an [`HttpRequest`].
//!
//! [`HttpRequest`]: stride_transport::HttpRequest

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// HTTP methods the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// Immutable description of one API call.
///
/// # Example
///
/// ```rust
/// use stride::RequestDescriptor;
///
/// let request = RequestDescriptor::get("/v1/workouts")
///     .with_query([("limit", "20"), ("sport", "run")]);
///
/// assert!(request.requires_auth());
/// assert!(request.dedup_key().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    path: String,
    method: Method,
    body: Option<Bytes>,
    query: Option<Vec<(String, String)>>,
    requires_auth: bool,
}

impl RequestDescriptor {
    /// Describe a call to `path` with `method`. Authenticated by default.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            query: None,
            requires_auth: true,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach query parameters. Wire order follows iteration order.
    pub fn with_query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.query = Some(params);
        self
    }

    /// Attach an already-serialized body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and attach it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodingError`] if `body` cannot be serialized.
    pub fn with_json_body<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| Error::DecodingError(e.to_string()))?;
        Ok(self.with_body(bytes))
    }

    /// Mark the call as not needing a bearer token or signature.
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Path relative to the client's base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Pre-serialized body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Query parameters in caller order, if any.
    pub fn query(&self) -> Option<&[(String, String)]> {
        self.query.as_deref()
    }

    /// Whether a bearer token and signature are attached.
    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Identity used to collapse concurrent identical reads. `None` for
    /// anything other than GET.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        if self.method != Method::Get {
            return None;
        }

        let query_hash = self
            .query
            .as_ref()
            .filter(|params| !params.is_empty())
            .map_or(0, |params| {
                let mut sorted: Vec<&(String, String)> = params.iter().collect();
                sorted.sort();
                hash_of(&sorted)
            });
        let body_hash = self.body.as_ref().map_or(0, |body| hash_of(body.as_ref()));

        Some(DedupKey {
            method: self.method,
            path: self.path.clone(),
            query_hash,
            body_hash,
        })
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Identity of a GET for in-flight collapsing.
///
/// Query parameters are hashed in sorted order so `?a=1&b=2` and `?b=2&a=1`
/// share a key. Hashes are 64-bit and non-cryptographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    method: Method,
    path: String,
    query_hash: u64,
    body_hash: u64,
}

impl DedupKey {
    /// Path of the collapsed request.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} q={:016x} b={:016x}",
            self.method, self.path, self.query_hash, self.body_hash
        )
    }
}
