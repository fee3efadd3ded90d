//! Capabilities consumed by suites and purposes, injected explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::prelude::*;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::loader::{ContextLoader, DocumentLoader};

/// Deterministic serialization of a document.
///
/// Semantically equal documents must canonicalize to the same bytes. The
/// loader is passed along so that the result may depend on the documents'
/// contexts.
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    async fn canonicalize(
        &self,
        document: &Value,
        loader: &dyn DocumentLoader,
    ) -> Result<Vec<u8>, Error>;
}

pub trait MessageDigest: Send + Sync {
    fn digest(&self, data: &[u8]) -> Vec<u8>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// JSON Canonicalization Scheme (RFC 8785).
///
/// Every string `@context` entry of the document is dereferenced first, so a
/// document whose context cannot be loaded fails to canonicalize.
#[derive(Debug, Clone, Copy, Default)]
pub struct JcsCanonicalizer;

#[async_trait]
impl Canonicalizer for JcsCanonicalizer {
    async fn canonicalize(
        &self,
        document: &Value,
        loader: &dyn DocumentLoader,
    ) -> Result<Vec<u8>, Error> {
        let urls: Vec<&str> = match document.get("@context") {
            Some(Value::String(url)) => vec![url.as_str()],
            Some(Value::Array(entries)) => entries.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        for url in urls {
            loader.load(url).await?;
        }
        serde_jcs::to_string(document)
            .map(String::into_bytes)
            .map_err(|e| Error::Canonicalization(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl MessageDigest for Sha256Digest {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Collaborators used by the proof set engine, its suites and purposes.
///
/// Supplied loaders are always wrapped in a [`ContextLoader`], so that the
/// pinned contexts are never requested from them.
#[derive(Clone)]
pub struct Environment {
    pub canonicalizer: Arc<dyn Canonicalizer>,
    pub digest: Arc<dyn MessageDigest>,
    pub loader: Arc<dyn DocumentLoader>,
    pub clock: Arc<dyn Clock>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            canonicalizer: Arc::new(JcsCanonicalizer),
            digest: Arc::new(Sha256Digest),
            loader: Arc::new(ContextLoader::default()),
            clock: Arc::new(SystemClock),
        }
    }
}

impl Environment {
    pub fn with_loader(self, loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            loader: Arc::new(ContextLoader::default().extend(loader)),
            ..self
        }
    }

    /// Uses `loader` as is, without pinned contexts in front of it.
    pub fn with_context_loader(self, loader: ContextLoader) -> Self {
        Self {
            loader: Arc::new(loader),
            ..self
        }
    }

    pub fn with_canonicalizer(self, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        Self {
            canonicalizer,
            ..self
        }
    }

    pub fn with_digest(self, digest: Arc<dyn MessageDigest>) -> Self {
        Self { digest, ..self }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    /// `digest(canonicalize(document))`
    pub async fn hash(&self, document: &Value) -> Result<Vec<u8>, Error> {
        let canonical = self
            .canonicalizer
            .canonicalize(document, self.loader.as_ref())
            .await?;
        Ok(self.digest.digest(&canonical))
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}
