//! Document loaders.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::contexts;
use crate::error::{Error, LoaderError};

/// A loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub document: Value,
    /// Final URL of the document, after any redirect.
    pub document_url: String,
    /// URL of a context linked from transport headers, if any.
    pub context_url: Option<String>,
}

impl RemoteDocument {
    pub fn new(url: &str, document: Value) -> Self {
        Self {
            document,
            document_url: url.to_string(),
            context_url: None,
        }
    }
}

/// Resolves URLs to documents: contexts, controller documents and
/// verification methods.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError>;
}

#[async_trait]
impl<T: DocumentLoader + ?Sized> DocumentLoader for Arc<T> {
    async fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        (**self).load(url).await
    }
}

/// Serves only the contexts pinned in [`contexts`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

#[async_trait]
impl DocumentLoader for StaticLoader {
    async fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        contexts::pinned(url)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownContext(url.to_string()))
    }
}

pub type ContextMap = HashMap<String, RemoteDocument>;

/// Loader checking, in order, the pinned contexts, a map of caller-supplied
/// documents and an optional fallback loader.
///
/// Without a fallback the loader is strict: any other URL is rejected with
/// [`LoaderError::UnknownContext`].
#[derive(Clone)]
pub struct ContextLoader {
    // Specifies if StaticLoader is meant to be checked first.
    static_loader: Option<StaticLoader>,
    context_map: Option<Arc<ContextMap>>,
    fallback: Option<Arc<dyn DocumentLoader>>,
}

impl std::fmt::Debug for ContextLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("ContextLoader")
            .field("static_loader", &self.static_loader.is_some())
            .field("strict", &self.is_strict())
            .finish_non_exhaustive()
    }
}

impl ContextLoader {
    /// Constructs an "empty" ContextLoader, that rejects everything.
    pub fn empty() -> Self {
        Self {
            static_loader: None,
            context_map: None,
            fallback: None,
        }
    }

    pub fn with_static_loader(mut self) -> Self {
        self.static_loader = Some(StaticLoader);
        self
    }

    /// Using the builder pattern, the map of additional documents can be set.
    /// These are checked after the pinned contexts.
    pub fn with_context_map(mut self, context_map: HashMap<String, Value>) -> Self {
        let context_map = context_map
            .into_iter()
            .map(|(url, document)| {
                let remote = RemoteDocument::new(&url, document);
                (url, remote)
            })
            .collect();
        self.context_map = Some(Arc::new(context_map));
        self
    }

    /// Like [`Self::with_context_map`], from unparsed JSON documents.
    pub fn with_context_map_from(
        self,
        preparsed_context_map: HashMap<String, String>,
    ) -> Result<Self, Error> {
        let context_map = preparsed_context_map
            .into_iter()
            .map(|(url, json)| -> Result<(String, Value), Error> {
                Ok((url, serde_json::from_str(&json)?))
            })
            .collect::<Result<HashMap<String, Value>, Error>>()?;
        Ok(self.with_context_map(context_map))
    }

    /// Chains a loader consulted for every URL not known locally.
    pub fn extend(mut self, fallback: Arc<dyn DocumentLoader>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.fallback.is_none()
    }
}

/// The default ContextLoader only uses StaticLoader.
impl Default for ContextLoader {
    fn default() -> Self {
        Self::empty().with_static_loader()
    }
}

#[async_trait]
impl DocumentLoader for ContextLoader {
    async fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
        if let Some(static_loader) = &self.static_loader {
            if let Ok(remote) = static_loader.load(url).await {
                return Ok(remote);
            }
        }
        if let Some(context_map) = &self.context_map {
            // Documents are stored without fragment, which only selects a
            // node within them.
            let document_url = url.split('#').next().unwrap_or(url);
            if let Some(remote) = context_map
                .get(url)
                .or_else(|| context_map.get(document_url))
            {
                return Ok(remote.clone());
            }
        }
        match &self.fallback {
            Some(fallback) => fallback.load(url).await,
            None => {
                log::warn!("Rejecting document outside of the pinned set: {}", url);
                Err(LoaderError::UnknownContext(url.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::{CREDENTIALS_V1_CONTEXT, SECURITY_V2_CONTEXT};
    use serde_json::json;

    struct Hijacker;

    #[async_trait]
    impl DocumentLoader for Hijacker {
        async fn load(&self, url: &str) -> Result<RemoteDocument, LoaderError> {
            Ok(RemoteDocument::new(url, json!({"@context": {"hijacked": true}})))
        }
    }

    #[async_std::test]
    async fn strict_loader_rejects_unknown_urls() {
        let loader = ContextLoader::default();
        assert!(loader.is_strict());
        assert!(loader.load(SECURITY_V2_CONTEXT).await.is_ok());
        let err = loader.load("https://example.org/ctx").await.unwrap_err();
        assert_eq!(err, LoaderError::UnknownContext("https://example.org/ctx".into()));
    }

    #[async_std::test]
    async fn pinned_contexts_win_over_fallback() {
        let loader = ContextLoader::default().extend(Arc::new(Hijacker));
        assert!(!loader.is_strict());
        let remote = loader.load(CREDENTIALS_V1_CONTEXT).await.unwrap();
        assert!(remote.document["@context"].get("hijacked").is_none());
        let remote = loader.load("https://example.org/ctx").await.unwrap();
        assert_eq!(remote.document["@context"]["hijacked"], json!(true));
    }

    #[async_std::test]
    async fn context_map_strips_fragment() {
        let mut documents = HashMap::new();
        documents.insert(
            "did:example:alice".to_string(),
            r#"{"id": "did:example:alice"}"#.to_string(),
        );
        let loader = ContextLoader::default()
            .with_context_map_from(documents)
            .unwrap();
        let remote = loader.load("did:example:alice#key-1").await.unwrap();
        assert_eq!(remote.document_url, "did:example:alice");
        assert!(ContextLoader::empty().load(SECURITY_V2_CONTEXT).await.is_err());
        assert!(ContextLoader::default()
            .with_context_map_from([("x".to_string(), "{".to_string())].into())
            .is_err());
    }
}
