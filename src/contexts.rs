//! Vocabulary contexts pinned in the crate.
//!
//! These are served by [`StaticLoader`](crate::loader::StaticLoader) without
//! ever touching the network, so canonicalization cannot be influenced by a
//! tampered or unavailable remote copy.

use serde_json::Value;

use crate::loader::RemoteDocument;

pub const SECURITY_V1_CONTEXT: &str = "https://w3id.org/security/v1";
pub const SECURITY_V2_CONTEXT: &str = "https://w3id.org/security/v2";
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const DID_V1_CONTEXT_NO_WWW: &str = "https://w3.org/ns/did/v1";
pub const W3ID_DID_V1_CONTEXT: &str = "https://w3id.org/did/v1";
pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Base IRI of the security vocabulary.
pub const SECURITY_VOCAB: &str = "https://w3id.org/security#";

pub const SECURITY_V1: &str = include_str!("../contexts/w3id-security-v1.jsonld");
pub const SECURITY_V2: &str = include_str!("../contexts/w3id-security-v2.jsonld");
pub const DID_V1: &str = include_str!("../contexts/w3c-did-v1.jsonld");
pub const CREDENTIALS_V1: &str = include_str!("../contexts/w3c-2018-credentials-v1.jsonld");

/// Load a pinned context from its static definition.
fn load_static_context(url: &str, content: &str) -> RemoteDocument {
    let document: Value = serde_json::from_str(content).unwrap();
    RemoteDocument::new(url, document)
}

lazy_static::lazy_static! {
    pub static ref SECURITY_V1_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(SECURITY_V1_CONTEXT, SECURITY_V1);
    pub static ref SECURITY_V2_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(SECURITY_V2_CONTEXT, SECURITY_V2);
    pub static ref DID_V1_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(DID_V1_CONTEXT, DID_V1);
    pub static ref CREDENTIALS_V1_CONTEXT_DOCUMENT: RemoteDocument =
        load_static_context(CREDENTIALS_V1_CONTEXT, CREDENTIALS_V1);
}

/// Looks up a pinned context by URL.
pub fn pinned(url: &str) -> Option<&'static RemoteDocument> {
    match url {
        SECURITY_V1_CONTEXT => Some(&*SECURITY_V1_CONTEXT_DOCUMENT),
        SECURITY_V2_CONTEXT => Some(&*SECURITY_V2_CONTEXT_DOCUMENT),
        DID_V1_CONTEXT | DID_V1_CONTEXT_NO_WWW | W3ID_DID_V1_CONTEXT => {
            Some(&*DID_V1_CONTEXT_DOCUMENT)
        }
        CREDENTIALS_V1_CONTEXT => Some(&*CREDENTIALS_V1_CONTEXT_DOCUMENT),
        _ => None,
    }
}
