//! Linked Data proofs: attaching, deriving and verifying cryptographic
//! proofs over JSON documents.
//!
//! A proof binds a document to a signing key *and* to a purpose, such as
//! asserting the document's claims or authenticating its holder. Verifying a
//! document means checking both that some proof's signature is correct, and
//! that the key's controller authorized that key for every required
//! purpose.
//!
//! The main pieces are:
//! - [signature suites](suite), implementing the canonicalize, hash and sign
//!   protocol for one proof type;
//! - [proof purposes](purpose), checking the authorization of a key;
//! - the [proof set engine](proof_set::ProofSet), matching the proofs of a
//!   document against the acceptable suites and required purposes.
//!
//! Canonicalization, hashing, document loading and time are injected through
//! an [`Environment`]. The default one canonicalizes with JCS, hashes with
//! SHA-256 and only loads the [pinned contexts](contexts).
//!
//! # Basic Usage
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use ld_signatures::{
//!     loader::ContextLoader, purpose::AssertionProofPurpose,
//!     suite::{ed25519_signature_2018, Ed25519KeyPair}, Document, Environment, VerifyOptions,
//! };
//! use serde_json::json;
//!
//! # async_std::task::block_on(async {
//! let key = Arc::new(Ed25519KeyPair::generate("did:example:alice#key-1", "did:example:alice"));
//!
//! // The controller document lists the key as an assertion method.
//! let mut documents = HashMap::new();
//! documents.insert("did:example:alice".to_string(), json!({
//!     "id": "did:example:alice",
//!     "verificationMethod": [key.to_verification_method()],
//!     "assertionMethod": ["did:example:alice#key-1"]
//! }));
//! let env = Environment::default()
//!     .with_context_loader(ContextLoader::default().with_context_map(documents));
//!
//! let document = Document::new(json!({
//!     "@context": "https://www.w3.org/2018/credentials/v1",
//!     "type": ["VerifiableCredential"],
//!     "issuer": "did:example:alice"
//! }));
//! let signed = ld_signatures::sign(
//!     &document,
//!     Arc::new(ed25519_signature_2018(Some(key))),
//!     Arc::new(AssertionProofPurpose::new()),
//!     &env,
//! )
//! .await
//! .unwrap();
//!
//! let options = VerifyOptions::default()
//!     .with_suite(Arc::new(ed25519_signature_2018(None)))
//!     .with_purpose(Arc::new(AssertionProofPurpose::new()));
//! let result = ld_signatures::verify(&signed, &options, &env).await;
//! assert!(result.verified);
//! # })
//! ```

use std::sync::Arc;

pub mod contexts;
pub mod document;
pub mod environment;
pub mod error;
pub mod jws;
pub mod loader;
pub mod one_or_many;
pub mod proof;
pub mod proof_set;
pub mod purpose;
pub mod suite;
pub mod verification_method;

pub use document::{Document, DocumentId};
pub use environment::Environment;
pub use error::{Error, ErrorRecord, LoaderError, VerificationError};
pub use one_or_many::OneOrMany;
pub use proof::{Proof, ProofResult, PurposeResult, VerificationResult};
pub use proof_set::{ProofSet, ProofSetOptions, VerifyOptions};
pub use purpose::ProofPurpose;
pub use suite::ProofSuite;

/// Adds a proof created by `suite` for `purpose` to `document`.
pub async fn sign(
    document: &Document,
    suite: Arc<dyn ProofSuite>,
    purpose: Arc<dyn ProofPurpose>,
    env: &Environment,
) -> Result<Document, Error> {
    ProofSet::new(env.clone())
        .add(document, ProofSetOptions::new(suite, purpose))?
        .await
}

/// Derives a new document, with a proof derived by `suite`, from `document`.
pub async fn derive(
    document: &Document,
    suite: Arc<dyn ProofSuite>,
    purpose: Arc<dyn ProofPurpose>,
    env: &Environment,
) -> Result<Document, Error> {
    ProofSet::new(env.clone())
        .derive(document, ProofSetOptions::new(suite, purpose))?
        .await
}

/// Verifies the proof set of `document`.
pub async fn verify(
    document: &Document,
    options: &VerifyOptions,
    env: &Environment,
) -> VerificationResult {
    ProofSet::new(env.clone()).verify(document, options).await
}
