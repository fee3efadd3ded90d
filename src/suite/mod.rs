//! Signature suites.
//!
//! A suite owns one proof `type` and implements the canonicalize, hash and
//! sign protocol for it. [`LinkedDataSignature`] implements the protocol once
//! for any signer; concrete suites such as `Ed25519Signature2018` are presets
//! of it.

use async_trait::async_trait;

use crate::document::Document;
use crate::environment::Environment;
use crate::error::Error;
use crate::proof::{Proof, SignatureCheck};
use crate::purpose::ProofPurpose;

#[cfg(feature = "ed25519")]
pub mod ed25519;
mod signature;
mod signer;

#[cfg(feature = "ed25519")]
pub use ed25519::{ed25519_signature_2018, Ed25519KeyPair, Ed25519VerifierFactory};
pub use signature::{LinkedDataSignature, SignatureCarrier};
pub use signer::{Signer, Verifier, VerifierFactory};

#[async_trait]
pub trait ProofSuite: Send + Sync {
    /// The proof `type` this suite produces.
    fn type_(&self) -> &str;

    /// Creates a proof over `document` for `purpose`.
    ///
    /// `proof_set` holds the proofs already attached to the document. Only
    /// misconfiguration of the suite (e.g. no signer) is an error; the shape
    /// of the input document is not checked here.
    async fn create_proof(
        &self,
        document: &Document,
        purpose: &dyn ProofPurpose,
        proof_set: &[Proof],
        env: &Environment,
    ) -> Result<Proof, Error>;

    /// Verifies the signature of `proof` over `document`.
    ///
    /// Never fails: any error is reported in the returned check.
    async fn verify_proof(
        &self,
        proof: &Proof,
        document: &Document,
        purpose: &dyn ProofPurpose,
        env: &Environment,
    ) -> SignatureCheck;

    /// Whether this suite is able to verify `proof`.
    async fn match_proof(&self, proof: &Proof) -> bool {
        proof.type_ == self.type_()
    }

    /// Whether proofs must reach this suite exactly as serialized in the
    /// document, without the document's `@context` merged in.
    ///
    /// Suites hashing the proof's canonical JSON as found should return
    /// `true`.
    fn requires_untouched_proof(&self) -> bool {
        false
    }

    /// Produces a new document holding a derived proof, for selective
    /// disclosure suites.
    async fn derive(
        &self,
        _document: &Document,
        _purpose: &dyn ProofPurpose,
        _proof_set: &[Proof],
        _env: &Environment,
    ) -> Result<Document, Error> {
        Err(Error::NotImplemented("derive"))
    }
}
