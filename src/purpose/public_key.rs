use async_trait::async_trait;

use super::{ControllerProofPurpose, ProofPurpose};
use crate::document::Document;
use crate::environment::Environment;
use crate::proof::{Proof, PurposeResult};
use crate::verification_method::VerificationMethod;

pub const PUBLIC_KEY: &str = "publicKey";

/// Purpose of proofs created before proof purposes existed.
///
/// It only matches proofs without a `proofPurpose`, and does not stamp one;
/// the key must be listed under the controller's `publicKey`.
#[derive(Debug, Clone)]
pub struct PublicKeyProofPurpose(ControllerProofPurpose);

impl PublicKeyProofPurpose {
    pub fn new() -> Self {
        Self(ControllerProofPurpose::new(PUBLIC_KEY))
    }
}

impl Default for PublicKeyProofPurpose {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProofPurpose for PublicKeyProofPurpose {
    fn term(&self) -> &str {
        self.0.term()
    }

    async fn match_proof(&self, proof: &Proof, _document: &Document, _env: &Environment) -> bool {
        proof.proof_purpose.is_none()
    }

    fn update(&self, proof: Proof) -> Proof {
        proof
    }

    async fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        document: &Document,
        env: &Environment,
    ) -> PurposeResult {
        self.0.validate(proof, method, document, env).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[async_std::test]
    async fn matches_only_proofs_without_purpose() {
        let purpose = PublicKeyProofPurpose::new();
        let env = Environment::default();
        let document = Document::new(json!({}));
        let proof = purpose.update(Proof::new("RsaSignature2018"));
        assert!(proof.proof_purpose.is_none());
        assert!(purpose.match_proof(&proof, &document, &env).await);

        let stamped = Proof {
            proof_purpose: Some("assertionMethod".to_string()),
            ..proof
        };
        assert!(!purpose.match_proof(&stamped, &document, &env).await);
    }
}
