use async_trait::async_trait;
use serde_json::Value;

use super::{ControllerProofPurpose, ProofPurpose, TimestampWindow};
use crate::document::Document;
use crate::environment::Environment;
use crate::proof::{Proof, PurposeResult};
use crate::verification_method::VerificationMethod;

pub const ASSERTION_METHOD: &str = "assertionMethod";

/// The key's controller vouches for the claims of the document.
#[derive(Debug, Clone)]
pub struct AssertionProofPurpose(ControllerProofPurpose);

impl AssertionProofPurpose {
    pub fn new() -> Self {
        Self(ControllerProofPurpose::new(ASSERTION_METHOD))
    }

    pub fn with_controller(self, controller: Value) -> Self {
        Self(self.0.with_controller(controller))
    }

    pub fn with_timestamp_window(self, window: TimestampWindow) -> Self {
        Self(self.0.with_timestamp_window(window))
    }
}

impl Default for AssertionProofPurpose {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProofPurpose for AssertionProofPurpose {
    fn term(&self) -> &str {
        self.0.term()
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
