use async_trait::async_trait;
use serde_json::Value;

use super::{compact_term, ProofPurpose, TimestampWindow};
use crate::document::Document;
use crate::environment::Environment;
use crate::error::Error;
use crate::proof::{Proof, PurposeResult};
use crate::verification_method::{ControllerDocument, VerificationMethod};

/// Purpose authorized through a relationship of the key's controller
/// document: the key id must be listed under the purpose term.
///
/// Any IRI may be used as the term, for application-specific purposes.
#[derive(Debug, Clone)]
pub struct ControllerProofPurpose {
    term: String,
    controller: Option<ControllerDocument>,
    window: TimestampWindow,
}

impl ControllerProofPurpose {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            controller: None,
            window: TimestampWindow::default(),
        }
    }

    /// Uses `controller` instead of loading the controller document.
    pub fn with_controller(mut self, controller: Value) -> Self {
        self.controller = Some(ControllerDocument(controller));
        self
    }

    pub fn with_timestamp_window(mut self, window: TimestampWindow) -> Self {
        self.window = window;
        self
    }

    pub(crate) async fn validate_controller(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        env: &Environment,
    ) -> Result<ControllerDocument, Error> {
        self.window.check(proof.created_at(), env.clock.as_ref())?;
        let controller = match &self.controller {
            Some(controller) => controller.clone(),
            None => {
                let id = method.controller.as_deref().ok_or_else(|| {
                    Error::Purpose(format!(
                        "Verification method \"{}\" has no controller.",
                        method.id
                    ))
                })?;
                let remote = env.loader.load(id).await.map_err(|source| Error::Controller {
                    controller: id.to_string(),
                    source,
                })?;
                ControllerDocument(remote.document)
            }
        };
        let term = compact_term(&self.term);
        if !controller.allows_verification_method(&method.id, term) {
            return Err(Error::Purpose(format!(
                "Verification method \"{}\" not authorized by controller for proof purpose \"{}\".",
                method.id, term
            )));
        }
        Ok(controller)
    }
}

#[async_trait]
impl ProofPurpose for ControllerProofPurpose {
    fn term(&self) -> &str {
        &self.term
    }

    async fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        _document: &Document,
        env: &Environment,
    ) -> PurposeResult {
        match self.validate_controller(proof, method, env).await {
            Ok(controller) => PurposeResult {
                valid: true,
                controller: Some(controller.0),
                error: None,
            },
            Err(error) => PurposeResult::invalid(error),
        }
    }
}
