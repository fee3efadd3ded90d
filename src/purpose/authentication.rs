use async_trait::async_trait;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ControllerProofPurpose, ProofPurpose, TimestampWindow};
use crate::document::Document;
use crate::environment::Environment;
use crate::error::Error;
use crate::proof::{Proof, PurposeResult};
use crate::verification_method::VerificationMethod;

pub const AUTHENTICATION: &str = "authentication";

/// Options of an authentication, as exchanged with the party requesting it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct AuthenticationOptions {
    pub challenge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timestamp_delta: Option<i64>,
}

/// The key's controller authenticates, in answer to `challenge` (and
/// `domain`, if set).
///
/// Proofs are stamped with the challenge and domain on creation and must
/// echo them exactly on verification.
#[derive(Debug, Clone)]
pub struct AuthenticationProofPurpose {
    challenge: String,
    domain: Option<String>,
    controller: ControllerProofPurpose,
}

impl AuthenticationProofPurpose {
    pub fn new(challenge: &str, domain: Option<&str>) -> Self {
        Self {
            challenge: challenge.to_string(),
            domain: domain.map(str::to_string),
            controller: ControllerProofPurpose::new(AUTHENTICATION),
        }
    }

    pub fn with_controller(mut self, controller: Value) -> Self {
        self.controller = self.controller.with_controller(controller);
        self
    }

    pub fn with_timestamp_window(mut self, window: TimestampWindow) -> Self {
        self.controller = self.controller.with_timestamp_window(window);
        self
    }

    fn check_binding(&self, proof: &Proof) -> Result<(), Error> {
        if proof.challenge.as_deref() != Some(self.challenge.as_str()) {
            return Err(Error::Purpose(format!(
                "The challenge is not as expected; challenge=\"{}\", expected=\"{}\"",
                proof.challenge.as_deref().unwrap_or_default(),
                self.challenge
            )));
        }
        if let Some(domain) = &self.domain {
            if proof.domain.as_ref() != Some(domain) {
                return Err(Error::Purpose(format!(
                    "The domain is not as expected; domain=\"{}\", expected=\"{}\"",
                    proof.domain.as_deref().unwrap_or_default(),
                    domain
                )));
            }
        }
        Ok(())
    }
}

impl From<AuthenticationOptions> for AuthenticationProofPurpose {
    fn from(options: AuthenticationOptions) -> Self {
        let window = TimestampWindow {
            date: options.date,
            max_timestamp_delta: options.max_timestamp_delta,
        };
        Self::new(&options.challenge, options.domain.as_deref()).with_timestamp_window(window)
    }
}

#[async_trait]
impl ProofPurpose for AuthenticationProofPurpose {
    fn term(&self) -> &str {
        self.controller.term()
    }

    fn update(&self, proof: Proof) -> Proof {
        Proof {
            proof_purpose: Some(self.term().to_string()),
            challenge: Some(self.challenge.clone()),
            domain: self.domain.clone().or(proof.domain.clone()),
            ..proof
        }
    }

    async fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        document: &Document,
        env: &Environment,
    ) -> PurposeResult {
        if let Err(error) = self.check_binding(proof) {
            return PurposeResult::invalid(error);
        }
        self.controller.validate(proof, method, document, env).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_stamps_challenge_and_domain() {
        let purpose = AuthenticationProofPurpose::new("abc", Some("example.org"));
        let proof = purpose.update(Proof::new("Ed25519Signature2018"));
        assert_eq!(proof.proof_purpose.as_deref(), Some("authentication"));
        assert_eq!(proof.challenge.as_deref(), Some("abc"));
        assert_eq!(proof.domain.as_deref(), Some("example.org"));
        assert!(purpose.check_binding(&proof).is_ok());
    }

    #[test]
    fn binding_mismatch() {
        let proof = AuthenticationProofPurpose::new("abc", Some("example.org"))
            .update(Proof::new("Ed25519Signature2018"));
        let err = AuthenticationProofPurpose::new("xyz", None)
            .check_binding(&proof)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The challenge is not as expected; challenge=\"abc\", expected=\"xyz\""
        );
        let err = AuthenticationProofPurpose::new("abc", Some("evil.example"))
            .check_binding(&proof)
            .unwrap_err();
        assert_eq!(err.name(), "PurposeError");
    }

    #[test]
    fn options_deserialize() {
        let options: AuthenticationOptions =
            serde_json::from_str(r#"{"challenge": "abc", "maxTimestampDelta": 300}"#).unwrap();
        let purpose = AuthenticationProofPurpose::from(options);
        assert_eq!(purpose.challenge, "abc");
        assert!(serde_json::from_str::<AuthenticationOptions>(r#"{"domain": "x"}"#).is_err());
    }
}
