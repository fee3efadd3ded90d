//! Proof purposes.
//!
//! A purpose names the intent a proof was created for (asserting a claim,
//! authenticating, ...) and checks that the controller of the signing key
//! authorized that key for this intent.

use async_trait::async_trait;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::contexts::SECURITY_VOCAB;
use crate::document::Document;
use crate::environment::{Clock, Environment};
use crate::error::Error;
use crate::proof::{Proof, PurposeResult};
use crate::verification_method::VerificationMethod;

mod assertion;
mod authentication;
mod controller;
mod public_key;

pub use assertion::AssertionProofPurpose;
pub use authentication::{AuthenticationOptions, AuthenticationProofPurpose};
pub use controller::ControllerProofPurpose;
pub use public_key::PublicKeyProofPurpose;

#[async_trait]
pub trait ProofPurpose: Send + Sync {
    /// Short term (`assertionMethod`) or IRI of the purpose.
    fn term(&self) -> &str;

    /// Whether `proof` was created for this purpose.
    async fn match_proof(&self, proof: &Proof, _document: &Document, _env: &Environment) -> bool {
        proof.proof_purpose.as_deref().map(compact_term) == Some(compact_term(self.term()))
    }

    /// Stamps the purpose on a proof being created.
    fn update(&self, proof: Proof) -> Proof {
        Proof {
            proof_purpose: Some(self.term().to_string()),
            ..proof
        }
    }

    /// Checks that `proof`, whose signature has been verified with `method`,
    /// is valid for this purpose.
    async fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        document: &Document,
        env: &Environment,
    ) -> PurposeResult;
}

/// Compacts a security vocabulary IRI (or `sec:` compact IRI) to its term.
///
/// Relationship IRIs use a `Method` suffix that their terms drop, so that
/// `https://w3id.org/security#authenticationMethod` compacts to
/// `authentication`.
pub fn compact_term(term: &str) -> &str {
    let term = term
        .strip_prefix(SECURITY_VOCAB)
        .or_else(|| term.strip_prefix("sec:"))
        .unwrap_or(term);
    match term {
        "authenticationMethod" => "authentication",
        "keyAgreementMethod" => "keyAgreement",
        "capabilityInvocationMethod" => "capabilityInvocation",
        "capabilityDelegationMethod" => "capabilityDelegation",
        term => term,
    }
}

/// Acceptable range of proof creation times: `date` (or now) plus or minus
/// `maxTimestampDelta` seconds. Unbounded without a delta.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct TimestampWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timestamp_delta: Option<i64>,
}

impl TimestampWindow {
    pub fn new(max_timestamp_delta: i64) -> Self {
        Self {
            date: None,
            max_timestamp_delta: Some(max_timestamp_delta),
        }
    }

    pub fn at(self, date: DateTime<Utc>) -> Self {
        Self {
            date: Some(date),
            ..self
        }
    }

    pub fn check(&self, created: Option<DateTime<Utc>>, clock: &dyn Clock) -> Result<(), Error> {
        let delta = match self.max_timestamp_delta {
            Some(delta) => chrono::Duration::try_seconds(delta),
            None => return Ok(()),
        };
        let expected = self.date.unwrap_or_else(|| clock.now());
        // A bound past the representable range leaves that side open.
        let earliest = delta.and_then(|delta| expected.checked_sub_signed(delta));
        let latest = delta.and_then(|delta| expected.checked_add_signed(delta));
        match created {
            Some(created)
                if earliest.map_or(true, |earliest| created >= earliest)
                    && latest.map_or(true, |latest| created <= latest) =>
            {
                Ok(())
            }
            _ => Err(Error::Purpose(
                "The proof's created timestamp is out of range.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::FixedClock;

    #[test]
    fn compacts_security_terms() {
        assert_eq!(compact_term("https://w3id.org/security#assertionMethod"), "assertionMethod");
        assert_eq!(compact_term("sec:authenticationMethod"), "authentication");
        assert_eq!(compact_term("authentication"), "authentication");
        assert_eq!(compact_term("https://example.org/purposes#vote"), "https://example.org/purposes#vote");
    }

    #[test]
    fn timestamp_window() {
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let clock = FixedClock(now);
        let window = TimestampWindow::new(600);
        assert!(window.check(Some(now - chrono::Duration::seconds(600)), &clock).is_ok());
        assert!(window.check(Some(now + chrono::Duration::seconds(1000)), &clock).is_err());
        assert!(window.check(None, &clock).is_err());
        assert!(TimestampWindow::default().check(None, &clock).is_ok());

        let window = TimestampWindow::new(600).at(now - chrono::Duration::seconds(1000));
        assert!(window.check(Some(now), &clock).is_err());
    }

    #[test]
    fn huge_delta_leaves_window_open() {
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let clock = FixedClock(now);
        let window: TimestampWindow =
            serde_json::from_str(r#"{"maxTimestampDelta": 10000000000000}"#).unwrap();
        assert!(window.check(Some(now - chrono::Duration::days(365)), &clock).is_ok());
        let window = TimestampWindow::new(i64::MAX);
        assert!(window.check(Some(now), &clock).is_ok());
        let window = TimestampWindow::new(i64::MIN);
        assert!(window.check(Some(now), &clock).is_ok());
        assert!(window.check(None, &clock).is_err());
    }

    #[test]
    fn window_options_reject_unknown_fields() {
        let window: TimestampWindow =
            serde_json::from_str(r#"{"maxTimestampDelta": 600, "date": "2021-06-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(window.max_timestamp_delta, Some(600));
        assert!(serde_json::from_str::<TimestampWindow>(r#"{"maxDelta": 1}"#).is_err());
    }
}
