use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::one_or_many::OneOrMany;
use crate::verification_method::VerificationMethod;

/// Proof properties that carry signature material, and so are excluded from
/// the signed proof options.
pub const SIGNATURE_PROPERTIES: [&str; 3] = ["signatureValue", "jws", "proofValue"];

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "@context")]
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    #[serde(rename = "type")]
    pub type_: String,
    /// Creation time as written by the signer. Kept verbatim, since it is
    /// part of the signed proof options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<VerificationMethodRef>,
    /// Legacy key reference, superseded by `verificationMethod`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[serde(flatten)]
    pub property_set: Map<String, Value>,
}

/// Reference to the key that produced a proof: either its id or an embedded
/// description carrying an `id`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum VerificationMethodRef {
    Id(String),
    Object(Map<String, Value>),
}

impl VerificationMethodRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Object(object) => object.get("id").and_then(Value::as_str),
        }
    }
}

impl From<&str> for VerificationMethodRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl Proof {
    pub fn new(type_: &str) -> Self {
        Self {
            type_: type_.to_string(),
            ..Self::default()
        }
    }

    /// Id of the verification method, falling back to the legacy `creator`.
    pub fn verification_method_id(&self) -> Option<&str> {
        self.verification_method
            .as_ref()
            .and_then(VerificationMethodRef::id)
            .or(self.creator.as_deref())
    }

    /// The proof options: this proof without any signature carrier.
    pub fn without_signature(&self) -> Proof {
        let mut proof = self.clone();
        proof.signature_value = None;
        proof.jws = None;
        for property in SIGNATURE_PROPERTIES {
            proof.property_set.remove(property);
        }
        proof
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses a single proof of a proof set.
    pub fn from_value(value: &Value) -> Result<Proof, Error> {
        if !value.is_object() {
            return Err(Error::Json("Proof must be a JSON object.".to_string()));
        }
        Ok(Proof::deserialize(value)?)
    }

    /// The creation time, if `created` is a valid RFC 3339 timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let created = self.created.as_deref()?;
        DateTime::parse_from_rfc3339(created)
            .map(|date| date.with_timezone(&Utc))
            .ok()
    }
}

/// Formats a proof timestamp: UTC, second precision, `Z` suffix.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Outcome of a suite verifying one proof's signature.
#[derive(Debug, Clone, Default)]
pub struct SignatureCheck {
    pub verified: bool,
    pub verification_method: Option<VerificationMethod>,
    pub error: Option<Error>,
}

/// Outcome of one purpose validating a verified proof.
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PurposeResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl PurposeResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    pub fn invalid(error: Error) -> Self {
        Self {
            valid: false,
            controller: None,
            error: Some(error),
        }
    }
}

/// Verification record of one proof of a proof set.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub proof: Proof,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<VerificationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose_result: Option<OneOrMany<PurposeResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl ProofResult {
    pub(crate) fn new(proof: Proof, check: SignatureCheck) -> Self {
        Self {
            proof,
            verified: check.verified,
            verification_method: check.verification_method,
            purpose_result: None,
            error: check.error,
        }
    }

    /// Records a purpose outcome. The first failure marks the proof as not
    /// verified; later outcomes are appended but never replace its error.
    pub(crate) fn push_purpose_result(&mut self, result: PurposeResult) {
        if !result.valid && self.verified {
            self.verified = false;
            self.error = result.error.clone();
        }
        self.purpose_result = Some(match self.purpose_result.take() {
            None => OneOrMany::One(result),
            Some(results) => results.push(result),
        });
    }
}

/// Result of verifying a document's proof set.
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ProofResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl VerificationResult {
    pub fn error(error: Error) -> Self {
        Self {
            verified: false,
            results: Vec::new(),
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_date_has_second_precision() {
        let date = Utc.timestamp_opt(1_600_000_000, 123_456_789).unwrap();
        assert_eq!(format_date(&date), "2020-09-13T12:26:40Z");
        let value = serde_json::to_value(Proof::new("Ed25519Signature2018")).unwrap();
        assert!(value.get("created").is_none());
        assert!(value.get("jws").is_none());
    }

    #[test]
    fn created_is_kept_verbatim() {
        let proof: Proof = serde_json::from_value(json!({
            "type": "Ed25519Signature2018",
            "created": "2021-01-01T00:00:00.123Z"
        }))
        .unwrap();
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["created"], json!("2021-01-01T00:00:00.123Z"));
        assert_eq!(
            proof.created_at(),
            Some(Utc.timestamp_opt(1_609_459_200, 123_000_000).unwrap())
        );

        let undated = Proof {
            created: Some("2020-04-25T16:41:42".to_string()),
            ..proof
        };
        assert_eq!(undated.created_at(), None);
        assert_eq!(
            undated.to_value().unwrap()["created"],
            json!("2020-04-25T16:41:42")
        );
    }

    #[test]
    fn legacy_fields_and_extra_properties() {
        let proof: Proof = serde_json::from_value(json!({
            "type": "RsaSignature2018",
            "creator": "https://example.com/keys/1",
            "created": "2018-02-01T12:00:00+01:00",
            "proofValue": "zabc",
            "cryptosuite": "test-2022"
        }))
        .unwrap();
        assert_eq!(proof.verification_method_id(), Some("https://example.com/keys/1"));
        assert_eq!(
            proof.created_at(),
            Some(Utc.with_ymd_and_hms(2018, 2, 1, 11, 0, 0).unwrap())
        );
        let options = proof.without_signature();
        assert!(!options.property_set.contains_key("proofValue"));
        assert_eq!(options.property_set["cryptosuite"], json!("test-2022"));
    }

    #[test]
    fn embedded_verification_method() {
        let proof: Proof = serde_json::from_value(json!({
            "type": "Ed25519Signature2018",
            "verificationMethod": {"id": "did:example:alice#key-1", "type": "Ed25519VerificationKey2018"},
            "creator": "ignored"
        }))
        .unwrap();
        assert_eq!(proof.verification_method_id(), Some("did:example:alice#key-1"));
    }

    #[test]
    fn first_purpose_failure_is_kept() {
        let mut result = ProofResult::new(
            Proof::new("A"),
            SignatureCheck {
                verified: true,
                ..SignatureCheck::default()
            },
        );
        result.push_purpose_result(PurposeResult::valid());
        result.push_purpose_result(PurposeResult::invalid(Error::Purpose("first".into())));
        result.push_purpose_result(PurposeResult::invalid(Error::Purpose("second".into())));
        assert!(!result.verified);
        assert_eq!(result.error.as_ref().unwrap().to_string(), "first");
        assert_eq!(result.purpose_result.as_ref().unwrap().len(), 3);
    }
}
