use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::error::Error;
use crate::one_or_many::OneOrMany;
use crate::proof::Proof;

/// Property holding the proof set.
pub const PROOF_PROPERTY: &str = "proof";

/// Property used by documents signed before `proof` was standardized.
pub const LEGACY_PROOF_PROPERTY: &str = "signature";

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of an in-memory document.
///
/// Assigned once by [`Document::new`] and kept by every document derived
/// from it by replacing the proof set, since those share the same unsecured
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A JSON document that may carry a proof set.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    body: Value,
}

impl Document {
    pub fn new(body: Value) -> Self {
        Self {
            id: DocumentId::next(),
            body,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }

    pub fn into_value(self) -> Value {
        self.body
    }

    pub fn is_object(&self) -> bool {
        self.body.is_object()
    }

    /// The `@context` of the document, if any.
    pub fn context(&self) -> Option<&Value> {
        self.body.get("@context")
    }

    fn object(&self) -> Result<&Map<String, Value>, Error> {
        self.body
            .as_object()
            .ok_or_else(|| Error::Json("Document must be a JSON object.".to_string()))
    }

    /// The raw entries of the proof set, in insertion order.
    ///
    /// Proofs are read from `proof`, or from the legacy `signature` property
    /// when `proof` is absent.
    pub fn proof_values(&self) -> Result<Vec<Value>, Error> {
        let object = self.object()?;
        match object
            .get(PROOF_PROPERTY)
            .or_else(|| object.get(LEGACY_PROOF_PROPERTY))
        {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(values)) => Ok(values.clone()),
            Some(value @ Value::Object(_)) => Ok(vec![value.clone()]),
            Some(_) => {
                log::warn!("Ignoring document with a malformed proof set");
                Err(Error::Json("Proof set must be an object or array.".to_string()))
            }
        }
    }

    /// Extracts the proof set, in insertion order.
    ///
    /// Entries that are not well-formed proofs are skipped: no suite or
    /// purpose can claim them, and they must not hide the others.
    pub fn proofs(&self) -> Result<Vec<Proof>, Error> {
        Ok(self
            .proof_values()?
            .iter()
            .enumerate()
            .filter_map(|(index, value)| match Proof::from_value(value) {
                Ok(proof) => Some(proof),
                Err(e) => {
                    log::warn!("Skipping malformed proof #{}: {}", index, e);
                    None
                }
            })
            .collect())
    }

    /// A copy of the document with the proof set removed.
    pub fn without_proofs(&self) -> Result<Value, Error> {
        let mut object = self.object()?.clone();
        object.remove(PROOF_PROPERTY);
        object.remove(LEGACY_PROOF_PROPERTY);
        Ok(Value::Object(object))
    }

    /// A copy of the document carrying `proofs` as its proof set.
    ///
    /// A single proof is written as an object, several as an array. The
    /// returned document keeps this document's identity.
    pub fn with_proofs(&self, proofs: Vec<Proof>) -> Result<Document, Error> {
        let values = proofs
            .iter()
            .map(Proof::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_proof_values(values)
    }

    /// Like [`Self::with_proofs`], for raw proof set entries.
    pub fn with_proof_values(&self, values: Vec<Value>) -> Result<Document, Error> {
        let mut body = self.without_proofs()?;
        if !values.is_empty() {
            let values = OneOrMany::from(values);
            if let Value::Object(object) = &mut body {
                object.insert(PROOF_PROPERTY.to_string(), serde_json::to_value(values)?);
            }
        }
        Ok(Document { id: self.id, body })
    }
}

impl From<Value> for Document {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proof(type_: &str) -> Value {
        json!({
            "type": type_,
            "created": "2021-01-01T00:00:00Z",
            "verificationMethod": "did:example:alice#key-1",
            "proofPurpose": "assertionMethod",
            "jws": "abc..def"
        })
    }

    #[test]
    fn reads_single_and_array_proof_sets() {
        let single = Document::new(json!({"name": "a", "proof": proof("A")}));
        assert_eq!(single.proofs().unwrap().len(), 1);

        let many = Document::new(json!({"name": "a", "proof": [proof("A"), proof("B")]}));
        let proofs = many.proofs().unwrap();
        assert_eq!(proofs.len(), 2);
        assert_eq!(proofs[1].type_, "B");

        let none = Document::new(json!({"name": "a"}));
        assert!(none.proofs().unwrap().is_empty());
    }

    #[test]
    fn reads_legacy_signature_property() {
        let doc = Document::new(json!({"name": "a", "signature": proof("LinkedDataSignature2015")}));
        let proofs = doc.proofs().unwrap();
        assert_eq!(proofs[0].type_, "LinkedDataSignature2015");
        assert_eq!(doc.without_proofs().unwrap(), json!({"name": "a"}));
    }

    #[test]
    fn malformed_proof_set_is_an_error() {
        let doc = Document::new(json!({"proof": "nope"}));
        assert!(matches!(doc.proofs(), Err(Error::Json(_))));
        let doc = Document::new(json!(["not", "an", "object"]));
        assert!(doc.proofs().is_err());
    }

    #[test]
    fn malformed_proofs_are_skipped() {
        let doc = Document::new(json!({
            "proof": [1, {"created": "2021-01-01T00:00:00Z"}, proof("A"), {"type": 7}]
        }));
        let proofs = doc.proofs().unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].type_, "A");
        assert_eq!(doc.proof_values().unwrap().len(), 4);

        let kept = doc.with_proof_values(doc.proof_values().unwrap()).unwrap();
        assert_eq!(kept.as_value(), doc.as_value());
    }

    #[test]
    fn with_proofs_keeps_identity_and_original() {
        let doc = Document::new(json!({"name": "a"}));
        let proofs = Document::new(json!({"proof": proof("A")})).proofs().unwrap();
        let signed = doc.with_proofs(proofs.clone()).unwrap();
        assert_eq!(signed.id(), doc.id());
        assert!(signed.as_value()["proof"].is_object());
        assert!(doc.as_value().get("proof").is_none());

        let twice = signed
            .with_proofs([proofs.clone(), proofs].concat())
            .unwrap();
        assert_eq!(twice.as_value()["proof"].as_array().unwrap().len(), 2);
        assert_ne!(Document::new(json!({})).id(), doc.id());
    }
}
