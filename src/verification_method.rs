use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::loader::DocumentLoader;

/// Properties of a controller document that may hold verification methods.
const METHOD_PROPERTIES: [&str; 7] = [
    "verificationMethod",
    "publicKey",
    "assertionMethod",
    "authentication",
    "capabilityInvocation",
    "capabilityDelegation",
    "keyAgreement",
];

/// A key descriptor, as resolved for verifying a proof.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Revocation timestamp. A revoked method verifies nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<String>,
    /// Key material and any other property.
    #[serde(flatten)]
    pub property_set: Map<String, Value>,
}

impl VerificationMethod {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.property_set.get(name).and_then(Value::as_str)
    }

    pub fn ensure_not_revoked(&self) -> Result<(), Error> {
        match self.revoked {
            Some(_) => Err(Error::Signature(
                "The verification method has been revoked.".to_string(),
            )),
            None => Ok(()),
        }
    }
}

/// Loads the verification method `id` and frames it.
///
/// The node is looked up by id in the loaded document. Its `controller` (or
/// legacy `owner`) is reduced to a reference, so that a controller document
/// embedding the method is never expanded back into it.
pub async fn resolve(id: &str, loader: &dyn DocumentLoader) -> Result<VerificationMethod, Error> {
    let remote = loader.load(id).await?;
    let document = &remote.document;
    let node = find_node(document, id)
        .ok_or_else(|| Error::NotFound(format!("Verification method {} not found.", id)))?;

    let mut framed = node.clone();
    framed.insert("id".to_string(), Value::String(id.to_string()));
    let controller = framed
        .remove("controller")
        .or_else(|| framed.remove("owner"))
        .and_then(|controller| reference(&controller).map(str::to_string))
        .or_else(|| {
            // A method embedded in its controller's document.
            document
                .get("id")
                .and_then(Value::as_str)
                .filter(|document_id| *document_id != id)
                .map(str::to_string)
        });
    if let Some(controller) = controller {
        framed.insert("controller".to_string(), Value::String(controller));
    }
    framed.remove("owner");
    Ok(serde_json::from_value(Value::Object(framed))?)
}

/// The id of a node reference, given either as a string or as an object.
fn reference(value: &Value) -> Option<&str> {
    match value {
        Value::String(id) => Some(id),
        Value::Object(object) => object.get("id").and_then(Value::as_str),
        _ => None,
    }
}

/// Absolute id of a node, resolving fragment-only ids against `base`.
fn absolute_id(id: &str, base: Option<&str>) -> String {
    match base {
        Some(base) if id.starts_with('#') => format!("{}{}", base, id),
        _ => id.to_string(),
    }
}

fn find_node<'a>(document: &'a Value, id: &str) -> Option<&'a Map<String, Value>> {
    let object = document.as_object()?;
    let base = object.get("id").and_then(Value::as_str);
    if base == Some(id) {
        return Some(object);
    }
    METHOD_PROPERTIES
        .iter()
        .filter_map(|property| object.get(*property))
        .flat_map(|value| match value {
            Value::Array(values) => values.iter().collect::<Vec<_>>(),
            value => vec![value],
        })
        .filter_map(Value::as_object)
        .find(|node| {
            node.get("id")
                .and_then(Value::as_str)
                .map(|node_id| absolute_id(node_id, base) == id)
                .unwrap_or(false)
        })
}

/// A controller document: the authority stating which verification methods
/// may be used for which proof purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerDocument(pub Value);

impl ControllerDocument {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Checks that the controller lists the verification method `method_id`
    /// under the relationship `term`.
    pub fn allows_verification_method(&self, method_id: &str, term: &str) -> bool {
        let base = self.id();
        let entries = match self.0.get(term) {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(entry) => std::slice::from_ref(entry),
            None => return false,
        };
        entries
            .iter()
            .filter_map(reference)
            .any(|id| absolute_id(id, base) == method_id)
    }
}
