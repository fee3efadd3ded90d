//! Ed25519 keys and the `Ed25519Signature2018` suite.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use serde_json::{json, Value};

use super::{LinkedDataSignature, SignatureCarrier, Signer, Verifier, VerifierFactory};
use crate::error::Error;
use crate::verification_method::VerificationMethod;

pub const ED25519_SIGNATURE_2018: &str = "Ed25519Signature2018";
pub const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";

/// An `Ed25519Signature2018` suite: detached `EdDSA` JWS over
/// `Ed25519VerificationKey2018` keys.
///
/// Without a key pair the suite can only verify.
pub fn ed25519_signature_2018(key_pair: Option<Arc<Ed25519KeyPair>>) -> LinkedDataSignature {
    let suite = LinkedDataSignature::new(
        ED25519_SIGNATURE_2018,
        SignatureCarrier::Jws {
            algorithm: "EdDSA".to_string(),
        },
        Arc::new(Ed25519VerifierFactory),
    )
    .with_verification_method_types(&[ED25519_VERIFICATION_KEY_2018]);
    match key_pair {
        Some(key_pair) => suite.with_signer(key_pair),
        None => suite,
    }
}

pub struct Ed25519KeyPair {
    id: String,
    controller: String,
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    pub fn generate(id: &str, controller: &str) -> Self {
        let mut csprng = rand::rngs::OsRng {};
        Self::from_signing_key(id, controller, SigningKey::generate(&mut csprng))
    }

    pub fn from_secret_key(id: &str, controller: &str, secret_key: &[u8]) -> Result<Self, Error> {
        let secret_key: [u8; 32] = secret_key
            .try_into()
            .map_err(|_| Error::Argument("Ed25519 secret key must be 32 bytes.".to_string()))?;
        Ok(Self::from_signing_key(
            id,
            controller,
            SigningKey::from_bytes(&secret_key),
        ))
    }

    fn from_signing_key(id: &str, controller: &str, signing_key: SigningKey) -> Self {
        Self {
            id: id.to_string(),
            controller: controller.to_string(),
            signing_key,
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
    }

    /// Public description of the key, as listed in its controller document.
    pub fn to_verification_method(&self) -> Value {
        json!({
            "id": self.id,
            "type": ED25519_VERIFICATION_KEY_2018,
            "controller": self.controller,
            "publicKeyBase58": self.public_key_base58()
        })
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Ed25519KeyPair")
            .field("id", &self.id)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for Ed25519KeyPair {
    fn id(&self) -> &str {
        &self.id
    }

    fn algorithm(&self) -> Option<&str> {
        Some("EdDSA")
    }

    async fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        use ed25519_dalek::Signer as _;
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }
}

pub struct Ed25519Verifier(VerifyingKey);

#[async_trait]
impl Verifier for Ed25519Verifier {
    async fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(self.0.verify_strict(data, &signature).is_ok())
    }
}

/// Reads `publicKeyBase58` Ed25519 keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519VerifierFactory;

impl VerifierFactory for Ed25519VerifierFactory {
    fn verifier(&self, method: &VerificationMethod) -> Result<Box<dyn Verifier>, Error> {
        let public_key_base58 = method.property("publicKeyBase58").ok_or_else(|| {
            Error::Signature(format!("Verification method {} has no publicKeyBase58.", method.id))
        })?;
        let bytes = bs58::decode(public_key_base58)
            .into_vec()
            .map_err(|e| Error::Signature(format!("Invalid publicKeyBase58: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Signature("Ed25519 public key must be 32 bytes.".to_string()))?;
        let public_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::Signature(format!("Invalid Ed25519 public key: {}", e)))?;
        Ok(Box::new(Ed25519Verifier(public_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn key_pair_signs_for_its_verifier() {
        let key_pair = Ed25519KeyPair::generate("did:example:alice#key-1", "did:example:alice");
        let method: VerificationMethod =
            serde_json::from_value(key_pair.to_verification_method()).unwrap();
        let verifier = Ed25519VerifierFactory.verifier(&method).unwrap();

        let signature = key_pair.sign(b"hello").await.unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verifier.verify(b"hello", &signature).await.unwrap());
        assert!(!verifier.verify(b"hellO", &signature).await.unwrap());
        assert!(!verifier.verify(b"hello", &signature[..10]).await.unwrap());
    }

    #[test]
    fn rejects_bad_key_material() {
        let mut method: VerificationMethod = serde_json::from_value(json!({
            "id": "did:example:alice#key-1",
            "type": ED25519_VERIFICATION_KEY_2018,
            "publicKeyBase58": "3yZe7d"
        }))
        .unwrap();
        assert!(Ed25519VerifierFactory.verifier(&method).is_err());
        method.property_set.remove("publicKeyBase58");
        assert!(Ed25519VerifierFactory.verifier(&method).is_err());
        assert!(Ed25519KeyPair::from_secret_key("k", "c", &[0u8; 31]).is_err());
    }
}
