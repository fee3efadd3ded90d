use async_trait::async_trait;

use crate::error::Error;
use crate::verification_method::VerificationMethod;

/// Signing capability bound to one verification method.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Id of the verification method to reference from created proofs.
    fn id(&self) -> &str;

    /// JWS `alg` of the produced signatures, if known.
    fn algorithm(&self) -> Option<&str> {
        None
    }

    async fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error>;
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// Returns `Ok(false)` for a well-formed but invalid signature.
    async fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Builds a [`Verifier`] from the key material of a resolved verification
/// method.
pub trait VerifierFactory: Send + Sync {
    fn verifier(&self, method: &VerificationMethod) -> Result<Box<dyn Verifier>, Error>;
}
