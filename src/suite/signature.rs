use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::prelude::*;
use chrono::SubsecRound;

use super::{ProofSuite, Signer, VerifierFactory};
use crate::document::{Document, DocumentId};
use crate::environment::Environment;
use crate::error::Error;
use crate::jws;
use crate::proof::{format_date, Proof, SignatureCheck, VerificationMethodRef};
use crate::purpose::ProofPurpose;
use crate::verification_method::{self, VerificationMethod};

/// Where a proof carries its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCarrier {
    /// Base64 signature over the verify data, in `signatureValue`.
    SignatureValue,
    /// Detached JWS over the verify data, in `jws`.
    Jws { algorithm: String },
}

/// Suite implementing the canonicalize, hash and sign protocol for a proof
/// type.
///
/// The signed bytes ("verify data") are
/// `digest(canonicalize(proof options)) ++ digest(canonicalize(document))`,
/// where the proof options are the proof without its signature and the
/// document is stripped of its proof set.
pub struct LinkedDataSignature {
    type_: String,
    carrier: SignatureCarrier,
    signer: Option<Arc<dyn Signer>>,
    verifier_factory: Arc<dyn VerifierFactory>,
    verification_method_types: Vec<String>,
    proof: Option<Proof>,
    date: Option<DateTime<Utc>>,
    // Hash of the last document seen, so that adding several proofs to one
    // document canonicalizes it once.
    document_hash: Mutex<Option<(HashKey, Vec<u8>)>>,
}

/// A document, along with the environment collaborators its hash depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HashKey {
    document: DocumentId,
    canonicalizer: usize,
    digest: usize,
    loader: usize,
}

impl HashKey {
    fn new(document: &Document, env: &Environment) -> Self {
        Self {
            document: document.id(),
            canonicalizer: Arc::as_ptr(&env.canonicalizer) as *const () as usize,
            digest: Arc::as_ptr(&env.digest) as *const () as usize,
            loader: Arc::as_ptr(&env.loader) as *const () as usize,
        }
    }
}

impl LinkedDataSignature {
    pub fn new(
        type_: &str,
        carrier: SignatureCarrier,
        verifier_factory: Arc<dyn VerifierFactory>,
    ) -> Self {
        Self {
            type_: type_.to_string(),
            carrier,
            signer: None,
            verifier_factory,
            verification_method_types: Vec::new(),
            proof: None,
            date: None,
            document_hash: Mutex::new(None),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Restricts the verification method types accepted when verifying.
    pub fn with_verification_method_types(mut self, types: &[&str]) -> Self {
        self.verification_method_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Proof template whose properties are copied into every created proof.
    pub fn with_proof(mut self, proof: Proof) -> Self {
        self.proof = Some(proof);
        self
    }

    /// Creation date for created proofs, instead of the current time.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn carrier(&self) -> &SignatureCarrier {
        &self.carrier
    }

    async fn document_hash(&self, document: &Document, env: &Environment) -> Result<Vec<u8>, Error> {
        let key = HashKey::new(document, env);
        if let Some((cached, hash)) = self.cached_document_hash() {
            if cached == key {
                return Ok(hash);
            }
        }
        let hash = env.hash(&document.without_proofs()?).await?;
        let mut cache = self
            .document_hash
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cache = Some((key, hash.clone()));
        Ok(hash)
    }

    fn cached_document_hash(&self) -> Option<(HashKey, Vec<u8>)> {
        self.document_hash
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Computes the bytes signed for `proof` over `document`.
    pub async fn create_verify_data(
        &self,
        document: &Document,
        proof: &Proof,
        env: &Environment,
    ) -> Result<Vec<u8>, Error> {
        let mut options = proof.without_signature();
        if options.context.is_null() {
            if let Some(context) = document.context() {
                options.context = context.clone();
            }
        }
        let options = options.to_value()?;
        let (proof_hash, document_hash) =
            futures::try_join!(env.hash(&options), self.document_hash(document, env))?;
        Ok([proof_hash, document_hash].concat())
    }

    async fn sign(&self, verify_data: &[u8], mut proof: Proof, signer: &dyn Signer) -> Result<Proof, Error> {
        match &self.carrier {
            SignatureCarrier::SignatureValue => {
                let signature = signer.sign(verify_data).await?;
                proof.signature_value = Some(base64::encode(signature));
            }
            SignatureCarrier::Jws { algorithm } => {
                if let Some(signer_algorithm) = signer.algorithm() {
                    if signer_algorithm != algorithm {
                        return Err(Error::Argument(format!(
                            "Signer algorithm {} does not match suite algorithm {}.",
                            signer_algorithm, algorithm
                        )));
                    }
                }
                let (header_b64, signing_input) =
                    jws::prepare_detached_unencoded_payload(algorithm, verify_data)?;
                let signature = signer.sign(&signing_input).await?;
                proof.jws = Some(jws::complete_sign_unencoded_payload(&header_b64, &signature));
            }
        }
        Ok(proof)
    }

    async fn try_verify(
        &self,
        proof: &Proof,
        document: &Document,
        env: &Environment,
    ) -> Result<(bool, VerificationMethod), Error> {
        let id = proof
            .verification_method_id()
            .ok_or_else(|| Error::Signature("No verification method found in proof.".to_string()))?;
        let (verify_data, method) = futures::try_join!(
            self.create_verify_data(document, proof, env),
            verification_method::resolve(id, env.loader.as_ref())
        )?;
        method.ensure_not_revoked()?;
        if !self.verification_method_types.is_empty()
            && !self.verification_method_types.contains(&method.type_)
        {
            return Err(Error::Signature(format!(
                "Unsupported verification method type {} for suite {}.",
                method.type_, self.type_
            )));
        }
        let verifier = self.verifier_factory.verifier(&method)?;
        let verified = match &self.carrier {
            SignatureCarrier::SignatureValue => {
                let signature_value = proof.signature_value.as_ref().ok_or_else(|| {
                    Error::Signature("The proof has no signatureValue.".to_string())
                })?;
                let signature = base64::decode(signature_value)
                    .map_err(|e| Error::Signature(format!("Invalid signatureValue: {}", e)))?;
                verifier.verify(&verify_data, &signature).await?
            }
            SignatureCarrier::Jws { algorithm } => {
                let jws = proof
                    .jws
                    .as_ref()
                    .ok_or_else(|| Error::Signature("The proof has no jws.".to_string()))?;
                let decoded = jws::decode_detached_unencoded_payload(jws, algorithm, &verify_data)?;
                verifier.verify(&decoded.signing_input, &decoded.signature).await?
            }
        };
        Ok((verified, method))
    }
}

#[async_trait]
impl ProofSuite for LinkedDataSignature {
    fn type_(&self) -> &str {
        &self.type_
    }

    async fn create_proof(
        &self,
        document: &Document,
        purpose: &dyn ProofPurpose,
        _proof_set: &[Proof],
        env: &Environment,
    ) -> Result<Proof, Error> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::Argument("A signer is required to create a proof.".to_string()))?;
        let mut proof = self.proof.clone().unwrap_or_default().without_signature();
        proof.type_ = self.type_.clone();
        if proof.created.is_none() {
            let date = self.date.unwrap_or_else(|| env.clock.now());
            proof.created = Some(format_date(&date.trunc_subsecs(0)));
        }
        proof.verification_method = Some(VerificationMethodRef::from(signer.id()));
        let proof = purpose.update(proof);
        let verify_data = self.create_verify_data(document, &proof, env).await?;
        let proof = self.sign(&verify_data, proof, signer.as_ref()).await?;
        log::debug!(
            "Created {} proof with verification method {}",
            self.type_,
            signer.id()
        );
        Ok(proof)
    }

    async fn verify_proof(
        &self,
        proof: &Proof,
        document: &Document,
        _purpose: &dyn ProofPurpose,
        env: &Environment,
    ) -> SignatureCheck {
        match self.try_verify(proof, document, env).await {
            Ok((true, method)) => SignatureCheck {
                verified: true,
                verification_method: Some(method),
                error: None,
            },
            Ok((false, method)) => SignatureCheck {
                verified: false,
                verification_method: Some(method),
                error: Some(Error::Signature("Invalid signature.".to_string())),
            },
            Err(error) => SignatureCheck {
                verified: false,
                verification_method: None,
                error: Some(error),
            },
        }
    }
}
