//! The proof set engine: adding, deriving and verifying the proofs of a
//! document.
//!
//! Verification matches every proof against the required purposes and the
//! acceptable suites, verifies each matched proof once, then validates it
//! for every purpose it matched.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::document::Document;
use crate::environment::Environment;
use crate::error::{Error, VerificationError};
use crate::proof::{Proof, ProofResult, SignatureCheck, VerificationResult};
use crate::purpose::ProofPurpose;
use crate::suite::ProofSuite;

/// Options of [`ProofSet::add`] and [`ProofSet::derive`].
#[derive(Clone, Default)]
pub struct ProofSetOptions {
    pub suite: Option<Arc<dyn ProofSuite>>,
    pub purpose: Option<Arc<dyn ProofPurpose>>,
}

impl ProofSetOptions {
    pub fn new(suite: Arc<dyn ProofSuite>, purpose: Arc<dyn ProofPurpose>) -> Self {
        Self {
            suite: Some(suite),
            purpose: Some(purpose),
        }
    }

    fn require(self) -> Result<(Arc<dyn ProofSuite>, Arc<dyn ProofPurpose>), Error> {
        let suite = self
            .suite
            .ok_or_else(|| Error::Argument("\"options.suite\" is required.".to_string()))?;
        let purpose = self
            .purpose
            .ok_or_else(|| Error::Argument("\"options.purpose\" is required.".to_string()))?;
        Ok((suite, purpose))
    }
}

/// Options of [`ProofSet::verify`].
#[derive(Clone)]
pub struct VerifyOptions {
    /// Acceptable suites, by order of preference.
    pub suites: Vec<Arc<dyn ProofSuite>>,
    /// Purposes that must all be satisfied by some proof.
    pub purposes: Vec<Arc<dyn ProofPurpose>>,
}

impl VerifyOptions {
    pub fn new(suites: Vec<Arc<dyn ProofSuite>>, purposes: Vec<Arc<dyn ProofPurpose>>) -> Self {
        Self { suites, purposes }
    }

    pub fn with_suite(mut self, suite: Arc<dyn ProofSuite>) -> Self {
        self.suites.push(suite);
        self
    }

    pub fn with_purpose(mut self, purpose: Arc<dyn ProofPurpose>) -> Self {
        self.purposes.push(purpose);
        self
    }
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SuiteId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ProofId(usize);

type MatchFuture<'a> = Shared<BoxFuture<'a, bool>>;

/// Matches proofs to suites, asking each suite about each proof at most once
/// however many purposes need the answer.
struct SuiteMatcher<'a> {
    suites: &'a [Arc<dyn ProofSuite>],
    proofs: &'a [Proof],
    memo: Mutex<HashMap<(SuiteId, ProofId), MatchFuture<'a>>>,
}

impl<'a> SuiteMatcher<'a> {
    fn new(suites: &'a [Arc<dyn ProofSuite>], proofs: &'a [Proof]) -> Self {
        Self {
            suites,
            proofs,
            memo: Mutex::new(HashMap::new()),
        }
    }

    fn matches(&self, suite: SuiteId, proof: ProofId) -> MatchFuture<'a> {
        let suites = self.suites;
        let proofs = self.proofs;
        let mut memo = self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        memo.entry((suite, proof))
            .or_insert_with(|| suites[suite.0].match_proof(&proofs[proof.0]).shared())
            .clone()
    }

    /// The first acceptable suite matching the proof.
    async fn find_suite(&self, proof: ProofId) -> Option<SuiteId> {
        for suite in (0..self.suites.len()).map(SuiteId) {
            if self.matches(suite, proof).await {
                return Some(suite);
            }
        }
        None
    }
}

/// A proof selected for verification.
#[derive(Clone, Copy)]
struct Match {
    proof: ProofId,
    suite: SuiteId,
}

pub struct ProofSet {
    env: Environment,
}

impl ProofSet {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Adds a proof to `document`, returning the document with its extended
    /// proof set. The input document is left untouched.
    ///
    /// Fails right away, before returning a future, when the suite or the
    /// purpose is missing. Existing entries of the proof set are kept as is,
    /// even those that are not well-formed proofs.
    pub fn add<'a>(
        &self,
        document: &'a Document,
        options: ProofSetOptions,
    ) -> Result<BoxFuture<'a, Result<Document, Error>>, Error> {
        let (suite, purpose) = options.require()?;
        let env = self.env.clone();
        Ok(async move {
            let mut proof_values = document.proof_values()?;
            let proof_set = document.proofs()?;
            let unsecured = document.with_proofs(Vec::new())?;
            let proof = suite
                .create_proof(&unsecured, purpose.as_ref(), &proof_set, &env)
                .await?;
            proof_values.push(proof.to_value()?);
            document.with_proof_values(proof_values)
        }
        .boxed())
    }

    /// Like [`Self::add`], but the suite produces a new document with a
    /// derived proof.
    pub fn derive<'a>(
        &self,
        document: &'a Document,
        options: ProofSetOptions,
    ) -> Result<BoxFuture<'a, Result<Document, Error>>, Error> {
        let (suite, purpose) = options.require()?;
        let env = self.env.clone();
        Ok(async move {
            let proof_set = document.proofs()?;
            let unsecured = document.with_proofs(Vec::new())?;
            suite
                .derive(&unsecured, purpose.as_ref(), &proof_set, &env)
                .await
        }
        .boxed())
    }

    /// Verifies the proof set of `document`.
    ///
    /// Succeeds when every purpose is matched by some proof and at least one
    /// proof is both cryptographically valid and valid for all of its
    /// purposes. Errors never escape: they are reported in the result.
    pub async fn verify(&self, document: &Document, options: &VerifyOptions) -> VerificationResult {
        match self.try_verify(document, options).await {
            Ok(result) => result,
            Err(error) => {
                log::debug!("Verification failed: {}", error);
                VerificationResult::error(error)
            }
        }
    }

    async fn try_verify(
        &self,
        document: &Document,
        options: &VerifyOptions,
    ) -> Result<VerificationResult, Error> {
        if options.suites.is_empty() {
            return Err(Error::Argument("\"options.suite\" is required.".to_string()));
        }
        if options.purposes.is_empty() {
            return Err(Error::Argument("\"options.purpose\" is required.".to_string()));
        }

        let proofs = document.proofs()?;
        if proofs.is_empty() {
            return Err(Error::NotFound(
                "No matching proofs found in the given document.".to_string(),
            ));
        }
        let unsecured = document.with_proofs(Vec::new())?;
        let env = &self.env;

        let matcher = SuiteMatcher::new(&options.suites, &proofs);
        let purpose_matches: Vec<Vec<Match>> = join_all(options.purposes.iter().map(|purpose| {
            let matcher = &matcher;
            let proofs = &proofs;
            let unsecured = &unsecured;
            async move {
                let mut matches = Vec::new();
                for (index, proof) in proofs.iter().enumerate() {
                    if !purpose.match_proof(proof, unsecured, env).await {
                        continue;
                    }
                    if let Some(suite) = matcher.find_suite(ProofId(index)).await {
                        matches.push(Match {
                            proof: ProofId(index),
                            suite,
                        });
                    }
                }
                matches
            }
        }))
        .await;

        if purpose_matches.iter().any(Vec::is_empty) {
            return Err(Error::NotFound(
                "Did not verify any proofs; insufficient proofs matched the acceptable suite(s) and required purpose(s).".to_string(),
            ));
        }

        // Each proof is verified once, along with the first purpose it matched.
        let mut distinct: BTreeMap<ProofId, (SuiteId, usize)> = BTreeMap::new();
        for (purpose_index, matches) in purpose_matches.iter().enumerate() {
            for m in matches {
                distinct.entry(m.proof).or_insert((m.suite, purpose_index));
            }
        }
        let context = document.context();
        let checked: BTreeMap<ProofId, Proof> = distinct
            .iter()
            .map(|(&proof, &(suite, _))| {
                let suite = &options.suites[suite.0];
                (proof, merge_context(&proofs[proof.0], suite.as_ref(), context))
            })
            .collect();
        let checks: Vec<(ProofId, SignatureCheck)> =
            join_all(distinct.iter().map(|(&proof, &(suite, purpose_index))| {
                let checked = &checked;
                let unsecured = &unsecured;
                async move {
                    let check = options.suites[suite.0]
                        .verify_proof(
                            &checked[&proof],
                            unsecured,
                            options.purposes[purpose_index].as_ref(),
                            env,
                        )
                        .await;
                    (proof, check)
                }
            }))
            .await;

        let validations = join_all(purpose_matches.iter().enumerate().flat_map(
            |(purpose_index, matches)| {
                let checks = &checks;
                let checked = &checked;
                let unsecured = &unsecured;
                matches.iter().filter_map(move |m| {
                    let method = checks
                        .iter()
                        .find(|(proof, check)| *proof == m.proof && check.verified)
                        .and_then(|(_, check)| check.verification_method.as_ref())?;
                    let purpose = &options.purposes[purpose_index];
                    Some(async move {
                        let result = purpose
                            .validate(&checked[&m.proof], method, unsecured, env)
                            .await;
                        (m.proof, result)
                    })
                })
            },
        ))
        .await;

        let mut results: BTreeMap<ProofId, ProofResult> = checks
            .into_iter()
            .map(|(proof, check)| (proof, ProofResult::new(checked[&proof].clone(), check)))
            .collect();
        for (proof, purpose_result) in validations {
            if let Some(result) = results.get_mut(&proof) {
                result.push_purpose_result(purpose_result);
            }
        }

        let results: Vec<ProofResult> = results.into_values().collect();
        for result in &results {
            log::debug!(
                "{} proof by {} verified: {}",
                result.proof.type_,
                result.proof.verification_method_id().unwrap_or("unknown key"),
                result.verified
            );
        }
        let verified = results.iter().any(|result| result.verified);
        let error = if verified {
            None
        } else {
            let errors = results
                .iter()
                .filter_map(|result| result.error.clone())
                .collect();
            Some(Error::Verification(VerificationError::new(errors)))
        };
        Ok(VerificationResult {
            verified,
            results,
            error,
        })
    }
}

/// The proof as handed to its suite: with the document's `@context` when it
/// has none of its own, unless the suite needs the proof untouched.
fn merge_context(proof: &Proof, suite: &dyn ProofSuite, context: Option<&Value>) -> Proof {
    let mut proof = proof.clone();
    if proof.context.is_null() && !suite.requires_untouched_proof() {
        if let Some(context) = context {
            proof.context = context.clone();
        }
    }
    proof
}
