//! Client side of the on-chain DNSSEC oracle
//!
//! The oracle stores one proven RRset per `(name, type)`, identified by its
//! content hash. Proofs must be submitted in chain order: each one is checked
//! against the key set established by the proof before it.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::dns::{Name, enums::DNSResourceType};
use crate::dnssec::{LookupResult, Proof, ProofHash};
use crate::error::{OracleError, SubmitError};

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Hash the oracle holds for the proof's `(name, type)`, or `None` if it
    /// holds nothing.
    async fn known_proof(&self, proof: &Proof) -> Result<Option<ProofHash>, OracleError>;

    /// Submit `proof`, authenticated by the key set in `previous`. The first
    /// proof of a chain has no predecessor and is checked against the
    /// oracle's own anchors.
    async fn submit_proof(&self, proof: &Proof, previous: Option<&Proof>) -> Result<(), OracleError>;

    /// Remove the stored `(name, rtype)` entry, given an NSEC proof of its
    /// non-existence and the proof that authenticates that NSEC.
    async fn delete_proof(
        &self,
        rtype: DNSResourceType,
        name: &Name,
        denial: &Proof,
        previous: &Proof,
    ) -> Result<(), OracleError>;
}

/// Outcome of [`submit_all`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub submitted: usize,
    pub skipped: usize,
}

/// The hash the oracle must hold for `proof` to count as proven.
pub fn to_prove(proof: &Proof) -> ProofHash {
    proof.hash()
}

async fn is_known(oracle: &dyn Oracle, proof: &Proof) -> Result<bool, OracleError> {
    Ok(oracle.known_proof(proof).await? == Some(to_prove(proof)))
}

/// Submit every proof of `result` in order, skipping the ones the oracle
/// already holds. Stops at the first failure.
pub async fn submit_all(oracle: &dyn Oracle, result: &LookupResult) -> Result<SubmitReport, SubmitError> {
    let mut report = SubmitReport::default();
    for (index, proof) in result.proofs.iter().enumerate() {
        let known = is_known(oracle, proof)
            .await
            .map_err(|source| SubmitError { index, source })?;
        if known {
            debug!(index, name = %proof.name, rtype = %proof.rtype, "Proof already known");
            report.skipped += 1;
            continue;
        }

        let previous = index.checked_sub(1).map(|i| &result.proofs[i]);
        oracle
            .submit_proof(proof, previous)
            .await
            .map_err(|source| SubmitError { index, source })?;
        debug!(index, name = %proof.name, rtype = %proof.rtype, "Proof submitted");
        report.submitted += 1;
    }

    info!(
        submitted = report.submitted,
        skipped = report.skipped,
        "Proof submission complete"
    );
    Ok(report)
}

/// Number of leading proofs of `result` the oracle already holds.
pub async fn get_proven(oracle: &dyn Oracle, result: &LookupResult) -> Result<usize, OracleError> {
    let mut proven = 0;
    for proof in &result.proofs {
        if !is_known(oracle, proof).await? {
            break;
        }
        proven += 1;
    }
    Ok(proven)
}

/// Ask the oracle to forget `(name, rtype)`, using the NSEC denial carried
/// by `result`.
pub async fn retract(
    oracle: &dyn Oracle,
    rtype: DNSResourceType,
    name: &Name,
    result: &LookupResult,
) -> Result<(), OracleError> {
    if !result.nsec {
        return Err(OracleError::NotRetractable(format!(
            "{} {} was not denied",
            name, rtype
        )));
    }
    let [.., previous, denial] = result.proofs.as_slice() else {
        return Err(OracleError::NotRetractable(
            "denial chain has fewer than two proofs".to_string(),
        ));
    };
    oracle.delete_proof(rtype, name, denial, previous).await
}
