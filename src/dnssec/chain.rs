use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dns::{DNSPacket, DnsKey, Name, Rrsig, enums::DNSResourceType};
use crate::error::{ProveError, Result};
use crate::transport::QueryTransport;

use super::denial::find_denial;
use super::digest::ds_matches_key;
use super::lookup::LookupResult;
use super::proof::ProofAssembler;
use super::rrset::{RecordSet, SignedRecordSet};
use super::trust_anchor::TrustAnchorSet;
use super::zone_walker::ZoneWalker;

/// Cooperative cancellation for a lookup. Checked between steps; a query
/// already in flight runs to completion.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl ResolveOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::default()
        }
    }

    fn checkpoint(&self, step: &str) -> Result<()> {
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if self.cancel.is_cancelled() || expired {
            debug!(step, expired, "Lookup cancelled");
            return Err(ProveError::Cancelled);
        }
        Ok(())
    }
}

/// The key that produced a link's signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerRef {
    pub zone: Name,
    pub key_tag: u16,
    pub algorithm: u8,
}

impl SignerRef {
    fn new(zone: &Name, key: &DnsKey) -> Self {
        Self {
            zone: zone.clone(),
            key_tag: key.key_tag(),
            algorithm: key.algorithm,
        }
    }
}

/// One verified step of the chain: a record set, the signature selected to
/// prove it, and the key that signature refers to. The signer of link `i`
/// belongs to the key set established by link `i - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLink {
    pub rrset: RecordSet,
    pub rrsig: Rrsig,
    pub signer: SignerRef,
}

impl ChainLink {
    fn new(rrset: &RecordSet, rrsig: &Rrsig, zone: &Name, key: &DnsKey) -> Self {
        Self {
            rrset: rrset.clone(),
            rrsig: rrsig.clone(),
            signer: SignerRef::new(zone, key),
        }
    }
}

/// What the leaf response established.
enum LeafEvidence {
    Answer(SignedRecordSet),
    Denial(SignedRecordSet),
}

impl LeafEvidence {
    fn records(&self) -> &SignedRecordSet {
        match self {
            LeafEvidence::Answer(set) | LeafEvidence::Denial(set) => set,
        }
    }
}

/// Builds the chain of trust from the root trust anchors down to an answer
/// or an NSEC denial.
#[derive(Clone)]
pub struct ChainResolver {
    walker: ZoneWalker,
    anchors: TrustAnchorSet,
}

impl ChainResolver {
    pub fn new(transport: Arc<dyn QueryTransport>, anchors: TrustAnchorSet) -> Self {
        Self {
            walker: ZoneWalker::new(transport),
            anchors,
        }
    }

    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    pub async fn resolve(&self, rtype: DNSResourceType, name: &Name) -> Result<LookupResult> {
        self.resolve_with(rtype, name, &ResolveOptions::default()).await
    }

    pub async fn resolve_with(
        &self,
        rtype: DNSResourceType,
        name: &Name,
        options: &ResolveOptions,
    ) -> Result<LookupResult> {
        debug!(%name, %rtype, "Starting chain resolution");

        options.checkpoint("leaf query")?;
        let response = self.walker.fetch_answer(name, rtype).await?;
        let Some(leaf) = classify(&response, name, rtype)? else {
            debug!(%name, %rtype, "Neither answer nor NSEC in response");
            return Ok(LookupResult::inconclusive());
        };

        let leaf_zone = leaf
            .records()
            .signer()
            .cloned()
            .ok_or_else(|| malformed(format!("no RRSIG for {} {}", name, rtype)))?;
        if !name.is_subdomain_of(&leaf_zone) {
            return Err(malformed(format!(
                "{} {} signed by {}, which is not an enclosing zone",
                name, rtype, leaf_zone
            )));
        }
        debug!(%name, zone = %leaf_zone, "Leaf zone identified");

        options.checkpoint("root keys")?;
        let root = Name::root();
        let mut links = Vec::new();
        let mut keys = self.root_link(&root, &mut links).await?;
        let mut zone = root;

        for cut in self.walker.zone_cuts(&leaf_zone) {
            options.checkpoint("zone cut")?;
            let delegation = self.walker.fetch_delegation(&cut).await?;
            if delegation.is_empty() && cut != leaf_zone {
                debug!(zone = %cut, "Not a zone cut, skipping");
                continue;
            }

            let (ds, dnskey) = match (delegation.ds, delegation.dnskey) {
                (None, _) => return Err(no_matching_key(&cut, "no signed DS set")),
                (Some(_), None) => {
                    return Err(malformed(format!("no signed DNSKEY set for {}", cut)));
                }
                (Some(ds), Some(dnskey)) => (ds, dnskey),
            };

            let parent_keys: Vec<&DnsKey> = keys.rrset.dnskeys().collect();
            let (ds_sig, parent_key) = ds.signature_by_any(&parent_keys).ok_or_else(|| {
                no_matching_key(&cut, &format!("DS set not signed by a key of {}", zone))
            })?;
            debug!(zone = %cut, key_tag = parent_key.key_tag(), "DS set linked to parent key");
            links.push(ChainLink::new(&ds.rrset, ds_sig, &zone, parent_key));

            let child_keys: Vec<&DnsKey> = dnskey.rrset.dnskeys().collect();
            let matched = match_delegated_keys(&cut, &ds.rrset, &child_keys);
            if matched.is_empty() {
                return Err(no_matching_key(&cut, "no DNSKEY matches a DS record"));
            }
            let (key_sig, key) = matched
                .iter()
                .find_map(|key| dnskey.signature_by(key).map(|sig| (sig, *key)))
                .ok_or_else(|| no_matching_key(&cut, "DNSKEY set not signed by a delegated key"))?;
            debug!(zone = %cut, key_tag = key.key_tag(), "DNSKEY set linked to DS");
            links.push(ChainLink::new(&dnskey.rrset, key_sig, &cut, key));

            keys = dnskey;
            zone = cut;
        }

        let leaf_keys: Vec<&DnsKey> = keys.rrset.dnskeys().collect();
        let records = leaf.records();
        let (leaf_sig, leaf_key) = records.signature_by_any(&leaf_keys).ok_or_else(|| {
            no_matching_key(&zone, &format!("{} not signed by a key of the zone", records.rrset.name))
        })?;
        links.push(ChainLink::new(&records.rrset, leaf_sig, &zone, leaf_key));

        options.checkpoint("assembly")?;
        let found = matches!(leaf, LeafEvidence::Answer(_));
        let result = LookupResult {
            found,
            nsec: !found,
            results: links.iter().map(|link| link.rrset.clone()).collect(),
            proofs: ProofAssembler::to_proofs(&links),
        };
        debug!(%name, %rtype, found, proofs = result.proofs.len(), "Chain resolved");
        Ok(result)
    }

    /// Fetch the root key set, tie it to a trust anchor and emit the first
    /// link. Returns the root key set.
    async fn root_link(&self, root: &Name, links: &mut Vec<ChainLink>) -> Result<SignedRecordSet> {
        let root_keys = self
            .walker
            .fetch_keys(root)
            .await?
            .ok_or_else(|| malformed("no signed root DNSKEY set".to_string()))?;

        let candidates: Vec<&DnsKey> = root_keys.rrset.dnskeys().collect();
        let anchored = self.anchors.matching_keys(root, &candidates);
        if anchored.is_empty() {
            warn!(anchors = self.anchors.len(), "No root key matches a trust anchor");
            return Err(ProveError::TrustAnchorMismatch { zone: root.clone() });
        }

        let (sig, key) = root_keys
            .signature_by_any(&anchored)
            .ok_or_else(|| no_matching_key(root, "root DNSKEY set not signed by an anchored key"))?;
        debug!(key_tag = key.key_tag(), "Root keys anchored");
        links.push(ChainLink::new(&root_keys.rrset, sig, root, key));

        Ok(root_keys)
    }
}

/// Sort the leaf response into an answer, a denial or nothing at all.
fn classify(response: &DNSPacket, name: &Name, rtype: DNSResourceType) -> Result<Option<LeafEvidence>> {
    if let Some(answer) = SignedRecordSet::from_section(&response.answers, name, rtype) {
        if !answer.is_signed() {
            return Err(malformed(format!("answer for {} {} carries no RRSIG", name, rtype)));
        }
        return Ok(Some(LeafEvidence::Answer(answer)));
    }
    Ok(find_denial(response, name, rtype)?.map(LeafEvidence::Denial))
}

/// DNSKEYs of `zone` referenced by its DS set: DS entries in order, then keys
/// in order, without duplicates.
fn match_delegated_keys<'a>(zone: &Name, ds_set: &RecordSet, keys: &[&'a DnsKey]) -> Vec<&'a DnsKey> {
    let mut matched: Vec<&'a DnsKey> = Vec::new();
    for ds in ds_set.ds_records() {
        for key in keys {
            if ds_matches_key(zone, ds, key) && !matched.contains(key) {
                matched.push(*key);
            }
        }
    }
    matched
}

fn malformed(reason: String) -> ProveError {
    warn!(%reason, "Malformed response");
    ProveError::MalformedResponse(reason)
}

fn no_matching_key(zone: &Name, detail: &str) -> ProveError {
    warn!(%zone, detail, "Chain broken");
    ProveError::NoMatchingKey {
        zone: zone.clone(),
        detail: detail.to_string(),
    }
}
