use serde::Serialize;

use crate::dns::enums::DNSResourceType;

use super::proof::Proof;
use super::rrset::RecordSet;

/// Outcome of one lookup.
///
/// `found` means the record set exists and the last entry of `results` is
/// the answer. `nsec` means the name or type provably does not exist and the
/// last entry is the denying NSEC set. Both false means the response carried
/// neither, and both lists are empty. `results[i]` is the record set behind
/// `proofs[i]`, ordered root to leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub found: bool,
    pub nsec: bool,
    pub results: Vec<RecordSet>,
    pub proofs: Vec<Proof>,
}

impl LookupResult {
    pub fn inconclusive() -> Self {
        Self::default()
    }

    pub fn is_inconclusive(&self) -> bool {
        !self.found && !self.nsec
    }

    pub fn answer(&self) -> Option<&RecordSet> {
        if self.found { self.results.last() } else { None }
    }

    pub fn denial(&self) -> Option<&RecordSet> {
        if self.nsec {
            self.results
                .last()
                .filter(|rrset| rrset.rtype == DNSResourceType::NSEC)
        } else {
            None
        }
    }

    /// TXT strings of the answer, lossily decoded as UTF-8.
    pub fn txt_strings(&self) -> Vec<String> {
        self.answer()
            .filter(|rrset| rrset.rtype == DNSResourceType::TXT)
            .map(RecordSet::txt_strings)
            .unwrap_or_default()
    }
}
