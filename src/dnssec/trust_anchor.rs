use std::sync::Arc;

use crate::dns::{DnsKey, Ds, Name};

use super::digest::ds_matches_key;

/// Private-use algorithm and digest type carried by the dummy anchor
pub const DUMMY_ALGORITHM: u8 = 253;

/// A DNSSEC trust anchor, expressed as a DS record for `zone`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pub zone: Name,
    pub ds: Ds,
    pub description: String,
}

impl TrustAnchor {
    pub fn new(zone: Name, ds: Ds, description: impl Into<String>) -> Self {
        Self {
            zone,
            ds,
            description: description.into(),
        }
    }

    /// IANA root KSK-2017
    pub fn root_ksk_2017() -> Self {
        Self::root_sha256(
            20326,
            [
                0xE0, 0x6D, 0x44, 0xB8, 0x0B, 0x8F, 0x1D, 0x39, 0xA9, 0x5C, 0x0B, 0x0D, 0x7C, 0x65,
                0xD0, 0x84, 0x58, 0xE8, 0x80, 0x40, 0x9B, 0xBC, 0x68, 0x34, 0x57, 0x10, 0x42, 0x37,
                0xC7, 0xF8, 0xEC, 0x8D,
            ],
            "root KSK-2017",
        )
    }

    /// IANA root KSK-2010, kept for zones still signed during rollover
    pub fn root_ksk_2010() -> Self {
        Self::root_sha256(
            19036,
            [
                0x49, 0xAA, 0xC1, 0x1D, 0x7B, 0x6F, 0x64, 0x46, 0x70, 0x2E, 0x54, 0xA1, 0x60, 0x73,
                0x71, 0x60, 0x7A, 0x1A, 0x41, 0x85, 0x52, 0x00, 0xFD, 0x2C, 0xE1, 0xCD, 0xDE, 0x32,
                0xF2, 0x4E, 0x8F, 0xB5,
            ],
            "root KSK-2010",
        )
    }

    /// Anchor accepted by test deployments of the oracle: key tag 5647,
    /// private algorithm and digest type, empty digest.
    pub fn dummy() -> Self {
        Self::new(
            Name::root(),
            Ds {
                key_tag: 5647,
                algorithm: DUMMY_ALGORITHM,
                digest_type: DUMMY_ALGORITHM,
                digest: Vec::new(),
            },
            "dummy test anchor",
        )
    }

    fn root_sha256(key_tag: u16, digest: [u8; 32], description: &str) -> Self {
        Self::new(
            Name::root(),
            Ds {
                key_tag,
                algorithm: 8,
                digest_type: 2,
                digest: digest.to_vec(),
            },
            description,
        )
    }

    pub fn matches(&self, key: &DnsKey) -> bool {
        ds_matches_key(&self.zone, &self.ds, key)
    }
}

/// Immutable set of trust anchors, cheap to clone and share between lookups.
#[derive(Debug, Clone)]
pub struct TrustAnchorSet {
    anchors: Arc<[TrustAnchor]>,
}

impl TrustAnchorSet {
    pub fn new(anchors: Vec<TrustAnchor>) -> Self {
        Self {
            anchors: anchors.into(),
        }
    }

    /// The IANA root anchors
    pub fn iana_root() -> Self {
        Self::new(vec![TrustAnchor::root_ksk_2017(), TrustAnchor::root_ksk_2010()])
    }

    /// The IANA root anchors followed by the dummy test anchor
    pub fn with_dummy() -> Self {
        Self::new(vec![
            TrustAnchor::root_ksk_2017(),
            TrustAnchor::root_ksk_2010(),
            TrustAnchor::dummy(),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustAnchor> {
        self.anchors.iter()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Keys of `zone` that match an anchor, in anchor order then key order,
    /// without duplicates.
    pub fn matching_keys<'a>(&self, zone: &Name, keys: &[&'a DnsKey]) -> Vec<&'a DnsKey> {
        let mut matched: Vec<&'a DnsKey> = Vec::new();
        for anchor in self.anchors.iter().filter(|a| &a.zone == zone) {
            for key in keys {
                if anchor.matches(key) && !matched.contains(key) {
                    matched.push(*key);
                }
            }
        }
        matched
    }
}

impl Default for TrustAnchorSet {
    fn default() -> Self {
        Self::iana_root()
    }
}
