use std::fmt;

use ring::digest;

use crate::dns::{DnsKey, Ds, Name};

/// DS digest types (RFC 4034, 4509, 6605)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestType {
    Sha1,
    Sha256,
    Sha384,
    /// Anything this crate cannot compute, including private types
    Other(u8),
}

impl DigestType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Sha1,
            2 => Self::Sha256,
            4 => Self::Sha384,
            other => Self::Other(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Sha1 => 1,
            Self::Sha256 => 2,
            Self::Sha384 => 4,
            Self::Other(value) => value,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn digest(&self, data: &[u8]) -> Option<Vec<u8>> {
        let algorithm = match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Other(_) => return None,
        };
        Some(digest::digest(algorithm, data).as_ref().to_vec())
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha384 => write!(f, "SHA384"),
            Self::Other(value) => write!(f, "DIGEST{}", value),
        }
    }
}

/// DS digest of `key` owned by `owner` (RFC 4034 §5.1.4):
/// digest(canonical owner name | DNSKEY RDATA).
pub fn ds_digest(owner: &Name, key: &DnsKey, digest_type: DigestType) -> Option<Vec<u8>> {
    let mut data = owner.to_canonical_wire();
    data.extend_from_slice(&key.to_rdata());
    digest_type.digest(&data)
}

/// Whether `ds` refers to `key`. Key tag and algorithm must agree; the digest
/// is compared only when its type is computable, otherwise it is left to the
/// external verifier.
pub fn ds_matches_key(owner: &Name, ds: &Ds, key: &DnsKey) -> bool {
    if ds.key_tag != key.key_tag() || ds.algorithm != key.algorithm {
        return false;
    }
    match ds_digest(owner, key, DigestType::from_u8(ds.digest_type)) {
        Some(computed) => computed == ds.digest,
        None => true,
    }
}
