//! Oracle-ready proofs
//!
//! Each chain link becomes one self-contained proof. The encoding is
//! versioned; version 1 is:
//!
//! ```text
//! u8      version
//! name    owner name, uncompressed, lowercase
//! u16     type
//! u16     class
//! u32     TTL (the RRSIG original TTL)
//! u16     RRSIG RDATA length
//! bytes   RRSIG RDATA, signer name lowercase, signature included
//! u16     record count
//! repeat  u16 rdlength, canonical rdata (sorted, no duplicates)
//! ```

use std::fmt;

use bitstream_io::{BigEndian, BitRead, BitReader};
use ring::digest;
use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::dns::{
    Name, ParseError, RecordData, Rrsig,
    enums::{DNSResourceClass, DNSResourceType},
};
use crate::error::{ProveError, Result};

use super::chain::ChainLink;

pub const PROOF_FORMAT_VERSION: u8 = 1;

/// Length of a proof content hash in bytes
pub const PROOF_HASH_LEN: usize = 20;

/// Content hash identifying a proof instance: the first 20 bytes of the
/// SHA-256 of its canonical RRset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProofHash(pub [u8; PROOF_HASH_LEN]);

impl fmt::Display for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for ProofHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Back-reference to the proof whose key set authenticates this one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofRef {
    pub index: usize,
    pub hash: ProofHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub name: Name,
    pub rtype: DNSResourceType,
    pub class: DNSResourceClass,
    pub ttl: u32,
    pub rrsig: Rrsig,
    /// Canonical RDATA, sorted, no duplicates
    pub rdata: Vec<Vec<u8>>,
    pub previous: Option<ProofRef>,
}

impl Proof {
    pub fn from_link(link: &ChainLink) -> Self {
        Self {
            name: link.rrset.name.clone(),
            rtype: link.rrset.rtype,
            class: link.rrset.class,
            ttl: link.rrsig.original_ttl,
            rrsig: link.rrsig.clone(),
            rdata: link.rrset.canonical_rdata(),
            previous: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let rrsig = self.rrsig.to_canonical_rdata();
        let mut buf = Vec::with_capacity(
            16 + self.name.wire_len() + rrsig.len() + self.rdata.iter().map(|r| r.len() + 2).sum::<usize>(),
        );
        buf.push(PROOF_FORMAT_VERSION);
        self.name.write_canonical(&mut buf);
        buf.extend_from_slice(&u16::from(self.rtype).to_be_bytes());
        buf.extend_from_slice(&u16::from(self.class).to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&(rrsig.len() as u16).to_be_bytes());
        buf.extend_from_slice(&rrsig);
        buf.extend_from_slice(&(self.rdata.len() as u16).to_be_bytes());
        for rdata in &self.rdata {
            buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            buf.extend_from_slice(rdata);
        }
        buf
    }

    /// Inverse of [`Proof::encode`]. The back-reference is not part of the
    /// encoding, so `previous` is always `None`.
    pub fn decode(bytes: &[u8]) -> Result<Proof> {
        Self::decode_inner(bytes).map_err(|e| ProveError::MalformedResponse(format!("invalid proof: {}", e)))
    }

    fn decode_inner(bytes: &[u8]) -> std::result::Result<Proof, ParseError> {
        let version = *bytes.first().ok_or(ParseError::InvalidHeader)?;
        if version != PROOF_FORMAT_VERSION {
            return Err(ParseError::InvalidBitStream(format!(
                "unsupported proof version {}",
                version
            )));
        }
        let (name, offset) = Name::decode(bytes, 1, bytes)?;

        let mut reader = BitReader::<_, BigEndian>::new(&bytes[offset..]);
        let rtype = DNSResourceType::from(reader.read_var::<u16>(16)?);
        let class = DNSResourceClass::from(reader.read_var::<u16>(16)?);
        let ttl = reader.read_var::<u32>(32)?;

        let rrsig_len = reader.read_var::<u16>(16)?;
        let mut rrsig_bytes = vec![0u8; rrsig_len as usize];
        reader.read_bytes(&mut rrsig_bytes)?;
        let rrsig = match RecordData::decode(DNSResourceType::RRSIG, &rrsig_bytes, &rrsig_bytes)? {
            RecordData::Rrsig(rrsig) => rrsig,
            _ => return Err(ParseError::UnknownType("RRSIG".to_string())),
        };

        let count = reader.read_var::<u16>(16)?;
        let mut rdata = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = reader.read_var::<u16>(16)?;
            let mut record = vec![0u8; len as usize];
            reader.read_bytes(&mut record)?;
            rdata.push(record);
        }

        Ok(Proof {
            name,
            rtype,
            class,
            ttl,
            rrsig,
            rdata,
            previous: None,
        })
    }

    /// Owner name as signed. A wildcard expansion is signed under the
    /// wildcard owner (RFC 4035 §5.3.2).
    fn signed_owner(&self) -> Name {
        let labels = self.rrsig.labels as usize;
        if labels >= self.name.label_count() {
            return self.name.clone();
        }
        let suffix = &self.name.labels()[self.name.label_count() - labels..];
        Name::from_labels(std::iter::once("*".to_string()).chain(suffix.iter().cloned()))
            .unwrap_or_else(|_| self.name.clone())
    }

    /// The RRset in canonical wire form (RFC 4034 §3.1.8.1): every record as
    /// owner, type, class, original TTL, RDATA length and RDATA.
    pub fn rrset_wire(&self) -> Vec<u8> {
        let owner = self.signed_owner().to_canonical_wire();
        let mut buf = Vec::new();
        for rdata in &self.rdata {
            buf.extend_from_slice(&owner);
            buf.extend_from_slice(&u16::from(self.rtype).to_be_bytes());
            buf.extend_from_slice(&u16::from(self.class).to_be_bytes());
            buf.extend_from_slice(&self.rrsig.original_ttl.to_be_bytes());
            buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            buf.extend_from_slice(rdata);
        }
        buf
    }

    /// The exact bytes the signature covers: RRSIG RDATA without the
    /// signature, then the canonical RRset.
    pub fn signed_data(&self) -> Vec<u8> {
        let mut buf = self.rrsig.rdata_without_signature();
        buf.extend_from_slice(&self.rrset_wire());
        buf
    }

    pub fn signature(&self) -> &[u8] {
        &self.rrsig.signature
    }

    pub fn hash(&self) -> ProofHash {
        let full = digest::digest(&digest::SHA256, &self.rrset_wire());
        let mut hash = [0u8; PROOF_HASH_LEN];
        hash.copy_from_slice(&full.as_ref()[..PROOF_HASH_LEN]);
        ProofHash(hash)
    }
}

impl Serialize for Proof {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Proof", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", &self.rtype)?;
        state.serialize_field("hash", &self.hash())?;
        state.serialize_field("previous", &self.previous)?;
        state.serialize_field("signer", &self.rrsig.signer_name)?;
        state.serialize_field("data", &hex::encode(self.encode()))?;
        state.end()
    }
}

/// Turns an ordered chain into ordered proofs.
pub struct ProofAssembler;

impl ProofAssembler {
    /// One proof per link, each referring back to its predecessor.
    pub fn to_proofs(links: &[ChainLink]) -> Vec<Proof> {
        let mut proofs: Vec<Proof> = Vec::with_capacity(links.len());
        for link in links {
            let mut proof = Proof::from_link(link);
            proof.previous = proofs.last().map(|prev| ProofRef {
                index: proofs.len() - 1,
                hash: prev.hash(),
            });
            proofs.push(proof);
        }
        proofs
    }
}
