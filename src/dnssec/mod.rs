//! DNSSEC chain of trust
//!
//! [`ChainResolver`] walks from the root trust anchors down to a signed
//! answer or NSEC denial, [`ProofAssembler`] turns the resulting
//! [`ChainLink`]s into proofs an external verifier can check one at a time.

pub mod chain;
pub mod denial;
pub mod digest;
pub mod key_tag;
pub mod lookup;
pub mod proof;
pub mod rrset;
pub mod trust_anchor;
pub mod zone_walker;

pub use chain::{ChainLink, ChainResolver, ResolveOptions, SignerRef};
pub use digest::DigestType;
pub use key_tag::calculate_key_tag;
pub use lookup::LookupResult;
pub use proof::{PROOF_FORMAT_VERSION, Proof, ProofAssembler, ProofHash, ProofRef};
pub use rrset::{RecordSet, SignedRecordSet};
pub use trust_anchor::{TrustAnchor, TrustAnchorSet};
pub use zone_walker::{Delegation, ZoneWalker};
