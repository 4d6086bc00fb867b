pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod oracle;
pub mod transport;

pub use dns::DNSPacket;
pub use dnssec::{ChainResolver, LookupResult, Proof, ResolveOptions};
pub use error::ProveError;
