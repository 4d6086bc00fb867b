use std::sync::Arc;

use tracing::{debug, trace};

use crate::dns::{DNSPacket, Name, enums::DNSResourceType};
use crate::error::{ProveError, Result};
use crate::transport::QueryTransport;

use super::rrset::SignedRecordSet;

/// Signed DS and DNSKEY sets offered for a candidate zone cut. Either may be
/// missing; a suffix with neither is not a zone cut.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delegation {
    pub ds: Option<SignedRecordSet>,
    pub dnskey: Option<SignedRecordSet>,
}

impl Delegation {
    pub fn is_empty(&self) -> bool {
        self.ds.is_none() && self.dnskey.is_none()
    }
}

/// Issues the individual queries the chain resolver needs. One query per
/// call; retrying is the transport's business.
#[derive(Clone)]
pub struct ZoneWalker {
    transport: Arc<dyn QueryTransport>,
}

impl ZoneWalker {
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self { transport }
    }

    /// Candidate zone cuts below the root, root-most first, ending at `zone`.
    pub fn zone_cuts(&self, zone: &Name) -> Vec<Name> {
        zone.zone_cuts().into_iter().skip(1).collect()
    }

    /// Query `(name, rtype)` with DNSSEC records requested.
    pub async fn fetch_answer(&self, name: &Name, rtype: DNSResourceType) -> Result<DNSPacket> {
        let query = DNSPacket::query(name, rtype);
        let wire = query.serialize()?;

        debug!(%name, %rtype, transport = self.transport.name(), "Querying");
        let response_bytes = self.transport.send(&wire).await?;
        let response = DNSPacket::parse(&response_bytes)?;

        if !response.header.qr {
            return Err(ProveError::MalformedResponse(format!(
                "reply to {} {} is not a response",
                name, rtype
            )));
        }
        let rcode = response.response_code();
        if !rcode.is_authoritative_answer() {
            return Err(ProveError::Transport(format!(
                "resolver answered {} {} with {:?}",
                name, rtype, rcode
            )));
        }

        trace!(
            %name,
            %rtype,
            answers = response.answers.len(),
            authorities = response.authorities.len(),
            "Response received"
        );
        Ok(response)
    }

    /// The signed `(name, rtype)` set from the answer section, or `None` when
    /// the response carries no such records or no covering signature.
    pub async fn fetch_signed(&self, name: &Name, rtype: DNSResourceType) -> Result<Option<SignedRecordSet>> {
        let response = self.fetch_answer(name, rtype).await?;
        let signed = SignedRecordSet::from_section(&response.answers, name, rtype)
            .filter(SignedRecordSet::is_signed);
        if signed.is_none() {
            debug!(%name, %rtype, "No signed records in answer");
        }
        Ok(signed)
    }

    /// The DNSKEY set of `zone` with its signatures.
    pub async fn fetch_keys(&self, zone: &Name) -> Result<Option<SignedRecordSet>> {
        self.fetch_signed(zone, DNSResourceType::DNSKEY).await
    }

    /// DS and DNSKEY sets for `zone`, queried concurrently. A transport
    /// failure on either query fails the whole call.
    pub async fn fetch_delegation(&self, zone: &Name) -> Result<Delegation> {
        let (ds, dnskey) = tokio::try_join!(
            self.fetch_signed(zone, DNSResourceType::DS),
            self.fetch_keys(zone),
        )?;
        Ok(Delegation { ds, dnskey })
    }
}
