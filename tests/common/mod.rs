//! Shared fixtures for dnsprove integration tests
//!
//! Zones are signed with private algorithm 253, whose keys and digests are
//! matched on key tag and algorithm only. The root KSK is the one accepted by
//! the dummy trust anchor.

#![allow(dead_code)] // Each test binary uses a different subset

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dnsprove::dns::{
    DNSPacket, DnsKey, Ds, Name, Nsec, RecordData, Rrsig,
    enums::{DNSResourceClass, DNSResourceType, ResponseCode},
    resource::DNSResource,
};
use dnsprove::dnssec::denial::nsec_covers;
use dnsprove::dnssec::{Proof, ProofHash};
use dnsprove::error::{OracleError, ProveError, Result};
use dnsprove::oracle::Oracle;
use dnsprove::transport::QueryTransport;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

pub const ALGORITHM: u8 = 253;
pub const TTL: u32 = 3600;
pub const ENS_TXT: &str = "a=0xfffffffffffffffffffffffffffffffffffffffe";

pub fn name(s: &str) -> Name {
    s.parse().unwrap()
}

/// Zone signing key, key tag 1277
pub fn zsk() -> DnsKey {
    DnsKey {
        flags: 256,
        protocol: 3,
        algorithm: ALGORITHM,
        public_key: vec![],
    }
}

/// Key signing key used below the root, key tag 1278
pub fn ksk() -> DnsKey {
    DnsKey {
        flags: 257,
        protocol: 3,
        algorithm: ALGORITHM,
        public_key: vec![],
    }
}

/// Root key signing key matched by the dummy anchor, key tag 5647
pub fn root_ksk() -> DnsKey {
    DnsKey {
        flags: 257,
        protocol: 3,
        algorithm: ALGORITHM,
        public_key: vec![0x11, 0x11],
    }
}

pub fn ds_for(key: &DnsKey) -> Ds {
    Ds {
        key_tag: key.key_tag(),
        algorithm: key.algorithm,
        digest_type: ALGORITHM,
        digest: vec![],
    }
}

pub fn rrsig(covered: DNSResourceType, owner: &Name, signer: &Name, key: &DnsKey) -> Rrsig {
    Rrsig {
        type_covered: covered,
        algorithm: key.algorithm,
        labels: owner.label_count() as u8,
        original_ttl: TTL,
        expiration: 0xFFFF_FFFF,
        inception: 0,
        key_tag: key.key_tag(),
        signer_name: signer.clone(),
        signature: vec![0xAB; 8],
    }
}

pub fn record(owner: &Name, rtype: DNSResourceType, data: RecordData) -> DNSResource {
    DNSResource {
        name: owner.clone(),
        rtype,
        rclass: DNSResourceClass::IN,
        ttl: TTL,
        data,
    }
}

/// Records of one RRset followed by an RRSIG over it from each of `signers`.
pub fn signed_rrset(
    owner: &Name,
    rtype: DNSResourceType,
    data: Vec<RecordData>,
    zone: &Name,
    signers: &[&DnsKey],
) -> Vec<DNSResource> {
    let mut records: Vec<DNSResource> = data.into_iter().map(|d| record(owner, rtype, d)).collect();
    for key in signers {
        records.push(record(
            owner,
            DNSResourceType::RRSIG,
            RecordData::Rrsig(rrsig(rtype, owner, zone, key)),
        ));
    }
    records
}

pub fn answer(records: Vec<DNSResource>) -> DNSPacket {
    DNSPacket {
        answers: records,
        ..Default::default()
    }
}

pub fn denial(records: Vec<DNSResource>) -> DNSPacket {
    DNSPacket {
        authorities: records,
        ..Default::default()
    }
}

pub fn nsec(next: &str, types: &[DNSResourceType]) -> RecordData {
    RecordData::Nsec(Nsec {
        next_domain: name(next),
        types: types.to_vec(),
    })
}

pub fn txt(text: &str) -> RecordData {
    RecordData::Txt(vec![text.as_bytes().to_vec()])
}

/// Resolver stand-in answering from a fixed table keyed by question.
/// Unknown questions get an empty NOERROR response.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<(Name, DNSResourceType), DNSPacket>>,
    queries: Mutex<Vec<(Name, DNSResourceType)>>,
    sent: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, owner: &Name, rtype: DNSResourceType, response: DNSPacket) {
        self.responses
            .lock()
            .unwrap()
            .insert((owner.clone(), rtype), response);
    }

    pub fn insert_rcode(&self, owner: &Name, rtype: DNSResourceType, rcode: ResponseCode) {
        let mut response = DNSPacket::default();
        response.header.rcode = rcode.to_u8();
        self.insert(owner, rtype, response);
    }

    /// Publish the signed key set of `zone`, signed by `signer`.
    pub fn add_keys(&self, zone: &Name, keys: &[DnsKey], signers: &[&DnsKey]) {
        let data = keys.iter().cloned().map(RecordData::DnsKey).collect();
        self.insert(
            zone,
            DNSResourceType::DNSKEY,
            answer(signed_rrset(zone, DNSResourceType::DNSKEY, data, zone, signers)),
        );
    }

    /// Publish the DS set of `child`, signed by `parent_key` of `parent`.
    pub fn add_ds(&self, child: &Name, parent: &Name, ds: Vec<Ds>, parent_key: &DnsKey) {
        let data = ds.into_iter().map(RecordData::Ds).collect();
        self.insert(
            child,
            DNSResourceType::DS,
            answer(signed_rrset(child, DNSResourceType::DS, data, parent, &[parent_key])),
        );
    }

    pub fn queries(&self) -> Vec<(Name, DNSResourceType)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryTransport for StubTransport {
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let query = DNSPacket::parse(query)?;
        let question = query
            .questions
            .first()
            .cloned()
            .ok_or_else(|| ProveError::Transport("query without question".to_string()))?;
        self.queries
            .lock()
            .unwrap()
            .push((question.name.clone(), question.qtype));

        let mut response = self
            .responses
            .lock()
            .unwrap()
            .get(&(question.name, question.qtype))
            .cloned()
            .unwrap_or_default();
        response.header.id = query.header.id;
        response.header.qr = true;
        response.header.rd = true;
        response.header.ra = true;
        response.questions = query.questions;
        response.edns = query.edns;
        Ok(response.serialize()?)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Forwards to a [`StubTransport`] and cancels `token` once `after` queries
/// have gone out. Queries already started are still answered.
pub struct CancelAfter {
    pub inner: Arc<StubTransport>,
    pub token: CancellationToken,
    pub after: usize,
}

#[async_trait]
impl QueryTransport for CancelAfter {
    async fn send(&self, query: &[u8]) -> Result<Vec<u8>> {
        let response = self.inner.send(query).await;
        if self.inner.query_count() >= self.after {
            self.token.cancel();
        }
        response
    }

    fn name(&self) -> &'static str {
        "cancel-after"
    }
}

/// Root signs `xyz`, which signs `matoken.xyz`, which holds the signed TXT
/// set at `_ens.matoken.xyz`. Every zone signs with [`zsk`]; key sets are
/// signed by the zone's KSK.
pub fn matoken_chain() -> StubTransport {
    let stub = StubTransport::new();
    let root = Name::root();
    let xyz = name("xyz");
    let matoken = name("matoken.xyz");
    let ens = name("_ens.matoken.xyz");

    stub.add_keys(&root, &[zsk(), root_ksk()], &[&root_ksk()]);
    stub.add_ds(&xyz, &root, vec![ds_for(&ksk())], &zsk());
    stub.add_keys(&xyz, &[zsk(), ksk()], &[&ksk()]);
    stub.add_ds(&matoken, &xyz, vec![ds_for(&ksk())], &zsk());
    stub.add_keys(&matoken, &[zsk(), ksk()], &[&ksk()]);
    stub.insert(
        &ens,
        DNSResourceType::TXT,
        answer(signed_rrset(&ens, DNSResourceType::TXT, vec![txt(ENS_TXT)], &matoken, &[&zsk()])),
    );
    stub
}

/// Only the root key set; leaf data is added by each test.
pub fn root_only() -> StubTransport {
    let stub = StubTransport::new();
    stub.add_keys(&Name::root(), &[zsk(), root_ksk()], &[&root_ksk()]);
    stub
}

/// Serve `stub` over UDP on a loopback port until the task is dropped.
pub async fn serve_udp(stub: Arc<StubTransport>) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            if let Ok(response) = stub.send(&buf[..len]).await {
                let _ = socket.send_to(&response, peer).await;
            }
        }
    });
    (addr, handle)
}

/// In-memory oracle. Accepts a proof only when its predecessor is already
/// proven; the first proof of a chain is accepted as anchored.
#[derive(Default)]
pub struct MemoryOracle {
    proven: Mutex<HashMap<(Name, DNSResourceType), ProofHash>>,
    submissions: AtomicUsize,
    fail_after: Option<usize>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle that goes unavailable after `n` accepted submissions.
    pub fn fail_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn holds(&self, owner: &Name, rtype: DNSResourceType) -> bool {
        self.proven
            .lock()
            .unwrap()
            .contains_key(&(owner.clone(), rtype))
    }

    fn is_proven(&self, proof: &Proof) -> bool {
        self.proven
            .lock()
            .unwrap()
            .get(&(proof.name.clone(), proof.rtype))
            == Some(&proof.hash())
    }
}

#[async_trait]
impl Oracle for MemoryOracle {
    async fn known_proof(&self, proof: &Proof) -> std::result::Result<Option<ProofHash>, OracleError> {
        Ok(self
            .proven
            .lock()
            .unwrap()
            .get(&(proof.name.clone(), proof.rtype))
            .copied())
    }

    async fn submit_proof(
        &self,
        proof: &Proof,
        previous: Option<&Proof>,
    ) -> std::result::Result<(), OracleError> {
        if self.fail_after.is_some_and(|n| self.submissions() >= n) {
            return Err(OracleError::Unavailable("submission budget exhausted".to_string()));
        }
        if let Some(previous) = previous {
            if !self.is_proven(previous) {
                return Err(OracleError::Rejected(format!(
                    "{} {} is not proven",
                    previous.name, previous.rtype
                )));
            }
        }
        self.proven
            .lock()
            .unwrap()
            .insert((proof.name.clone(), proof.rtype), proof.hash());
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_proof(
        &self,
        rtype: DNSResourceType,
        owner: &Name,
        denial: &Proof,
        previous: &Proof,
    ) -> std::result::Result<(), OracleError> {
        if !self.is_proven(previous) {
            return Err(OracleError::Rejected("denial is not anchored".to_string()));
        }
        let rdata = denial
            .rdata
            .first()
            .ok_or_else(|| OracleError::Rejected("empty denial".to_string()))?;
        let Ok(RecordData::Nsec(nsec)) = RecordData::decode(DNSResourceType::NSEC, rdata, rdata) else {
            return Err(OracleError::Rejected("denial is not an NSEC".to_string()));
        };
        if !nsec_covers(&denial.name, &nsec, &denial.rrsig.signer_name, owner, rtype) {
            return Err(OracleError::Rejected(format!("NSEC does not cover {}", owner)));
        }
        self.proven.lock().unwrap().remove(&(owner.clone(), rtype));
        Ok(())
    }
}
