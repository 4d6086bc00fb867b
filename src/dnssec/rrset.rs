use serde::Serialize;

use crate::dns::{
    DnsKey, Ds, Name, Nsec, RecordData, Rrsig,
    enums::{DNSResourceClass, DNSResourceType},
    resource::DNSResource,
};

/// All records sharing owner, type and class. Built once from a response
/// section and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    pub name: Name,
    #[serde(rename = "type")]
    pub rtype: DNSResourceType,
    pub class: DNSResourceClass,
    pub ttl: u32,
    pub records: Vec<RecordData>,
}

/// A record set together with the signatures that cover it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRecordSet {
    pub rrset: RecordSet,
    pub signatures: Vec<Rrsig>,
}

impl RecordSet {
    /// Collect the `(name, rtype)` records of `section`, or `None` if there
    /// are none. The set TTL is the smallest record TTL.
    pub fn from_section(section: &[DNSResource], name: &Name, rtype: DNSResourceType) -> Option<Self> {
        let matching: Vec<&DNSResource> = section
            .iter()
            .filter(|rr| rr.rtype == rtype && &rr.name == name)
            .collect();
        let first = matching.first()?;

        Some(Self {
            name: first.name.clone(),
            rtype,
            class: first.rclass,
            ttl: matching.iter().map(|rr| rr.ttl).min().unwrap_or(first.ttl),
            records: matching.iter().map(|rr| rr.data.clone()).collect(),
        })
    }

    pub fn dnskeys(&self) -> impl Iterator<Item = &DnsKey> {
        self.records.iter().filter_map(RecordData::as_dnskey)
    }

    pub fn ds_records(&self) -> impl Iterator<Item = &Ds> {
        self.records.iter().filter_map(RecordData::as_ds)
    }

    pub fn nsec(&self) -> Option<&Nsec> {
        self.records.iter().find_map(RecordData::as_nsec)
    }

    /// Canonical RDATA of every record, sorted (RFC 4034 §6.3) with
    /// duplicates removed.
    pub fn canonical_rdata(&self) -> Vec<Vec<u8>> {
        let mut rdata: Vec<Vec<u8>> = self
            .records
            .iter()
            .map(RecordData::to_canonical_wire)
            .collect();
        rdata.sort();
        rdata.dedup();
        rdata
    }

    /// TXT character-strings, one entry per string, lossily decoded.
    pub fn txt_strings(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|data| match data {
                RecordData::Txt(strings) => Some(strings),
                _ => None,
            })
            .flatten()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }
}

impl SignedRecordSet {
    /// Collect the `(name, rtype)` records of `section` and the RRSIGs at the
    /// same owner covering `rtype`.
    pub fn from_section(section: &[DNSResource], name: &Name, rtype: DNSResourceType) -> Option<Self> {
        let rrset = RecordSet::from_section(section, name, rtype)?;
        let signatures = section
            .iter()
            .filter(|rr| rr.rtype == DNSResourceType::RRSIG && &rr.name == name)
            .filter_map(|rr| rr.data.as_rrsig())
            .filter(|sig| sig.type_covered == rtype)
            .cloned()
            .collect();
        Some(Self { rrset, signatures })
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Zone that produced the signatures, taken from the first RRSIG.
    pub fn signer(&self) -> Option<&Name> {
        self.signatures.first().map(|sig| &sig.signer_name)
    }

    /// First signature made by `key`, judged by key tag and algorithm.
    pub fn signature_by(&self, key: &DnsKey) -> Option<&Rrsig> {
        let tag = key.key_tag();
        self.signatures
            .iter()
            .find(|sig| sig.key_tag == tag && sig.algorithm == key.algorithm)
    }

    /// First signature, in signature order, made by any of `keys`.
    pub fn signature_by_any<'a>(&'a self, keys: &[&'a DnsKey]) -> Option<(&'a Rrsig, &'a DnsKey)> {
        self.signatures.iter().find_map(|sig| {
            keys.iter()
                .find(|key| sig.key_tag == key.key_tag() && sig.algorithm == key.algorithm)
                .map(|key| (sig, *key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txt(name: &Name, ttl: u32, text: &str) -> DNSResource {
        DNSResource {
            name: name.clone(),
            rtype: DNSResourceType::TXT,
            rclass: DNSResourceClass::IN,
            ttl,
            data: RecordData::Txt(vec![text.as_bytes().to_vec()]),
        }
    }

    fn rrsig(name: &Name, covered: DNSResourceType, key_tag: u16) -> DNSResource {
        DNSResource {
            name: name.clone(),
            rtype: DNSResourceType::RRSIG,
            rclass: DNSResourceClass::IN,
            ttl: 300,
            data: RecordData::Rrsig(Rrsig {
                type_covered: covered,
                algorithm: 253,
                labels: name.label_count() as u8,
                original_ttl: 300,
                expiration: u32::MAX,
                inception: 0,
                key_tag,
                signer_name: "xyz".parse().unwrap(),
                signature: vec![],
            }),
        }
    }

    #[test]
    fn test_signed_set_collects_only_covering_signatures() {
        let owner: Name = "matoken.xyz".parse().unwrap();
        let other: Name = "other.xyz".parse().unwrap();
        let section = vec![
            txt(&owner, 300, "b"),
            rrsig(&owner, DNSResourceType::A, 1),
            txt(&other, 300, "x"),
            txt(&owner, 200, "a"),
            rrsig(&owner, DNSResourceType::TXT, 1277),
        ];

        let signed = SignedRecordSet::from_section(&section, &owner, DNSResourceType::TXT).unwrap();
        assert_eq!(signed.rrset.records.len(), 2);
        assert_eq!(signed.rrset.ttl, 200);
        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.signatures[0].key_tag, 1277);
        assert_eq!(signed.signer().unwrap().to_string(), "xyz");
        assert_eq!(signed.rrset.txt_strings(), vec!["b", "a"]);

        assert!(SignedRecordSet::from_section(&section, &owner, DNSResourceType::DS).is_none());
    }

    #[test]
    fn test_canonical_rdata_sorted_and_deduplicated() {
        let owner: Name = "xyz".parse().unwrap();
        let section = vec![txt(&owner, 1, "b"), txt(&owner, 1, "a"), txt(&owner, 1, "b")];
        let rrset = RecordSet::from_section(&section, &owner, DNSResourceType::TXT).unwrap();
        assert_eq!(rrset.canonical_rdata(), vec![b"\x01a".to_vec(), b"\x01b".to_vec()]);
    }

    #[test]
    fn test_signature_by_key() {
        let owner: Name = "xyz".parse().unwrap();
        let section = vec![txt(&owner, 1, "a"), rrsig(&owner, DNSResourceType::TXT, 1277)];
        let signed = SignedRecordSet::from_section(&section, &owner, DNSResourceType::TXT).unwrap();

        let zsk = DnsKey {
            flags: 256,
            protocol: 3,
            algorithm: 253,
            public_key: vec![],
        };
        let ksk = DnsKey {
            flags: 257,
            ..zsk.clone()
        };
        assert!(signed.signature_by(&zsk).is_some());
        assert!(signed.signature_by(&ksk).is_none());
        let (sig, key) = signed.signature_by_any(&[&ksk, &zsk]).unwrap();
        assert_eq!(sig.key_tag, 1277);
        assert_eq!(key, &zsk);
    }
}
