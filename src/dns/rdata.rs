use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{Name, ParseError, enums::DNSResourceType};
use crate::dnssec::key_tag::calculate_key_tag;

/// DNSKEY flag: the key is a zone key (RFC 4034 §2.1.1)
pub const DNSKEY_FLAG_ZONE: u16 = 0x0100;

/// DNSKEY flag: secure entry point
pub const DNSKEY_FLAG_SEP: u16 = 0x0001;

/// Typed record payload. Types this crate never interprets stay opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(Name),
    Cname(Name),
    Ptr(Name),
    Mx(Mx),
    Soa(Soa),
    Srv(Srv),
    Txt(Vec<Vec<u8>>),
    Ds(Ds),
    DnsKey(DnsKey),
    Rrsig(Rrsig),
    Nsec(Nsec),
    Named(NamedRdata),
    Other(Vec<u8>),
}

impl Default for RecordData {
    fn default() -> Self {
        RecordData::Other(Vec::new())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mx {
    pub preference: u16,
    pub exchange: Name,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: Name,
}

/// RDATA of a type that embeds domain names but is otherwise left
/// uninterpreted: fixed octets, the names, then more fixed octets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedRdata {
    pub prefix: Vec<u8>,
    pub names: Vec<Name>,
    pub suffix: Vec<u8>,
}

/// Octets before the names, number of names and octets after them for the
/// remaining types whose names are decompressed on receipt (RFC 3597 §4) and
/// lowercased in canonical form (RFC 4034 §6.2).
fn name_layout(rtype: u16) -> Option<(usize, usize, usize)> {
    match rtype {
        // MD, MF, MB, MG, MR, DNAME
        3 | 4 | 7 | 8 | 9 | 39 => Some((0, 1, 0)),
        // MINFO, RP
        14 | 17 => Some((0, 2, 0)),
        // AFSDB, RT, KX
        18 | 21 | 36 => Some((2, 1, 0)),
        // PX
        26 => Some((2, 2, 0)),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ds {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsKey {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
}

impl DnsKey {
    pub fn key_tag(&self) -> u16 {
        calculate_key_tag(self.flags, self.protocol, self.algorithm, &self.public_key)
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & DNSKEY_FLAG_ZONE != 0
    }

    pub fn is_secure_entry_point(&self) -> bool {
        self.flags & DNSKEY_FLAG_SEP != 0
    }

    pub fn to_rdata(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.public_key.len());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.push(self.protocol);
        buf.push(self.algorithm);
        buf.extend_from_slice(&self.public_key);
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rrsig {
    pub type_covered: DNSResourceType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer_name: Name,
    pub signature: Vec<u8>,
}

impl Rrsig {
    /// RRSIG RDATA up to and excluding the signature, with the signer name in
    /// canonical form. This is the prefix of the data a signature covers.
    pub fn rdata_without_signature(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(18 + self.signer_name.wire_len());
        buf.extend_from_slice(&u16::from(self.type_covered).to_be_bytes());
        buf.push(self.algorithm);
        buf.push(self.labels);
        buf.extend_from_slice(&self.original_ttl.to_be_bytes());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        buf.extend_from_slice(&self.inception.to_be_bytes());
        buf.extend_from_slice(&self.key_tag.to_be_bytes());
        self.signer_name.write_canonical(&mut buf);
        buf
    }

    /// Full canonical RRSIG RDATA, signature included.
    pub fn to_canonical_rdata(&self) -> Vec<u8> {
        let mut buf = self.rdata_without_signature();
        buf.extend_from_slice(&self.signature);
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec {
    pub next_domain: Name,
    pub types: Vec<DNSResourceType>,
}

impl Nsec {
    pub fn has_type(&self, rtype: DNSResourceType) -> bool {
        self.types.contains(&rtype)
    }

    /// Encode the type bitmap (RFC 4034 §4.1.2).
    pub fn encode_type_bitmap(&self) -> Vec<u8> {
        let mut values: Vec<u16> = self.types.iter().map(|t| u16::from(*t)).collect();
        values.sort_unstable();
        values.dedup();

        let mut buf = Vec::new();
        let mut index = 0;
        while index < values.len() {
            let window = (values[index] >> 8) as u8;
            let mut bitmap = [0u8; 32];
            let mut used = 0;
            while index < values.len() && (values[index] >> 8) as u8 == window {
                let low = (values[index] & 0xFF) as usize;
                bitmap[low / 8] |= 0x80 >> (low % 8);
                used = low / 8 + 1;
                index += 1;
            }
            buf.push(window);
            buf.push(used as u8);
            buf.extend_from_slice(&bitmap[..used]);
        }
        buf
    }

    pub fn decode_type_bitmap(mut data: &[u8]) -> Result<Vec<DNSResourceType>, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidRecordData {
            rtype: DNSResourceType::NSEC,
            reason: reason.to_string(),
        };

        let mut types = Vec::new();
        let mut last_window: Option<u8> = None;
        while !data.is_empty() {
            if data.len() < 2 {
                return Err(invalid("truncated bitmap window header"));
            }
            let window = data[0];
            let len = data[1] as usize;
            if len == 0 || len > 32 {
                return Err(invalid("bitmap length out of range"));
            }
            if last_window.is_some_and(|last| window <= last) {
                return Err(invalid("bitmap windows out of order"));
            }
            let bitmap = data
                .get(2..2 + len)
                .ok_or_else(|| invalid("truncated bitmap"))?;
            for (byte_index, byte) in bitmap.iter().enumerate() {
                for bit in 0..8 {
                    if byte & (0x80 >> bit) != 0 {
                        let value = ((window as u16) << 8) | (byte_index * 8 + bit) as u16;
                        types.push(DNSResourceType::from(value));
                    }
                }
            }
            last_window = Some(window);
            data = &data[2 + len..];
        }
        Ok(types)
    }
}

impl RecordData {
    /// Decode `rdata` for a record of type `rtype`. Embedded names may use
    /// compression pointers into `packet`.
    pub fn decode(rtype: DNSResourceType, rdata: &[u8], packet: &[u8]) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidRecordData {
            rtype,
            reason: reason.to_string(),
        };

        let data = match rtype {
            DNSResourceType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| invalid("expected 4 octets"))?;
                RecordData::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA => {
                let octets: [u8; 16] =
                    rdata.try_into().map_err(|_| invalid("expected 16 octets"))?;
                RecordData::Aaaa(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS | DNSResourceType::CNAME | DNSResourceType::PTR => {
                let (name, end) = Name::decode(rdata, 0, packet)?;
                if end != rdata.len() {
                    return Err(invalid("trailing data after name"));
                }
                match rtype {
                    DNSResourceType::NS => RecordData::Ns(name),
                    DNSResourceType::CNAME => RecordData::Cname(name),
                    _ => RecordData::Ptr(name),
                }
            }
            DNSResourceType::MX => {
                if rdata.len() < 3 {
                    return Err(invalid("shorter than fixed fields"));
                }
                let (exchange, end) = Name::decode(rdata, 2, packet)?;
                if end != rdata.len() {
                    return Err(invalid("trailing data after name"));
                }
                RecordData::Mx(Mx {
                    preference: u16::from_be_bytes([rdata[0], rdata[1]]),
                    exchange,
                })
            }
            DNSResourceType::SOA => {
                let (mname, end) = Name::decode(rdata, 0, packet)?;
                let (rname, end) = Name::decode(rdata, end, packet)?;
                let fixed = rdata.get(end..).unwrap_or_default();
                if fixed.len() != 20 {
                    return Err(invalid("expected 20 octets after names"));
                }
                let u32_at = |at: usize| {
                    u32::from_be_bytes([fixed[at], fixed[at + 1], fixed[at + 2], fixed[at + 3]])
                };
                RecordData::Soa(Soa {
                    mname,
                    rname,
                    serial: u32_at(0),
                    refresh: u32_at(4),
                    retry: u32_at(8),
                    expire: u32_at(12),
                    minimum: u32_at(16),
                })
            }
            DNSResourceType::SRV => {
                if rdata.len() < 7 {
                    return Err(invalid("shorter than fixed fields"));
                }
                let (target, end) = Name::decode(rdata, 6, packet)?;
                if end != rdata.len() {
                    return Err(invalid("trailing data after name"));
                }
                RecordData::Srv(Srv {
                    priority: u16::from_be_bytes([rdata[0], rdata[1]]),
                    weight: u16::from_be_bytes([rdata[2], rdata[3]]),
                    port: u16::from_be_bytes([rdata[4], rdata[5]]),
                    target,
                })
            }
            DNSResourceType::TXT => {
                let mut strings = Vec::new();
                let mut rest = rdata;
                while let Some((&len, tail)) = rest.split_first() {
                    let chunk = tail
                        .get(..len as usize)
                        .ok_or_else(|| invalid("truncated character-string"))?;
                    strings.push(chunk.to_vec());
                    rest = &tail[len as usize..];
                }
                RecordData::Txt(strings)
            }
            DNSResourceType::DS => {
                if rdata.len() < 4 {
                    return Err(invalid("shorter than fixed fields"));
                }
                RecordData::Ds(Ds {
                    key_tag: u16::from_be_bytes([rdata[0], rdata[1]]),
                    algorithm: rdata[2],
                    digest_type: rdata[3],
                    digest: rdata[4..].to_vec(),
                })
            }
            DNSResourceType::DNSKEY => {
                if rdata.len() < 4 {
                    return Err(invalid("shorter than fixed fields"));
                }
                RecordData::DnsKey(DnsKey {
                    flags: u16::from_be_bytes([rdata[0], rdata[1]]),
                    protocol: rdata[2],
                    algorithm: rdata[3],
                    public_key: rdata[4..].to_vec(),
                })
            }
            DNSResourceType::RRSIG => {
                if rdata.len() < 19 {
                    return Err(invalid("shorter than fixed fields"));
                }
                let u32_at = |at: usize| {
                    u32::from_be_bytes([rdata[at], rdata[at + 1], rdata[at + 2], rdata[at + 3]])
                };
                let (signer_name, end) = Name::decode(rdata, 18, packet)?;
                RecordData::Rrsig(Rrsig {
                    type_covered: u16::from_be_bytes([rdata[0], rdata[1]]).into(),
                    algorithm: rdata[2],
                    labels: rdata[3],
                    original_ttl: u32_at(4),
                    expiration: u32_at(8),
                    inception: u32_at(12),
                    key_tag: u16::from_be_bytes([rdata[16], rdata[17]]),
                    signer_name,
                    signature: rdata[end..].to_vec(),
                })
            }
            DNSResourceType::NSEC => {
                let (next_domain, end) = Name::decode(rdata, 0, packet)?;
                RecordData::Nsec(Nsec {
                    next_domain,
                    types: Nsec::decode_type_bitmap(&rdata[end..])?,
                })
            }
            other => match name_layout(other.into()) {
                Some((prefix, count, suffix)) => {
                    let fixed = rdata
                        .get(..prefix)
                        .ok_or_else(|| invalid("shorter than fixed fields"))?;
                    let mut names = Vec::with_capacity(count);
                    let mut pos = prefix;
                    for _ in 0..count {
                        let (name, end) = Name::decode(rdata, pos, packet)?;
                        names.push(name);
                        pos = end;
                    }
                    if rdata.len() - pos != suffix {
                        return Err(invalid("unexpected data after names"));
                    }
                    RecordData::Named(NamedRdata {
                        prefix: fixed.to_vec(),
                        names,
                        suffix: rdata[pos..].to_vec(),
                    })
                }
                None => RecordData::Other(rdata.to_vec()),
            },
        };
        Ok(data)
    }

    /// Uncompressed wire form, names as received.
    pub fn to_wire(&self) -> Vec<u8> {
        self.encode(false)
    }

    /// Canonical wire form (RFC 4034 §6.2 as amended by RFC 6840 §5.1):
    /// uncompressed, with embedded names lowercased except the NSEC next name.
    pub fn to_canonical_wire(&self) -> Vec<u8> {
        self.encode(true)
    }

    fn encode(&self, canonical: bool) -> Vec<u8> {
        let write_name = |name: &Name, buf: &mut Vec<u8>| {
            if canonical {
                name.write_canonical(buf)
            } else {
                name.write_wire(buf)
            }
        };

        let mut buf = Vec::new();
        match self {
            RecordData::A(addr) => buf.extend_from_slice(&addr.octets()),
            RecordData::Aaaa(addr) => buf.extend_from_slice(&addr.octets()),
            RecordData::Ns(name) | RecordData::Cname(name) | RecordData::Ptr(name) => {
                write_name(name, &mut buf)
            }
            RecordData::Mx(mx) => {
                buf.extend_from_slice(&mx.preference.to_be_bytes());
                write_name(&mx.exchange, &mut buf);
            }
            RecordData::Soa(soa) => {
                write_name(&soa.mname, &mut buf);
                write_name(&soa.rname, &mut buf);
                for value in [soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
                    buf.extend_from_slice(&value.to_be_bytes());
                }
            }
            RecordData::Srv(srv) => {
                buf.extend_from_slice(&srv.priority.to_be_bytes());
                buf.extend_from_slice(&srv.weight.to_be_bytes());
                buf.extend_from_slice(&srv.port.to_be_bytes());
                write_name(&srv.target, &mut buf);
            }
            RecordData::Txt(strings) => {
                for s in strings {
                    buf.push(s.len() as u8);
                    buf.extend_from_slice(s);
                }
            }
            RecordData::Ds(ds) => {
                buf.extend_from_slice(&ds.key_tag.to_be_bytes());
                buf.push(ds.algorithm);
                buf.push(ds.digest_type);
                buf.extend_from_slice(&ds.digest);
            }
            RecordData::DnsKey(key) => buf = key.to_rdata(),
            RecordData::Rrsig(sig) => {
                buf = sig.rdata_without_signature();
                if !canonical {
                    buf.truncate(18);
                    sig.signer_name.write_wire(&mut buf);
                }
                buf.extend_from_slice(&sig.signature);
            }
            RecordData::Nsec(nsec) => {
                nsec.next_domain.write_wire(&mut buf);
                buf.extend_from_slice(&nsec.encode_type_bitmap());
            }
            RecordData::Named(named) => {
                buf.extend_from_slice(&named.prefix);
                for name in &named.names {
                    write_name(name, &mut buf);
                }
                buf.extend_from_slice(&named.suffix);
            }
            RecordData::Other(bytes) => buf.extend_from_slice(bytes),
        }
        buf
    }

    pub fn as_dnskey(&self) -> Option<&DnsKey> {
        match self {
            RecordData::DnsKey(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_ds(&self) -> Option<&Ds> {
        match self {
            RecordData::Ds(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn as_rrsig(&self) -> Option<&Rrsig> {
        match self {
            RecordData::Rrsig(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_nsec(&self) -> Option<&Nsec> {
        match self {
            RecordData::Nsec(nsec) => Some(nsec),
            _ => None,
        }
    }
}

fn fmt_name(name: &Name) -> String {
    if name.is_root() {
        ".".to_string()
    } else {
        format!("{}.", name)
    }
}

/// Presentation format (RFC 1035 §5.1 and the per-type RFCs)
impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(addr) => write!(f, "{}", addr),
            RecordData::Aaaa(addr) => write!(f, "{}", addr),
            RecordData::Ns(name) | RecordData::Cname(name) | RecordData::Ptr(name) => {
                write!(f, "{}", fmt_name(name))
            }
            RecordData::Mx(mx) => write!(f, "{} {}", mx.preference, fmt_name(&mx.exchange)),
            RecordData::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                fmt_name(&soa.mname),
                fmt_name(&soa.rname),
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minimum
            ),
            RecordData::Srv(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority,
                srv.weight,
                srv.port,
                fmt_name(&srv.target)
            ),
            RecordData::Txt(strings) => {
                let quoted: Vec<String> = strings
                    .iter()
                    .map(|s| format!("{:?}", String::from_utf8_lossy(s)))
                    .collect();
                write!(f, "{}", quoted.join(" "))
            }
            RecordData::Ds(ds) => write!(
                f,
                "{} {} {} {}",
                ds.key_tag,
                ds.algorithm,
                ds.digest_type,
                hex::encode_upper(&ds.digest)
            ),
            RecordData::DnsKey(key) => write!(
                f,
                "{} {} {} {}",
                key.flags,
                key.protocol,
                key.algorithm,
                STANDARD.encode(&key.public_key)
            ),
            RecordData::Rrsig(sig) => write!(
                f,
                "{} {} {} {} {} {} {} {} {}",
                sig.type_covered,
                sig.algorithm,
                sig.labels,
                sig.original_ttl,
                sig.expiration,
                sig.inception,
                sig.key_tag,
                fmt_name(&sig.signer_name),
                STANDARD.encode(&sig.signature)
            ),
            RecordData::Nsec(nsec) => {
                write!(f, "{}", fmt_name(&nsec.next_domain))?;
                for rtype in &nsec.types {
                    write!(f, " {}", rtype)?;
                }
                Ok(())
            }
            RecordData::Named(_) => {
                let wire = self.to_wire();
                write!(f, "\\# {} {}", wire.len(), hex::encode(&wire))
            }
            RecordData::Other(bytes) => write!(f, "\\# {} {}", bytes.len(), hex::encode(bytes)),
        }
    }
}

impl serde::Serialize for RecordData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
