pub mod common;
pub mod edns;
pub mod enums;
pub mod header;
pub mod name;
pub mod question;
pub mod rdata;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use common::PacketComponent;
use edns::EdnsOpt;
use enums::{DNSResourceClass, DNSResourceType, ResponseCode};
use header::DNSHeader;
use question::DNSQuestion;
use resource::DNSResource;
use thiserror::Error;
use tracing::trace;

pub use name::Name;
pub use rdata::{DnsKey, Ds, Mx, NamedRdata, Nsec, RecordData, Rrsig, Soa, Srv};

/// Payload size advertised in outgoing EDNS0 OPT records
pub const EDNS_UDP_PAYLOAD_SIZE: u16 = 4096;

/// Transaction ID for outgoing queries. Responses are only trusted through
/// their signatures, so a fixed value is enough; RFC 8484 also recommends a
/// constant ID for DoH cache friendliness.
pub const QUERY_ID: u16 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record if present (extracted from additional records)
    pub edns: Option<EdnsOpt>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid DNS header")]
    InvalidHeader,
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("DNS name exceeds 255 octets")]
    NameTooLong,
    #[error("Compression pointer loop")]
    CompressionLoop,
    #[error("Invalid {rtype} record data: {reason}")]
    InvalidRecordData { rtype: DNSResourceType, reason: String },
    #[error("Unknown record type: {0}")]
    UnknownType(String),
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl DNSPacket {
    /// Build a DNSSEC query for `name`/`rtype`: recursion desired, class IN,
    /// and an EDNS0 OPT record with the DO bit set so signatures come back.
    pub fn query(name: &Name, rtype: DNSResourceType) -> Self {
        let mut packet = DNSPacket {
            header: DNSHeader {
                id: QUERY_ID,
                rd: true,
                qdcount: 1,
                ..Default::default()
            },
            questions: vec![DNSQuestion {
                name: name.clone(),
                qtype: rtype,
                qclass: DNSResourceClass::IN,
            }],
            ..Default::default()
        };
        packet.add_edns(EDNS_UDP_PAYLOAD_SIZE, true);
        packet
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader, buf)?;

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question.read(&mut reader, buf)?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            answer.read(&mut reader, buf)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            authority.read(&mut reader, buf)?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let mut resource = DNSResource::default();
            resource.read(&mut reader, buf)?;

            if resource.rtype == DNSResourceType::OPT && resource.name.is_root() {
                let payload_size = u16::from(resource.rclass);
                match EdnsOpt::parse_from_resource(payload_size, resource.ttl, &resource.raw_rdata()) {
                    Ok(edns) => {
                        trace!("Parsed EDNS0 record: {}", edns.debug_info());
                        packet.edns = Some(edns);
                        continue;
                    }
                    Err(e) => trace!("Failed to parse EDNS OPT record: {}", e),
                }
            }

            packet.resources.push(resource);
        }

        trace!(
            "Parsed DNS packet: id={}, rcode={}, answers={}, authorities={}",
            packet.header.id,
            packet.header.rcode,
            packet.answers.len(),
            packet.authorities.len()
        );
        Ok(packet)
    }

    /// Encode the packet. Section counts are taken from the section vectors,
    /// not from the header fields.
    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + u16::from(self.edns.is_some());
        header.write(&mut writer)?;

        for question in &self.questions {
            question.write(&mut writer)?;
        }
        for answer in &self.answers {
            answer.write(&mut writer)?;
        }
        for authority in &self.authorities {
            authority.write(&mut writer)?;
        }
        for resource in &self.resources {
            resource.write(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            edns.to_resource().write(&mut writer)?;
        }

        Ok(buf)
    }

    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_u8(self.header.rcode)
    }

    /// Check if DNSSEC is requested (DO flag)
    pub fn dnssec_requested(&self) -> bool {
        self.edns.as_ref().map(|edns| edns.do_flag()).unwrap_or(false)
    }

    /// Add or update EDNS support in the packet
    pub fn add_edns(&mut self, payload_size: u16, do_flag: bool) {
        let mut edns = EdnsOpt::with_payload_size(payload_size);
        edns.set_do_flag(do_flag);
        self.edns = Some(edns);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_query_wire_format() {
        // Captured query for "_ens.matoken.xyz TXT" with DO set
        let expected = STANDARD
            .decode("AAEBAAABAAAAAAABBF9lbnMHbWF0b2tlbgN4eXoAABAAAQAAKRAAAACAAAAA")
            .unwrap();
        let name: Name = "_ens.matoken.xyz".parse().unwrap();
        let query = DNSPacket::query(&name, DNSResourceType::TXT);
        assert_eq!(query.serialize().unwrap(), expected);
    }

    #[test]
    fn test_root_dnskey_query_wire_format() {
        let expected = STANDARD
            .decode("AAEBAAABAAAAAAABAAAwAAEAACkQAAAAgAAAAA==")
            .unwrap();
        let query = DNSPacket::query(&Name::root(), DNSResourceType::DNSKEY);
        assert_eq!(query.serialize().unwrap(), expected);
    }

    #[test]
    fn test_query_parse_round_trip() {
        let name: Name = "matoken.xyz".parse().unwrap();
        let query = DNSPacket::query(&name, DNSResourceType::DS);
        let parsed = DNSPacket::parse(&query.serialize().unwrap()).unwrap();
        assert_eq!(parsed.questions, query.questions);
        assert!(parsed.dnssec_requested());
        assert_eq!(parsed.edns.unwrap().udp_payload_size, EDNS_UDP_PAYLOAD_SIZE);
        assert!(parsed.resources.is_empty());
    }

    #[test]
    fn test_truncated_packet_fails() {
        let name: Name = "xyz".parse().unwrap();
        let bytes = DNSPacket::query(&name, DNSResourceType::A).serialize().unwrap();
        assert!(DNSPacket::parse(&bytes[..bytes.len() - 3]).is_err());
    }
}
