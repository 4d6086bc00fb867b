use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// Resource record types this crate knows by name. Anything else is carried
/// as `Unknown` with its numeric value so it survives a decode/encode cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    DS,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    TLSA,
    CAA,
    Unknown(u16),
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            33 => DNSResourceType::SRV,
            41 => DNSResourceType::OPT,
            43 => DNSResourceType::DS,
            46 => DNSResourceType::RRSIG,
            47 => DNSResourceType::NSEC,
            48 => DNSResourceType::DNSKEY,
            50 => DNSResourceType::NSEC3,
            52 => DNSResourceType::TLSA,
            257 => DNSResourceType::CAA,
            other => DNSResourceType::Unknown(other),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(rtype: DNSResourceType) -> Self {
        match rtype {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::SRV => 33,
            DNSResourceType::OPT => 41,
            DNSResourceType::DS => 43,
            DNSResourceType::RRSIG => 46,
            DNSResourceType::NSEC => 47,
            DNSResourceType::DNSKEY => 48,
            DNSResourceType::NSEC3 => 50,
            DNSResourceType::TLSA => 52,
            DNSResourceType::CAA => 257,
            DNSResourceType::Unknown(value) => value,
        }
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceType::Unknown(value) => write!(f, "TYPE{}", value),
            known => write!(f, "{:?}", known),
        }
    }
}

impl FromStr for DNSResourceType {
    type Err = ParseError;

    /// Accepts mnemonics (`TXT`, `dnskey`) and the RFC 3597 `TYPEnnn` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let rtype = match upper.as_str() {
            "A" => DNSResourceType::A,
            "NS" => DNSResourceType::NS,
            "CNAME" => DNSResourceType::CNAME,
            "SOA" => DNSResourceType::SOA,
            "PTR" => DNSResourceType::PTR,
            "MX" => DNSResourceType::MX,
            "TXT" => DNSResourceType::TXT,
            "AAAA" => DNSResourceType::AAAA,
            "SRV" => DNSResourceType::SRV,
            "OPT" => DNSResourceType::OPT,
            "DS" => DNSResourceType::DS,
            "RRSIG" => DNSResourceType::RRSIG,
            "NSEC" => DNSResourceType::NSEC,
            "DNSKEY" => DNSResourceType::DNSKEY,
            "NSEC3" => DNSResourceType::NSEC3,
            "TLSA" => DNSResourceType::TLSA,
            "CAA" => DNSResourceType::CAA,
            other => other
                .strip_prefix("TYPE")
                .and_then(|n| n.parse::<u16>().ok())
                .map(DNSResourceType::from)
                .ok_or_else(|| ParseError::UnknownType(s.to_string()))?,
        };
        Ok(rtype)
    }
}

impl serde::Serialize for DNSResourceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CH,
    HS,
    NONE,
    ANY,
    /// Also used for the OPT pseudo-record, whose class field holds the UDP
    /// payload size.
    Unknown(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            254 => DNSResourceClass::NONE,
            255 => DNSResourceClass::ANY,
            other => DNSResourceClass::Unknown(other),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(class: DNSResourceClass) -> Self {
        match class {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::NONE => 254,
            DNSResourceClass::ANY => 255,
            DNSResourceClass::Unknown(value) => value,
        }
    }
}

impl serde::Serialize for DNSResourceClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DNSResourceClass::Unknown(value) => serializer.collect_str(&format_args!("CLASS{}", value)),
            known => serializer.collect_str(&format_args!("{:?}", known)),
        }
    }
}

/// Response codes (RFC 1035 §4.1.1)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl ResponseCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(value) => value,
        }
    }

    /// NOERROR and NXDOMAIN both carry usable (possibly negative) data.
    pub fn is_authoritative_answer(self) -> bool {
        matches!(self, ResponseCode::NoError | ResponseCode::NameError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trip_through_u16() {
        for value in [1u16, 16, 43, 46, 47, 48, 253, 65280] {
            assert_eq!(u16::from(DNSResourceType::from(value)), value);
        }
        assert_eq!(DNSResourceType::from(253), DNSResourceType::Unknown(253));
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("txt".parse::<DNSResourceType>().unwrap(), DNSResourceType::TXT);
        assert_eq!("DNSKEY".parse::<DNSResourceType>().unwrap(), DNSResourceType::DNSKEY);
        assert_eq!("TYPE16".parse::<DNSResourceType>().unwrap(), DNSResourceType::TXT);
        assert_eq!(
            "TYPE65280".parse::<DNSResourceType>().unwrap(),
            DNSResourceType::Unknown(65280)
        );
        assert!("BOGUS".parse::<DNSResourceType>().is_err());
    }

    #[test]
    fn test_type_display() {
        assert_eq!(DNSResourceType::NSEC.to_string(), "NSEC");
        assert_eq!(DNSResourceType::Unknown(999).to_string(), "TYPE999");
    }
}
