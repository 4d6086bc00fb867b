use super::{
    Name, ParseError, RecordData,
    enums::{DNSResourceClass, DNSResourceType},
    resource::DNSResource,
};

/// DNSSEC OK bit in the OPT TTL flags (RFC 3225)
const DO_FLAG: u16 = 0x8000;

/// EDNS0 OPT pseudo-record (RFC 6891)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOpt {
    /// UDP payload size that can be handled by the requestor
    pub udp_payload_size: u16,
    /// Extended RCODE (high 8 bits)
    pub extended_rcode: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<EdnsOption>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl Default for EdnsOpt {
    fn default() -> Self {
        Self {
            udp_payload_size: 512,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }
}

impl EdnsOpt {
    pub fn with_payload_size(payload_size: u16) -> Self {
        Self {
            udp_payload_size: payload_size,
            ..Self::default()
        }
    }

    /// Check if DNSSEC OK (DO) flag is set
    pub fn do_flag(&self) -> bool {
        (self.flags & DO_FLAG) != 0
    }

    pub fn set_do_flag(&mut self, value: bool) {
        if value {
            self.flags |= DO_FLAG;
        } else {
            self.flags &= !DO_FLAG;
        }
    }

    /// Parse the OPT record fields. The class carries the payload size and
    /// the TTL packs extended RCODE, version and flags.
    pub fn parse_from_resource(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self, ParseError> {
        let mut options = Vec::new();
        let mut pos = 0;

        while pos + 4 <= rdata.len() {
            let code = u16::from_be_bytes([rdata[pos], rdata[pos + 1]]);
            let len = u16::from_be_bytes([rdata[pos + 2], rdata[pos + 3]]) as usize;
            pos += 4;

            let data = rdata
                .get(pos..pos + len)
                .ok_or_else(|| ParseError::InvalidRecordData {
                    rtype: DNSResourceType::OPT,
                    reason: format!("option {} overruns rdata", code),
                })?;
            options.push(EdnsOption {
                code,
                data: data.to_vec(),
            });
            pos += len;
        }

        Ok(EdnsOpt {
            udp_payload_size: class,
            extended_rcode: ((ttl >> 24) & 0xFF) as u8,
            version: ((ttl >> 16) & 0xFF) as u8,
            flags: (ttl & 0xFFFF) as u16,
            options,
        })
    }

    /// The OPT pseudo-record as it appears in the additional section.
    pub fn to_resource(&self) -> DNSResource {
        let ttl = ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | (self.flags as u32);

        let mut rdata = Vec::new();
        for option in &self.options {
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&(option.data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }

        DNSResource {
            name: Name::root(),
            rtype: DNSResourceType::OPT,
            rclass: DNSResourceClass::from(self.udp_payload_size),
            ttl,
            data: RecordData::Other(rdata),
        }
    }

    pub fn debug_info(&self) -> String {
        format!(
            "EDNS0: payload_size={}, version={}, flags=0x{:04x}, options={}",
            self.udp_payload_size,
            self.version,
            self.flags,
            self.options.len()
        )
    }
}
