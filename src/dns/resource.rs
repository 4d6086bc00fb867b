use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    Name, ParseError, RecordData,
    common::PacketComponent,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub name: Name,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub data: RecordData,
}

impl DNSResource {
    /// RDATA as it goes on the wire, names uncompressed.
    pub fn raw_rdata(&self) -> Vec<u8> {
        self.data.to_wire()
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        let rdata = self.raw_rdata();
        self.write_name(writer, &self.name)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, rdata.len() as u16)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }

    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError> {
        self.name = self.read_name(reader, packet)?;
        self.rtype = reader.read_var::<u16>(16)?.into();
        self.rclass = reader.read_var::<u16>(16)?.into();
        self.ttl = reader.read_var::<u32>(32)?;
        let rdlength = reader.read_var::<u16>(16)?;
        let mut buf = vec![0_u8; rdlength as usize];
        reader.read_bytes(&mut buf)?;
        self.data = RecordData::decode(self.rtype, &buf, packet)?;

        Ok(())
    }
}
