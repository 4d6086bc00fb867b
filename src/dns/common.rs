use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{Name, ParseError};

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    /// Read this component from `reader`. `packet` is the whole message and is
    /// only consulted to follow name compression pointers.
    fn read<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<(), ParseError>;

    fn read_name<E: Endianness>(
        &self,
        reader: &mut BitReader<&[u8], E>,
        packet: &[u8],
    ) -> Result<Name, ParseError> {
        let mut labels = Vec::new();
        loop {
            let label_len = reader.read_var::<u8>(8)?;
            if label_len == 0 {
                break;
            }
            match label_len & 0xC0 {
                0x00 => {
                    let mut buf = vec![0; label_len as usize];
                    reader.read_bytes(&mut buf)?;
                    let label = String::from_utf8(buf).map_err(|_| ParseError::InvalidLabel)?;
                    labels.push(label);
                }
                0xC0 => {
                    let low = reader.read_var::<u8>(8)?;
                    let offset = (((label_len & 0x3F) as usize) << 8) | low as usize;
                    let (tail, _) = Name::decode(packet, offset, packet)?;
                    labels.extend(tail.labels().iter().cloned());
                    break;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        Name::from_labels(labels)
    }

    /// Names are always written uncompressed.
    fn write_name<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        name: &Name,
    ) -> Result<(), ParseError> {
        for label in name.labels() {
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}
