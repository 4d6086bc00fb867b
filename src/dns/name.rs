use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::ParseError;

/// Maximum length of a single label (RFC 1035 §2.3.4)
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of an encoded name, including the root label
pub const MAX_NAME_LEN: usize = 255;

/// Upper bound on compression pointers followed while decoding one name
const MAX_POINTER_JUMPS: usize = 64;

/// A domain name, stored as labels from most specific to the root.
///
/// The root zone is the empty label sequence. Equality, hashing and ordering
/// are ASCII case-insensitive, as DNS names are.
#[derive(Clone, Debug, Default)]
pub struct Name {
    labels: Vec<String>,
}

impl Name {
    /// The root name `.`
    pub fn root() -> Self {
        Self { labels: Vec::new() }
    }

    /// Build a name from labels ordered most specific first.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut wire_len = 1;
        for label in &labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(ParseError::InvalidLabel);
            }
            wire_len += label.len() + 1;
        }
        if wire_len > MAX_NAME_LEN {
            return Err(ParseError::NameTooLong);
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of labels, not counting the root. This is the value an RRSIG
    /// carries in its `labels` field for a non-wildcard owner.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// The immediate parent, or `None` for the root.
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            labels: self.labels[1..].to_vec(),
        })
    }

    /// Every suffix of this name, root first, ending with the name itself.
    ///
    /// `_ens.matoken.xyz` yields `.`, `xyz`, `matoken.xyz`, `_ens.matoken.xyz`.
    pub fn zone_cuts(&self) -> Vec<Name> {
        (0..=self.labels.len())
            .rev()
            .map(|skip| Self {
                labels: self.labels[skip..].to_vec(),
            })
            .collect()
    }

    /// True if `self` equals `other` or lies below it.
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Length of the uncompressed wire encoding.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Append the uncompressed wire form, preserving case.
    pub fn write_wire(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
    }

    /// Append the canonical wire form (RFC 4034 §6.2): uncompressed, lowercase.
    pub fn write_canonical(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend(label.bytes().map(|b| b.to_ascii_lowercase()));
        }
        buf.push(0);
    }

    pub fn to_canonical_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.write_canonical(&mut buf);
        buf
    }

    /// Canonical DNS name order (RFC 4034 §6.1).
    ///
    /// Names are compared label by label starting from the root side, each
    /// label as lowercase octets. A name sorts before any name below it.
    pub fn canonical_cmp(&self, other: &Name) -> Ordering {
        let mut ours = self.labels.iter().rev();
        let mut theirs = other.labels.iter().rev();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let a = a.bytes().map(|c| c.to_ascii_lowercase());
                    let b = b.bytes().map(|c| c.to_ascii_lowercase());
                    match a.cmp(b) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }
            }
        }
    }

    /// Decode a name starting at `offset` in `local`.
    ///
    /// Compression pointers are resolved against `packet`, which is the whole
    /// message the name was taken from (pass `local` again when decoding from
    /// the message itself). Returns the name and the offset in `local` just
    /// past its encoding.
    pub fn decode(local: &[u8], offset: usize, packet: &[u8]) -> Result<(Name, usize), ParseError> {
        let mut labels = Vec::new();
        let mut buf = local;
        let mut pos = offset;
        let mut end = None;
        let mut jumps = 0;
        let mut wire_len = 1;

        loop {
            let len = *buf.get(pos).ok_or(ParseError::InvalidLabel)? as usize;
            match len & 0xC0 {
                0x00 => {
                    pos += 1;
                    if len == 0 {
                        break;
                    }
                    let bytes = buf.get(pos..pos + len).ok_or(ParseError::InvalidLabel)?;
                    let label =
                        String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidLabel)?;
                    wire_len += len + 1;
                    if wire_len > MAX_NAME_LEN {
                        return Err(ParseError::NameTooLong);
                    }
                    labels.push(label);
                    pos += len;
                }
                0xC0 => {
                    let low = *buf.get(pos + 1).ok_or(ParseError::InvalidLabel)? as usize;
                    if end.is_none() {
                        end = Some(pos + 2);
                    }
                    jumps += 1;
                    if jumps > MAX_POINTER_JUMPS {
                        return Err(ParseError::CompressionLoop);
                    }
                    buf = packet;
                    pos = ((len & 0x3F) << 8) | low;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }

        Ok((Self { labels }, end.unwrap_or(pos)))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            state.write_usize(label.len());
            for byte in label.bytes() {
                state.write_u8(byte.to_ascii_lowercase());
            }
        }
    }
}

impl FromStr for Name {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::from_labels(trimmed.split('.'))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        write!(f, "{}", self.labels.join("."))
    }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
