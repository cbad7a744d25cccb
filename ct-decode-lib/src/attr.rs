//! Netlink attribute trees
//!
//! Conntrack records are carried as a stream of TLV attributes, some of
//! which nest a child stream inside their payload:
//!
//! ```text
//!  0      2      4
//!  +------+------+----------------+--------+
//!  | len  | type |    payload     |  pad   |
//!  +------+------+----------------+--------+
//!     LE     LE    len - 4 bytes    to 4B
//! ```
//!
//! `len` covers the header and payload but not the trailing padding. Bit
//! 15 of `type` marks a nested attribute whose payload is itself an
//! attribute stream; flag bits are masked off the stored type code.
//! Attribute headers are host-endian on the wire; this reader assumes
//! captures taken on little-endian hosts. Multi-byte payload integers are
//! big-endian and are the decoders' concern, not the reader's.
//!
//! A parsed node is either a leaf or a branch, never both.
//!
//! # Examples
//!
//! ```
//! use ct_decode::attr::Attr;
//!
//! // One leaf attribute: length 6, type 3, two payload bytes, padded to 8.
//! let wire = [0x06, 0x00, 0x03, 0x00, 0x00, 0x7b, 0x00, 0x00];
//! let attrs = Attr::read_all(&wire).unwrap();
//! assert_eq!(attrs.len(), 1);
//! assert_eq!(attrs[0].atype(), 3);
//! assert_eq!(attrs[0].payload(), Some(&[0x00, 0x7b][..]));
//! assert!(!attrs[0].is_nested());
//! ```

use smallvec::SmallVec;
use thiserror::Error;
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Ref, Unaligned};

/// Flag bit marking a nested attribute.
pub const NLA_F_NESTED: u16 = 0x8000;
/// Flag bit marking a big-endian payload.
pub const NLA_F_NET_BYTEORDER: u16 = 0x4000;
/// Mask extracting the bare type code.
pub const NLA_TYPE_MASK: u16 = 0x3fff;

const NLA_HDR_LEN: usize = 4;
const NLA_ALIGN: usize = 4;

/// Nesting levels accepted before the reader refuses the input. Conntrack
/// trees are at most three levels deep.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    #[error("buffer too short for {0}")]
    TooShort(&'static str),
    #[error("attribute length {0} shorter than its header")]
    BadLength(usize),
    #[error("attribute nesting deeper than {0} levels")]
    TooDeep(usize),
}

/// Raw attribute header as it appears in a capture.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Unaligned, KnownLayout, Immutable, Debug, Clone, Copy)]
struct NlaHeader {
    len: U16<LittleEndian>,
    atype: U16<LittleEndian>,
}

/// A single attribute node with its bare type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    atype: u16,
    data: AttrData,
}

/// Attribute payload: a leaf holds bytes, a branch holds ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrData {
    Leaf(SmallVec<[u8; 16]>),
    Nested(Vec<Attr>),
}

impl Attr {
    /// Build a leaf attribute from raw payload bytes.
    pub fn leaf(atype: u16, payload: &[u8]) -> Self {
        Attr {
            atype,
            data: AttrData::Leaf(SmallVec::from_slice(payload)),
        }
    }

    /// Build a nested attribute from its children, in order.
    pub fn nested(atype: u16, children: Vec<Attr>) -> Self {
        Attr {
            atype,
            data: AttrData::Nested(children),
        }
    }

    /// Bare type code, flag bits stripped.
    #[inline]
    pub fn atype(&self) -> u16 {
        self.atype
    }

    #[inline]
    pub fn is_nested(&self) -> bool {
        matches!(self.data, AttrData::Nested(_))
    }

    /// Child attributes of a branch, `None` for a leaf.
    #[inline]
    pub fn children(&self) -> Option<&[Attr]> {
        match &self.data {
            AttrData::Nested(children) => Some(children),
            AttrData::Leaf(_) => None,
        }
    }

    /// Payload bytes of a leaf, `None` for a branch.
    #[inline]
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.data {
            AttrData::Leaf(payload) => Some(payload),
            AttrData::Nested(_) => None,
        }
    }

    /// Parse a complete attribute stream into a tree.
    ///
    /// Consumes the whole buffer; trailing bytes that do not form a valid
    /// attribute are an error, not ignored.
    pub fn read_all(buf: &[u8]) -> Result<Vec<Attr>, AttrError> {
        Self::read_level(buf, 0)
    }

    fn read_level(mut buf: &[u8], depth: usize) -> Result<Vec<Attr>, AttrError> {
        if depth >= MAX_DEPTH {
            return Err(AttrError::TooDeep(MAX_DEPTH));
        }

        let mut attrs = Vec::new();
        while !buf.is_empty() {
            let (attr, rest) = Self::read_one(buf, depth)?;
            attrs.push(attr);
            buf = rest;
        }
        Ok(attrs)
    }

    fn read_one(buf: &[u8], depth: usize) -> Result<(Attr, &[u8]), AttrError> {
        let (header, _) = Ref::<_, NlaHeader>::from_prefix(buf)
            .map_err(|_| AttrError::TooShort("attribute header"))?;
        let header = Ref::into_ref(header);

        let total = header.len.get() as usize;
        if total < NLA_HDR_LEN {
            return Err(AttrError::BadLength(total));
        }
        if total > buf.len() {
            return Err(AttrError::TooShort("attribute payload"));
        }

        let payload = &buf[NLA_HDR_LEN..total];
        let raw_type = header.atype.get();
        let atype = raw_type & NLA_TYPE_MASK;

        let attr = if raw_type & NLA_F_NESTED != 0 {
            Attr {
                atype,
                data: AttrData::Nested(Self::read_level(payload, depth + 1)?),
            }
        } else {
            Attr {
                atype,
                data: AttrData::Leaf(SmallVec::from_slice(payload)),
            }
        };

        // Attributes are padded out to 4-byte alignment; the final one may
        // omit the padding.
        let advance = ((total + NLA_ALIGN - 1) & !(NLA_ALIGN - 1)).min(buf.len());
        Ok((attr, &buf[advance..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode one attribute the way the kernel lays it out.
    fn nla(atype: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((NLA_HDR_LEN + payload.len()) as u16).to_le_bytes());
        out.extend_from_slice(&atype.to_le_bytes());
        out.extend_from_slice(payload);
        while out.len() % NLA_ALIGN != 0 {
            out.push(0);
        }
        out
    }

    fn nla_nested(atype: u16, inner: &[u8]) -> Vec<u8> {
        nla(atype | NLA_F_NESTED, inner)
    }

    #[test]
    fn test_read_leaf() {
        let wire = nla(3, &[0x00, 0x7b]);
        let attrs = Attr::read_all(&wire).unwrap();

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].atype(), 3);
        assert!(!attrs[0].is_nested());
        assert_eq!(attrs[0].payload(), Some(&[0x00, 0x7b][..]));
        assert_eq!(attrs[0].children(), None);
    }

    #[test]
    fn test_read_nested() {
        let inner = nla(1, &[1, 2, 3, 4]);
        let wire = nla_nested(2, &inner);
        let attrs = Attr::read_all(&wire).unwrap();

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].atype(), 2);
        assert!(attrs[0].is_nested());
        assert_eq!(attrs[0].payload(), None);

        let children = attrs[0].children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0], Attr::leaf(1, &[1, 2, 3, 4]));
    }

    #[test]
    fn test_read_stream_with_padding() {
        let mut wire = nla(1, &[0xaa]);
        wire.extend_from_slice(&nla(2, &[0xbb, 0xcc, 0xdd, 0xee]));
        let attrs = Attr::read_all(&wire).unwrap();

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], Attr::leaf(1, &[0xaa]));
        assert_eq!(attrs[1], Attr::leaf(2, &[0xbb, 0xcc, 0xdd, 0xee]));
    }

    #[test]
    fn test_read_strips_flag_bits() {
        let wire = nla(5 | NLA_F_NET_BYTEORDER, &[0x01, 0x02]);
        let attrs = Attr::read_all(&wire).unwrap();
        assert_eq!(attrs[0].atype(), 5);
    }

    #[test]
    fn test_read_empty() {
        assert_eq!(Attr::read_all(&[]).unwrap(), vec![]);
    }

    #[test]
    fn test_read_truncated_header() {
        let err = Attr::read_all(&[0x08, 0x00, 0x01]).unwrap_err();
        assert_eq!(err, AttrError::TooShort("attribute header"));
    }

    #[test]
    fn test_read_truncated_payload() {
        // Header claims 12 bytes, only 8 present.
        let wire = [0x0c, 0x00, 0x01, 0x00, 0xaa, 0xbb, 0xcc, 0xdd];
        let err = Attr::read_all(&wire).unwrap_err();
        assert_eq!(err, AttrError::TooShort("attribute payload"));
    }

    #[test]
    fn test_read_bad_length() {
        let wire = [0x02, 0x00, 0x01, 0x00];
        let err = Attr::read_all(&wire).unwrap_err();
        assert_eq!(err, AttrError::BadLength(2));
    }

    #[test]
    fn test_read_depth_cap() {
        let mut wire = nla(1, &[0xff]);
        for _ in 0..9 {
            wire = nla_nested(1, &wire);
        }
        let err = Attr::read_all(&wire).unwrap_err();
        assert_eq!(err, AttrError::TooDeep(8));
    }

    #[test]
    fn test_builders() {
        let attr = Attr::nested(7, vec![Attr::leaf(1, &[0x0a])]);
        assert_eq!(attr.atype(), 7);
        assert!(attr.is_nested());
        assert_eq!(attr.children().unwrap().len(), 1);
        assert_eq!(attr.children().unwrap()[0].payload(), Some(&[0x0a][..]));
    }
}
