//! Decoding of conntrack attribute trees into typed values.
//!
//! Decoders are pure: they take a materialized [`Attr`](crate::attr::Attr)
//! tree and return a value or a [`DecodeError`]. The first malformed node
//! aborts the enclosing decode; partial values never escape.

use smallvec::SmallVec;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use zerocopy::byteorder::{BigEndian, U16, U32, U64};
use zerocopy::FromBytes;

use crate::attr::Attr;

pub mod codes;
pub mod record;
pub mod tuple;

/// What went wrong, independent of where.
///
/// Matching on the kind never requires string comparison; the surrounding
/// [`DecodeError`] only adds diagnostic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("attribute is not nested")]
    NotNested,
    #[error("need at least {0} child attributes")]
    NeedChildren(usize),
    #[error("need at least one child attribute")]
    NeedSingleChild,
    #[error("payload is {actual} bytes, want {expected}")]
    IncorrectSize { expected: usize, actual: usize },
    #[error("unexpected attribute type {actual}, want {expected}")]
    WrongType { expected: u16, actual: u16 },
    #[error("unknown child type {code} in {context}")]
    UnknownChildType { code: u16, context: &'static str },
}

/// A decode failure with the operations it passed through.
///
/// The innermost decoder records its operation name when it raises the
/// error; every enclosing decoder adds its own on the way out. `Display`
/// prints the trail outermost-first:
///
/// ```text
/// decode tuple: decode ip tuple: attribute is not nested
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    trail: SmallVec<[&'static str; 2]>,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind, op: &'static str) -> Self {
        let mut trail = SmallVec::new();
        trail.push(op);
        DecodeError { kind, trail }
    }

    /// Record `op` as the enclosing operation of a propagating error.
    pub(crate) fn wrap(mut self, op: &'static str) -> Self {
        self.trail.push(op);
        self
    }

    /// The structural failure, unchanged by any wrapping.
    #[inline]
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Operation names, outermost first.
    pub fn trail(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.trail.iter().rev().copied()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in self.trail.iter().rev() {
            write!(f, "{}: ", op)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DecodeError {}

// Leaf scalar readers. Integer payloads inside conntrack attributes are
// big-endian; a width mismatch (including a branch where a leaf is
// expected, which reads as zero bytes) is an IncorrectSize in `op`.

pub(crate) fn leaf_u8(attr: &Attr, op: &'static str) -> Result<u8, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    u8::read_from_bytes(payload).map_err(|_| {
        DecodeError::new(
            DecodeErrorKind::IncorrectSize {
                expected: 1,
                actual: payload.len(),
            },
            op,
        )
    })
}

pub(crate) fn leaf_u16(attr: &Attr, op: &'static str) -> Result<u16, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    U16::<BigEndian>::read_from_bytes(payload)
        .map(|v| v.get())
        .map_err(|_| {
            DecodeError::new(
                DecodeErrorKind::IncorrectSize {
                    expected: 2,
                    actual: payload.len(),
                },
                op,
            )
        })
}

pub(crate) fn leaf_u32(attr: &Attr, op: &'static str) -> Result<u32, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    U32::<BigEndian>::read_from_bytes(payload)
        .map(|v| v.get())
        .map_err(|_| {
            DecodeError::new(
                DecodeErrorKind::IncorrectSize {
                    expected: 4,
                    actual: payload.len(),
                },
                op,
            )
        })
}

pub(crate) fn leaf_u64(attr: &Attr, op: &'static str) -> Result<u64, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    U64::<BigEndian>::read_from_bytes(payload)
        .map(|v| v.get())
        .map_err(|_| {
            DecodeError::new(
                DecodeErrorKind::IncorrectSize {
                    expected: 8,
                    actual: payload.len(),
                },
                op,
            )
        })
}

pub(crate) fn leaf_addr4(attr: &Attr, op: &'static str) -> Result<Ipv4Addr, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    <[u8; 4]>::read_from_bytes(payload)
        .map(Ipv4Addr::from)
        .map_err(|_| {
            DecodeError::new(
                DecodeErrorKind::IncorrectSize {
                    expected: 4,
                    actual: payload.len(),
                },
                op,
            )
        })
}

pub(crate) fn leaf_addr16(attr: &Attr, op: &'static str) -> Result<Ipv6Addr, DecodeError> {
    let payload = attr.payload().unwrap_or(&[]);
    <[u8; 16]>::read_from_bytes(payload)
        .map(Ipv6Addr::from)
        .map_err(|_| {
            DecodeError::new(
                DecodeErrorKind::IncorrectSize {
                    expected: 16,
                    actual: payload.len(),
                },
                op,
            )
        })
}
