//! Conntrack record decoding
//!
//! A conntrack netlink payload is a 4-byte nfgenmsg header followed by a
//! stream of top-level attributes. [`CtRecord`] collects the subset this
//! crate understands and skips the rest, so a record from any kernel
//! version decodes as long as its tuples are well formed.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, SmolStrBuilder};
use thiserror::Error;
use tracing::trace;
use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Ref, Unaligned};

use crate::attr::{Attr, AttrError};
use crate::decode::codes::{Family, RecordType, TimestampType, TupleDirection};
use crate::decode::tuple::Tuple;
use crate::decode::{leaf_u16, leaf_u32, leaf_u64, DecodeError, DecodeErrorKind};
use crate::timestamp::{Interval, Timestamp};

const OP_RECORD: &str = "decode record";

/// Netfilter generic header, the first 4 bytes of every conntrack
/// payload.
#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct NfGenMsg {
    family: u8,
    version: u8,
    res_id: U16<BigEndian>,
}

impl NfGenMsg {
    pub const LEN: usize = 4;

    #[inline]
    pub fn family(&self) -> Family {
        Family(self.family)
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn res_id(&self) -> u16 {
        self.res_id.get()
    }
}

/// Connection status bits, a big-endian u32 on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status(pub u32);

impl Status {
    pub const EXPECTED: u32 = 1 << 0;
    pub const SEEN_REPLY: u32 = 1 << 1;
    pub const ASSURED: u32 = 1 << 2;
    pub const CONFIRMED: u32 = 1 << 3;
    pub const SRC_NAT: u32 = 1 << 4;
    pub const DST_NAT: u32 = 1 << 5;
    pub const SEQ_ADJUST: u32 = 1 << 6;
    pub const SRC_NAT_DONE: u32 = 1 << 7;
    pub const DST_NAT_DONE: u32 = 1 << 8;
    pub const DYING: u32 = 1 << 9;
    pub const FIXED_TIMEOUT: u32 = 1 << 10;
    pub const TEMPLATE: u32 = 1 << 11;
    pub const UNTRACKED: u32 = 1 << 12;
    pub const HELPER: u32 = 1 << 13;
    pub const OFFLOAD: u32 = 1 << 14;
    pub const HW_OFFLOAD: u32 = 1 << 15;

    const NAMES: [(u32, &'static str); 16] = [
        (Self::EXPECTED, "expected"),
        (Self::SEEN_REPLY, "seen-reply"),
        (Self::ASSURED, "assured"),
        (Self::CONFIRMED, "confirmed"),
        (Self::SRC_NAT, "src-nat"),
        (Self::DST_NAT, "dst-nat"),
        (Self::SEQ_ADJUST, "seq-adjust"),
        (Self::SRC_NAT_DONE, "src-nat-done"),
        (Self::DST_NAT_DONE, "dst-nat-done"),
        (Self::DYING, "dying"),
        (Self::FIXED_TIMEOUT, "fixed-timeout"),
        (Self::TEMPLATE, "template"),
        (Self::UNTRACKED, "untracked"),
        (Self::HELPER, "helper"),
        (Self::OFFLOAD, "offload"),
        (Self::HW_OFFLOAD, "hw-offload"),
    ];

    /// Check if the given status bits are set
    #[inline]
    pub fn has(&self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    /// Check if the connection was expected by a helper
    #[inline]
    pub fn is_expected(&self) -> bool {
        self.has(Self::EXPECTED)
    }

    /// Check if traffic was seen in the reply direction
    #[inline]
    pub fn is_seen_reply(&self) -> bool {
        self.has(Self::SEEN_REPLY)
    }

    /// Check if the connection is assured
    #[inline]
    pub fn is_assured(&self) -> bool {
        self.has(Self::ASSURED)
    }

    /// Check if the connection is confirmed
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.has(Self::CONFIRMED)
    }

    /// Check if the connection has source NAT applied
    #[inline]
    pub fn is_src_nat(&self) -> bool {
        self.has(Self::SRC_NAT)
    }

    /// Check if the connection has destination NAT applied
    #[inline]
    pub fn is_dst_nat(&self) -> bool {
        self.has(Self::DST_NAT)
    }

    /// Check if the connection is being torn down
    #[inline]
    pub fn is_dying(&self) -> bool {
        self.has(Self::DYING)
    }

    /// Check if the connection bypasses tracking
    #[inline]
    pub fn is_untracked(&self) -> bool {
        self.has(Self::UNTRACKED)
    }

    /// Check if the flow is offloaded, in software or hardware
    #[inline]
    pub fn is_offloaded(&self) -> bool {
        self.has(Self::OFFLOAD | Self::HW_OFFLOAD)
    }

    /// Returns a string representation of active status bits
    pub fn flags_string(&self) -> SmolStr {
        let mut result = SmolStrBuilder::new();
        let mut first = true;
        for (bit, name) in Self::NAMES {
            if self.0 & bit != 0 {
                if !first {
                    result.push(',');
                }
                result.push_str(name);
                first = false;
            }
        }
        if first {
            result.push_str("none");
        }
        result.finish()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flags_string())
    }
}

/// Errors from decoding a whole conntrack payload.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error(transparent)]
    Attr(#[from] AttrError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// One conntrack event or dump entry.
///
/// Every field except `family` is optional; which attributes the kernel
/// sends depends on the message type and the tracked protocol.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtRecord {
    pub family: Family,
    pub original: Option<Tuple>,
    pub reply: Option<Tuple>,
    pub status: Option<Status>,
    /// Remaining lifetime in seconds.
    pub timeout: Option<u32>,
    pub mark: Option<u32>,
    pub use_count: Option<u32>,
    pub id: Option<u32>,
    pub zone: Option<u16>,
    pub start: Option<Timestamp>,
    pub stop: Option<Timestamp>,
}

impl CtRecord {
    /// Decodes a record from a full conntrack payload: nfgenmsg header
    /// plus attribute stream.
    pub fn from_payload(payload: &[u8]) -> Result<Self, RecordError> {
        let (header, rest) = Ref::<_, NfGenMsg>::from_prefix(payload)
            .map_err(|_| AttrError::TooShort("nfgenmsg"))?;
        let header = Ref::into_ref(header);
        let attrs = Attr::read_all(rest)?;
        Ok(Self::from_attrs(header.family(), &attrs)?)
    }

    /// Decodes a record from an already-parsed attribute stream.
    ///
    /// Tuple attributes decode strictly and fail the whole record;
    /// anything else this crate does not understand is skipped.
    pub fn from_attrs(family: Family, attrs: &[Attr]) -> Result<Self, DecodeError> {
        let mut record = CtRecord {
            family,
            ..CtRecord::default()
        };
        for attr in attrs {
            match RecordType::from(attr.atype()) {
                RecordType::TUPLE_ORIG => {
                    record.original = Some(
                        Tuple::from_attr(attr, TupleDirection::ORIGINAL)
                            .map_err(|e| e.wrap(OP_RECORD))?,
                    );
                }
                RecordType::TUPLE_REPLY => {
                    record.reply = Some(
                        Tuple::from_attr(attr, TupleDirection::REPLY)
                            .map_err(|e| e.wrap(OP_RECORD))?,
                    );
                }
                RecordType::STATUS => record.status = Some(Status(leaf_u32(attr, OP_RECORD)?)),
                RecordType::TIMEOUT => record.timeout = Some(leaf_u32(attr, OP_RECORD)?),
                RecordType::MARK => record.mark = Some(leaf_u32(attr, OP_RECORD)?),
                RecordType::USE => record.use_count = Some(leaf_u32(attr, OP_RECORD)?),
                RecordType::ID => record.id = Some(leaf_u32(attr, OP_RECORD)?),
                RecordType::ZONE => record.zone = Some(leaf_u16(attr, OP_RECORD)?),
                RecordType::TIMESTAMP => record.decode_timestamps(attr)?,
                other => trace!(code = other.0, "skipping conntrack attribute"),
            }
        }
        Ok(record)
    }

    fn decode_timestamps(&mut self, attr: &Attr) -> Result<(), DecodeError> {
        let Some(children) = attr.children() else {
            return Err(DecodeError::new(DecodeErrorKind::NotNested, OP_RECORD));
        };
        for child in children {
            match TimestampType::from(child.atype()) {
                TimestampType::START => {
                    self.start = Some(Timestamp::from_nanos(leaf_u64(child, OP_RECORD)?));
                }
                TimestampType::STOP => {
                    self.stop = Some(Timestamp::from_nanos(leaf_u64(child, OP_RECORD)?));
                }
                other => trace!(code = other.0, "skipping timestamp attribute"),
            }
        }
        Ok(())
    }

    /// Time between flow start and stop, when both timestamps are
    /// present. Stop arrives only on destroy events.
    pub fn lifetime(&self) -> Option<Interval> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => Some(stop - start),
            _ => None,
        }
    }
}

impl fmt::Display for CtRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.family)?;
        if let Some(timeout) = self.timeout {
            write!(f, " timeout={timeout}")?;
        }
        if let Some(tuple) = &self.original {
            write!(f, " {tuple}")?;
        }
        if let Some(status) = self.status {
            if !status.is_seen_reply() {
                f.write_str(" [UNREPLIED]")?;
            }
        }
        if let Some(tuple) = &self.reply {
            write!(f, " {tuple}")?;
        }
        if let Some(status) = self.status {
            if status.is_assured() {
                f.write_str(" [ASSURED]")?;
            }
        }
        if let Some(mark) = self.mark {
            write!(f, " mark={mark}")?;
        }
        if let Some(use_count) = self.use_count {
            write!(f, " use={use_count}")?;
        }
        if let Some(id) = self.id {
            write!(f, " id={id}")?;
        }
        Ok(())
    }
}
