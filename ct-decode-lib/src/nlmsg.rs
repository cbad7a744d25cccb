//! Netlink message framing
//!
//! An nlmon capture frame is a stream of netlink messages, each a 16-byte
//! header followed by a payload, padded to 4-byte alignment:
//!
//! ```text
//!  0               4       6       8               12
//! +---------------+-------+-------+---------------+---------------+
//! | length        | type  | flags | sequence      | port id       |
//! +---------------+-------+-------+---------------+---------------+
//! | payload ...                                                   |
//! +---------------------------------------------------------------+
//! ```
//!
//! Header fields are host-endian; this reader assumes captures from
//! little-endian hosts. The message type encodes the netfilter subsystem
//! in its high byte and the message within the subsystem in its low byte.
//!
//! # Examples
//!
//! ```
//! use ct_decode::nlmsg::{EventKind, NlMsgIter};
//!
//! let frame = [
//!     20, 0, 0, 0, // length 20
//!     0, 1, // type: conntrack subsystem, new
//!     0x00, 0x06, // flags: NLM_F_CREATE | NLM_F_EXCL
//!     1, 0, 0, 0, // sequence
//!     0, 0, 0, 0, // port id
//!     2, 0, 0, 0, // payload: nfgenmsg
//! ];
//!
//! let msg = NlMsgIter::new(&frame).next().unwrap()?;
//! assert!(msg.header.is_conntrack());
//! assert_eq!(msg.kind(), EventKind::New);
//! assert_eq!(msg.payload.len(), 4);
//! # Ok::<(), ct_decode::nlmsg::FrameError>(())
//! ```

use std::fmt;

use thiserror::Error;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Ref, Unaligned};

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = 16;

/// Message types below this value are netlink control messages.
pub const NLMSG_MIN_TYPE: u16 = 0x10;

/// Netfilter subsystem id for conntrack.
pub const NFNL_SUBSYS_CTNETLINK: u8 = 1;

/// Conntrack message within the subsystem: new or updated entry.
pub const IPCTNL_MSG_CT_NEW: u8 = 0;

/// Conntrack message within the subsystem: entry destroyed.
pub const IPCTNL_MSG_CT_DELETE: u8 = 2;

pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

/// Errors from walking a netlink message stream.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("buffer too short for {0}")]
    TooShort(&'static str),

    #[error("netlink message length {0} shorter than its header")]
    BadLength(usize),

    #[error("netlink message length {0} exceeds the remaining buffer")]
    Overrun(usize),
}

/// The netlink message header.
#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct NlMsgHdr {
    len: U32<LittleEndian>,
    msg_type: U16<LittleEndian>,
    flags: U16<LittleEndian>,
    seq: U32<LittleEndian>,
    pid: U32<LittleEndian>,
}

impl NlMsgHdr {
    /// Total message length including this header.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        (self.len() as usize) <= NLMSG_HDRLEN
    }

    #[inline]
    pub fn msg_type(&self) -> u16 {
        self.msg_type.get()
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags.get()
    }

    #[inline]
    pub fn seq(&self) -> u32 {
        self.seq.get()
    }

    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid.get()
    }

    /// Netfilter subsystem, the high byte of the message type.
    #[inline]
    pub fn subsystem(&self) -> u8 {
        (self.msg_type() >> 8) as u8
    }

    /// Message within the subsystem, the low byte of the message type.
    #[inline]
    pub fn message(&self) -> u8 {
        (self.msg_type() & 0xff) as u8
    }

    /// Check if this is a netlink control message (done, error, noop)
    #[inline]
    pub fn is_control(&self) -> bool {
        self.msg_type() < NLMSG_MIN_TYPE
    }

    /// Check if this message belongs to the conntrack subsystem
    #[inline]
    pub fn is_conntrack(&self) -> bool {
        !self.is_control() && self.subsystem() == NFNL_SUBSYS_CTNETLINK
    }
}

/// What a conntrack message means for the tracked flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    New,
    Update,
    Destroy,
    Other(u8),
}

impl EventKind {
    /// Classifies a conntrack message from its type and header flags.
    /// The kernel reuses `IPCTNL_MSG_CT_NEW` for updates; only the
    /// create flags tell a fresh flow apart.
    pub fn classify(message: u8, flags: u16) -> Self {
        match message {
            IPCTNL_MSG_CT_NEW => {
                if flags & (NLM_F_CREATE | NLM_F_EXCL) != 0 {
                    EventKind::New
                } else {
                    EventKind::Update
                }
            }
            IPCTNL_MSG_CT_DELETE => EventKind::Destroy,
            other => EventKind::Other(other),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::New => f.write_str("NEW"),
            EventKind::Update => f.write_str("UPDATE"),
            EventKind::Destroy => f.write_str("DESTROY"),
            EventKind::Other(t) => write!(f, "TYPE-{t}"),
        }
    }
}

/// One netlink message borrowed from a frame.
#[derive(Debug)]
pub struct NlMsg<'a> {
    pub header: &'a NlMsgHdr,
    pub payload: &'a [u8],
}

impl NlMsg<'_> {
    #[inline]
    pub fn kind(&self) -> EventKind {
        EventKind::classify(self.header.message(), self.header.flags())
    }
}

/// Iterator over the netlink messages in a frame.
///
/// Stops at the first malformed header; a bad length makes everything
/// after it unreliable.
pub struct NlMsgIter<'a> {
    buf: &'a [u8],
    done: bool,
}

impl<'a> NlMsgIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, done: false }
    }
}

impl<'a> Iterator for NlMsgIter<'a> {
    type Item = Result<NlMsg<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.buf.is_empty() {
            return None;
        }
        let Ok((header, rest)) = Ref::<_, NlMsgHdr>::from_prefix(self.buf) else {
            self.done = true;
            return Some(Err(FrameError::TooShort("nlmsghdr")));
        };
        let header = Ref::into_ref(header);

        let msg_len = header.len() as usize;
        if msg_len < NLMSG_HDRLEN {
            self.done = true;
            return Some(Err(FrameError::BadLength(msg_len)));
        }
        if msg_len > self.buf.len() {
            self.done = true;
            return Some(Err(FrameError::Overrun(msg_len)));
        }

        let payload = &rest[..msg_len - NLMSG_HDRLEN];
        let advance = ((msg_len + 3) & !3).min(self.buf.len());
        self.buf = &self.buf[advance..];
        Some(Ok(NlMsg { header, payload }))
    }
}
