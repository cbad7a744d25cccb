//! Decoding of conntrack netlink captures
//!
//! This crate turns the attribute trees found in conntrack netlink
//! messages into typed flow tuples and records. It never touches a
//! netlink socket; input is raw bytes, from an nlmon capture file or
//! anywhere else.
//!
//! Decoding is layered:
//!
//! * [`nlmsg`] frames a byte stream into netlink messages
//! * [`attr`] reads a message payload into a tree of [`attr::Attr`]
//! * [`decode`] interprets those trees as flow tuples and records
//!
//! # Examples
//!
//! ```
//! use ct_decode::attr::Attr;
//! use ct_decode::decode::codes::TupleDirection;
//! use ct_decode::decode::tuple::Tuple;
//!
//! // Original-direction tuple of a DNS lookup: 10.0.0.1 -> 10.0.0.53.
//! let attr = Attr::nested(1, vec![
//!     Attr::nested(1, vec![
//!         Attr::leaf(1, &[10, 0, 0, 1]),
//!         Attr::leaf(2, &[10, 0, 0, 53]),
//!     ]),
//!     Attr::nested(2, vec![
//!         Attr::leaf(1, &[17]),
//!         Attr::leaf(2, &[0xd8, 0x3d]),
//!         Attr::leaf(3, &[0x00, 0x35]),
//!     ]),
//! ]);
//!
//! let tuple = Tuple::from_attr(&attr, TupleDirection::ORIGINAL)?;
//! assert!(tuple.is_filled());
//! assert_eq!(
//!     tuple.to_string(),
//!     "src=10.0.0.1 dst=10.0.0.53 proto=udp sport=55357 dport=53",
//! );
//! # Ok::<(), ct_decode::decode::DecodeError>(())
//! ```

pub mod attr;
pub mod decode;
mod macros;
pub mod nlmsg;
pub mod timestamp;
