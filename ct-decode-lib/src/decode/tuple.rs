//! Flow tuple decoding
//!
//! A conntrack tuple arrives as a three-level attribute tree. The root
//! carries the direction code, its children the address, transport and
//! zone legs:
//!
//! ```text
//! TUPLE_ORIG (1) / TUPLE_REPLY (2)
//! ├── IP (1)
//! │   ├── V4_SRC (1) or V6_SRC (3)
//! │   └── V4_DST (2) or V6_DST (4)
//! ├── PROTO (2)
//! │   ├── NUM (1)
//! │   ├── SRC_PORT (2) / DST_PORT (3)
//! │   └── ICMP_ID/TYPE/CODE (4..9)
//! └── ZONE (3)
//! ```
//!
//! Decoding is pure: each decoder takes an [`Attr`] and returns a value
//! or a [`DecodeError`] whose trail names the decoders it passed through.
//!
//! # Examples
//!
//! ```
//! use ct_decode::attr::Attr;
//! use ct_decode::decode::codes::TupleDirection;
//! use ct_decode::decode::tuple::Tuple;
//!
//! let attr = Attr::nested(1, vec![
//!     Attr::nested(1, vec![
//!         Attr::leaf(1, &[1, 2, 3, 4]),
//!         Attr::leaf(2, &[4, 3, 2, 1]),
//!     ]),
//!     Attr::nested(2, vec![
//!         Attr::leaf(1, &[17]),
//!         Attr::leaf(2, &[0x00, 0x35]),
//!         Attr::leaf(3, &[0xa6, 0x44]),
//!     ]),
//! ]);
//!
//! let tuple = Tuple::from_attr(&attr, TupleDirection::ORIGINAL)?;
//! assert!(tuple.is_filled());
//! assert_eq!(
//!     tuple.to_string(),
//!     "src=1.2.3.4 dst=4.3.2.1 proto=udp sport=53 dport=42564",
//! );
//! # Ok::<(), ct_decode::decode::DecodeError>(())
//! ```

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::attr::Attr;
use crate::decode::codes::{IpTupleType, Protocol, ProtoTupleType, TupleDirection, TupleType};
use crate::decode::{leaf_addr16, leaf_addr4, leaf_u16, leaf_u8, DecodeError, DecodeErrorKind};

const OP_TUPLE: &str = "decode tuple";
const OP_IP: &str = "decode ip tuple";
const OP_PROTO: &str = "decode proto tuple";

/// Address leg of a tuple. Both endpoints are always the same family on
/// the wire; a half-set pair is rejected during decoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpTuple {
    pub src_addr: Option<IpAddr>,
    pub dst_addr: Option<IpAddr>,
}

impl IpTuple {
    /// Decodes an IP tuple from a nested attribute of type [`TupleType::IP`].
    ///
    /// The attribute must carry exactly two children, one source and one
    /// destination address of either family.
    pub fn from_attr(attr: &Attr) -> Result<Self, DecodeError> {
        if TupleType::from(attr.atype()) != TupleType::IP {
            return Err(DecodeError::new(
                DecodeErrorKind::WrongType {
                    expected: TupleType::IP.0,
                    actual: attr.atype(),
                },
                OP_IP,
            ));
        }
        let Some(children) = attr.children() else {
            return Err(DecodeError::new(DecodeErrorKind::NotNested, OP_IP));
        };
        if children.len() != 2 {
            return Err(DecodeError::new(DecodeErrorKind::NeedChildren(2), OP_IP));
        }

        let mut ip = IpTuple::default();
        for child in children {
            match IpTupleType::from(child.atype()) {
                IpTupleType::V4_SRC => ip.src_addr = Some(IpAddr::V4(leaf_addr4(child, OP_IP)?)),
                IpTupleType::V4_DST => ip.dst_addr = Some(IpAddr::V4(leaf_addr4(child, OP_IP)?)),
                IpTupleType::V6_SRC => ip.src_addr = Some(IpAddr::V6(leaf_addr16(child, OP_IP)?)),
                IpTupleType::V6_DST => ip.dst_addr = Some(IpAddr::V6(leaf_addr16(child, OP_IP)?)),
                other => {
                    return Err(DecodeError::new(
                        DecodeErrorKind::UnknownChildType {
                            code: other.0,
                            context: "ip tuple",
                        },
                        OP_IP,
                    ))
                }
            }
        }
        // Two children of the same side (src twice) leave the other
        // side unset and are as malformed as a missing child.
        if ip.src_addr.is_none() || ip.dst_addr.is_none() {
            return Err(DecodeError::new(DecodeErrorKind::NeedChildren(2), OP_IP));
        }
        Ok(ip)
    }

    /// Reports whether both endpoints were decoded.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.src_addr.is_some() && self.dst_addr.is_some()
    }
}

fn fmt_addr(f: &mut fmt::Formatter<'_>, label: &str, addr: Option<IpAddr>) -> fmt::Result {
    match addr {
        Some(addr) => write!(f, "{label}={addr}"),
        None => write!(f, "{label}=-"),
    }
}

impl fmt::Display for IpTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_addr(f, "src", self.src_addr)?;
        f.write_str(" ")?;
        fmt_addr(f, "dst", self.dst_addr)
    }
}

/// Transport leg of a tuple.
///
/// Ports and ICMP fields overlap in meaning, so the ICMP family flags
/// record which interpretation the wire actually carried.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtoTuple {
    pub protocol: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
    /// Set when any ICMPv4 child attribute was present.
    pub icmp_v4: bool,
    /// Set when any ICMPv6 child attribute was present.
    pub icmp_v6: bool,
    pub icmp_id: u16,
    pub icmp_type: u8,
    pub icmp_code: u8,
}

impl ProtoTuple {
    /// Decodes a proto tuple from a nested attribute of type
    /// [`TupleType::PROTO`]. At least one child is required; the kernel
    /// sends the protocol number alone for unported protocols.
    pub fn from_attr(attr: &Attr) -> Result<Self, DecodeError> {
        if TupleType::from(attr.atype()) != TupleType::PROTO {
            return Err(DecodeError::new(
                DecodeErrorKind::WrongType {
                    expected: TupleType::PROTO.0,
                    actual: attr.atype(),
                },
                OP_PROTO,
            ));
        }
        let Some(children) = attr.children() else {
            return Err(DecodeError::new(DecodeErrorKind::NotNested, OP_PROTO));
        };
        if children.is_empty() {
            return Err(DecodeError::new(DecodeErrorKind::NeedSingleChild, OP_PROTO));
        }

        let mut proto = ProtoTuple::default();
        for child in children {
            match ProtoTupleType::from(child.atype()) {
                ProtoTupleType::NUM => proto.protocol = Protocol(leaf_u8(child, OP_PROTO)?),
                ProtoTupleType::SRC_PORT => proto.src_port = leaf_u16(child, OP_PROTO)?,
                ProtoTupleType::DST_PORT => proto.dst_port = leaf_u16(child, OP_PROTO)?,
                ProtoTupleType::ICMP_ID => {
                    proto.icmp_v4 = true;
                    proto.icmp_id = leaf_u16(child, OP_PROTO)?;
                }
                ProtoTupleType::ICMP_TYPE => {
                    proto.icmp_v4 = true;
                    proto.icmp_type = leaf_u8(child, OP_PROTO)?;
                }
                ProtoTupleType::ICMP_CODE => {
                    proto.icmp_v4 = true;
                    proto.icmp_code = leaf_u8(child, OP_PROTO)?;
                }
                ProtoTupleType::ICMPV6_ID => {
                    proto.icmp_v6 = true;
                    proto.icmp_id = leaf_u16(child, OP_PROTO)?;
                }
                ProtoTupleType::ICMPV6_TYPE => {
                    proto.icmp_v6 = true;
                    proto.icmp_type = leaf_u8(child, OP_PROTO)?;
                }
                ProtoTupleType::ICMPV6_CODE => {
                    proto.icmp_v6 = true;
                    proto.icmp_code = leaf_u8(child, OP_PROTO)?;
                }
                other => {
                    return Err(DecodeError::new(
                        DecodeErrorKind::UnknownChildType {
                            code: other.0,
                            context: "proto tuple",
                        },
                        OP_PROTO,
                    ))
                }
            }
        }
        Ok(proto)
    }

    /// Reports whether a protocol number was decoded.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.protocol.0 != 0
    }
}

impl fmt::Display for ProtoTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proto={}", self.protocol)?;
        if self.icmp_v4 || self.icmp_v6 {
            write!(
                f,
                " type={} code={} id={}",
                self.icmp_type, self.icmp_code, self.icmp_id
            )
        } else {
            write!(f, " sport={} dport={}", self.src_port, self.dst_port)
        }
    }
}

/// One direction of a tracked connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub ip: IpTuple,
    pub proto: ProtoTuple,
    /// Conntrack zone, 0 unless zones are in use.
    pub zone: u16,
}

impl Tuple {
    /// Decodes a tuple from a nested attribute whose type must match
    /// `direction`. Unknown child types are an error here; the closed
    /// child table is what makes a tuple a tuple.
    pub fn from_attr(attr: &Attr, direction: TupleDirection) -> Result<Self, DecodeError> {
        if attr.atype() != direction.0 {
            return Err(DecodeError::new(
                DecodeErrorKind::WrongType {
                    expected: direction.0,
                    actual: attr.atype(),
                },
                OP_TUPLE,
            ));
        }
        let Some(children) = attr.children() else {
            return Err(DecodeError::new(DecodeErrorKind::NotNested, OP_TUPLE));
        };
        if children.len() < 2 {
            return Err(DecodeError::new(DecodeErrorKind::NeedChildren(2), OP_TUPLE));
        }

        let mut tuple = Tuple::default();
        for child in children {
            match TupleType::from(child.atype()) {
                TupleType::IP => {
                    tuple.ip = IpTuple::from_attr(child).map_err(|e| e.wrap(OP_TUPLE))?;
                }
                TupleType::PROTO => {
                    tuple.proto = ProtoTuple::from_attr(child).map_err(|e| e.wrap(OP_TUPLE))?;
                }
                TupleType::ZONE => tuple.zone = leaf_u16(child, OP_TUPLE)?,
                other => {
                    return Err(DecodeError::new(
                        DecodeErrorKind::UnknownChildType {
                            code: other.0,
                            context: "tuple",
                        },
                        OP_TUPLE,
                    ))
                }
            }
        }
        Ok(tuple)
    }

    /// Reports whether both the address and transport legs were decoded.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.ip.is_filled() && self.proto.is_filled()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ip, self.proto)?;
        if self.zone != 0 {
            write!(f, " zone={}", self.zone)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    fn nla(atype: u16, payload: &[u8]) -> Vec<u8> {
        let total = 4 + payload.len();
        let mut out = Vec::with_capacity((total + 3) & !3);
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&atype.to_le_bytes());
        out.extend_from_slice(payload);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        out
    }

    fn nla_nested(atype: u16, children: &[Vec<u8>]) -> Vec<u8> {
        let payload: Vec<u8> = children.concat();
        let total = 4 + payload.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&(atype | 0x8000).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
    }

    #[test]
    fn test_ip_tuple_v4() {
        let attr = Attr::nested(
            1,
            vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
        );
        let ip = IpTuple::from_attr(&attr).unwrap();
        assert_eq!(ip.src_addr, v4(1, 2, 3, 4));
        assert_eq!(ip.dst_addr, v4(4, 3, 2, 1));
        assert!(ip.is_filled());
    }

    #[test]
    fn test_ip_tuple_v6() {
        let localhost = Ipv6Addr::LOCALHOST.octets();
        let attr = Attr::nested(
            1,
            vec![Attr::leaf(3, &localhost), Attr::leaf(4, &localhost)],
        );
        let ip = IpTuple::from_attr(&attr).unwrap();
        assert_eq!(ip.src_addr, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(ip.dst_addr, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn test_ip_tuple_wrong_type_before_nested_check() {
        // A flat attribute with the wrong type reports the type, not
        // the missing nesting.
        let err = IpTuple::from_attr(&Attr::leaf(3, &[])).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::WrongType {
                expected: 1,
                actual: 3
            }
        );
    }

    #[test]
    fn test_ip_tuple_not_nested() {
        let err = IpTuple::from_attr(&Attr::leaf(1, &[1, 2, 3, 4])).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NotNested);
        assert_eq!(err.to_string(), "decode ip tuple: attribute is not nested");
    }

    #[test]
    fn test_ip_tuple_child_count() {
        let one = Attr::nested(1, vec![Attr::leaf(1, &[1, 2, 3, 4])]);
        let err = IpTuple::from_attr(&one).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NeedChildren(2));

        let three = Attr::nested(
            1,
            vec![
                Attr::leaf(1, &[1, 2, 3, 4]),
                Attr::leaf(2, &[4, 3, 2, 1]),
                Attr::leaf(2, &[4, 3, 2, 1]),
            ],
        );
        let err = IpTuple::from_attr(&three).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NeedChildren(2));
    }

    #[test]
    fn test_ip_tuple_duplicate_side() {
        // Two sources, no destination. The pair is incomplete even
        // though the child count is right.
        let attr = Attr::nested(
            1,
            vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(1, &[4, 3, 2, 1])],
        );
        let err = IpTuple::from_attr(&attr).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NeedChildren(2));
    }

    #[test]
    fn test_ip_tuple_unknown_child() {
        let attr = Attr::nested(
            1,
            vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(5, &[4, 3, 2, 1])],
        );
        let err = IpTuple::from_attr(&attr).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownChildType {
                code: 5,
                context: "ip tuple"
            }
        );
    }

    #[test]
    fn test_ip_tuple_bad_address_length() {
        let attr = Attr::nested(
            1,
            vec![
                Attr::leaf(1, &[1, 2, 3, 4, 5]),
                Attr::leaf(2, &[4, 3, 2, 1]),
            ],
        );
        let err = IpTuple::from_attr(&attr).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::IncorrectSize {
                expected: 4,
                actual: 5
            }
        );

        let attr = Attr::nested(
            1,
            vec![Attr::leaf(3, &[1, 2, 3, 4]), Attr::leaf(4, &[4, 3, 2, 1])],
        );
        let err = IpTuple::from_attr(&attr).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::IncorrectSize {
                expected: 16,
                actual: 4
            }
        );
    }

    #[test]
    fn test_proto_tuple_ports() {
        let attr = Attr::nested(
            2,
            vec![
                Attr::leaf(1, &[6]),
                Attr::leaf(2, &[0x80, 0x0c]),
                Attr::leaf(3, &[0x00, 0x50]),
            ],
        );
        let proto = ProtoTuple::from_attr(&attr).unwrap();
        assert_eq!(proto.protocol, Protocol::TCP);
        assert_eq!(proto.src_port, 32780);
        assert_eq!(proto.dst_port, 80);
        assert!(!proto.icmp_v4);
        assert!(!proto.icmp_v6);
        assert!(proto.is_filled());
    }

    #[test]
    fn test_proto_tuple_wrong_type() {
        let err = ProtoTuple::from_attr(&Attr::leaf(1, &[])).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::WrongType {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_proto_tuple_not_nested() {
        let err = ProtoTuple::from_attr(&Attr::leaf(2, &[6])).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NotNested);
    }

    #[test]
    fn test_proto_tuple_needs_child() {
        let err = ProtoTuple::from_attr(&Attr::nested(2, vec![])).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NeedSingleChild);
        assert_eq!(
            err.to_string(),
            "decode proto tuple: need at least one child attribute"
        );
    }

    #[test]
    fn test_proto_tuple_num_only() {
        // GRE and friends come with the protocol number alone.
        let attr = Attr::nested(2, vec![Attr::leaf(1, &[47])]);
        let proto = ProtoTuple::from_attr(&attr).unwrap();
        assert_eq!(proto.protocol, Protocol::GRE);
        assert_eq!(proto.src_port, 0);
        assert_eq!(proto.dst_port, 0);
        assert!(proto.is_filled());
    }

    #[test]
    fn test_proto_tuple_icmp() {
        let attr = Attr::nested(
            2,
            vec![
                Attr::leaf(1, &[1]),
                Attr::leaf(4, &[0x04, 0xd2]),
                Attr::leaf(5, &[8]),
                Attr::leaf(6, &[0]),
            ],
        );
        let proto = ProtoTuple::from_attr(&attr).unwrap();
        assert_eq!(proto.protocol, Protocol::ICMP);
        assert!(proto.icmp_v4);
        assert!(!proto.icmp_v6);
        assert_eq!(proto.icmp_id, 1234);
        assert_eq!(proto.icmp_type, 8);
        assert_eq!(proto.icmp_code, 0);
    }

    #[test]
    fn test_proto_tuple_icmpv6() {
        let attr = Attr::nested(
            2,
            vec![
                Attr::leaf(1, &[58]),
                Attr::leaf(7, &[0x00, 0x01]),
                Attr::leaf(8, &[128]),
                Attr::leaf(9, &[0]),
            ],
        );
        let proto = ProtoTuple::from_attr(&attr).unwrap();
        assert_eq!(proto.protocol, Protocol::ICMPV6);
        assert!(proto.icmp_v6);
        assert!(!proto.icmp_v4);
        assert_eq!(proto.icmp_id, 1);
        assert_eq!(proto.icmp_type, 128);
    }

    #[test]
    fn test_proto_tuple_unknown_child() {
        let attr = Attr::nested(2, vec![Attr::leaf(10, &[0, 0])]);
        let err = ProtoTuple::from_attr(&attr).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownChildType {
                code: 10,
                context: "proto tuple"
            }
        );
    }

    #[test]
    fn test_proto_tuple_bad_port_length() {
        let attr = Attr::nested(2, vec![Attr::leaf(2, &[0x50])]);
        let err = ProtoTuple::from_attr(&attr).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::IncorrectSize {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_proto_tuple_duplicate_port() {
        // A repeated known child is not an error; the last value wins.
        let attr = Attr::nested(
            2,
            vec![
                Attr::leaf(1, &[17]),
                Attr::leaf(3, &[0x00, 0x35]),
                Attr::leaf(3, &[0x00, 0x50]),
            ],
        );
        let proto = ProtoTuple::from_attr(&attr).unwrap();
        assert_eq!(proto.dst_port, 80);
    }

    #[test]
    fn test_tuple_direction_mismatch() {
        let attr = Attr::nested(1, vec![Attr::leaf(1, &[]), Attr::leaf(2, &[])]);
        let err = Tuple::from_attr(&attr, TupleDirection::REPLY).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::WrongType {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_tuple_not_nested() {
        let err = Tuple::from_attr(&Attr::leaf(1, &[]), TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NotNested);
    }

    #[test]
    fn test_tuple_needs_two_children() {
        let attr = Attr::nested(1, vec![Attr::leaf(3, &[0, 1])]);
        let err = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NeedChildren(2));
    }

    #[test]
    fn test_tuple_unknown_child() {
        let attr = Attr::nested(1, vec![Attr::leaf(4, &[]), Attr::leaf(5, &[])]);
        let err = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownChildType {
                code: 4,
                context: "tuple"
            }
        );
        assert_eq!(err.to_string(), "decode tuple: unknown child type 4 in tuple");
    }

    #[test]
    fn test_tuple_zone_bad_length() {
        let attr = Attr::nested(
            1,
            vec![
                Attr::nested(
                    1,
                    vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
                ),
                Attr::leaf(3, &[0, 0, 0, 1]),
            ],
        );
        let err = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::IncorrectSize {
                expected: 2,
                actual: 4
            }
        );
    }

    #[test]
    fn test_tuple_error_trail() {
        // The inner decoder's error surfaces with the outer operation
        // prepended.
        let attr = Attr::nested(1, vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(3, &[0, 0])]);
        let err = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::NotNested);
        let trail: Vec<_> = err.trail().collect();
        assert_eq!(trail, ["decode tuple", "decode ip tuple"]);
        assert_eq!(
            err.to_string(),
            "decode tuple: decode ip tuple: attribute is not nested"
        );
    }

    #[test]
    fn test_tuple_proto_error_trail() {
        let attr = Attr::nested(
            1,
            vec![
                Attr::nested(
                    1,
                    vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
                ),
                Attr::nested(2, vec![Attr::leaf(1, &[0, 6])]),
            ],
        );
        let err = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::IncorrectSize {
                expected: 1,
                actual: 2
            }
        );
        let trail: Vec<_> = err.trail().collect();
        assert_eq!(trail, ["decode tuple", "decode proto tuple"]);
    }

    #[test]
    fn test_tuple_without_proto() {
        // IP plus zone satisfies the child count but leaves the tuple
        // unfilled.
        let attr = Attr::nested(
            1,
            vec![
                Attr::nested(
                    1,
                    vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
                ),
                Attr::leaf(3, &[0, 5]),
            ],
        );
        let tuple = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap();
        assert_eq!(tuple.zone, 5);
        assert!(!tuple.is_filled());
    }

    #[test]
    fn test_tuple_duplicate_zone() {
        let attr = Attr::nested(
            1,
            vec![
                Attr::nested(
                    1,
                    vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
                ),
                Attr::leaf(3, &[0x00, 0x05]),
                Attr::leaf(3, &[0x00, 0x7b]),
            ],
        );
        let tuple = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap();
        assert_eq!(tuple.zone, 123);
    }

    #[test]
    fn test_tuple_filled() {
        assert!(!Tuple::default().is_filled());

        let mut tuple = Tuple::default();
        tuple.ip.src_addr = v4(1, 2, 3, 4);
        tuple.proto.protocol = Protocol::UDP;
        assert!(!tuple.is_filled());

        tuple.ip.dst_addr = v4(4, 3, 2, 1);
        assert!(tuple.is_filled());

        tuple.proto.protocol = Protocol(0);
        assert!(!tuple.is_filled());
    }

    #[test]
    fn test_tuple_end_to_end() {
        let localhost = Ipv6Addr::LOCALHOST.octets();
        let ip = nla_nested(1, &[nla(3, &localhost), nla(4, &localhost)]);
        let proto = nla_nested(
            2,
            &[nla(1, &[6]), nla(2, &[0x80, 0x0c]), nla(3, &[0x00, 0x50])],
        );
        let zone = nla(3, &[0x00, 0x7b]);
        let root = nla_nested(1, &[ip, proto, zone]);

        let attrs = Attr::read_all(&root).unwrap();
        assert_eq!(attrs.len(), 1);

        let tuple = Tuple::from_attr(&attrs[0], TupleDirection::ORIGINAL).unwrap();
        assert_eq!(tuple.ip.src_addr, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(tuple.ip.dst_addr, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(tuple.proto.protocol, Protocol::TCP);
        assert_eq!(tuple.proto.src_port, 32780);
        assert_eq!(tuple.proto.dst_port, 80);
        assert_eq!(tuple.zone, 123);
        assert!(tuple.is_filled());
        assert_eq!(
            tuple.to_string(),
            "src=::1 dst=::1 proto=tcp sport=32780 dport=80 zone=123"
        );
    }

    #[test]
    fn test_tuple_display_icmp() {
        let attr = Attr::nested(
            1,
            vec![
                Attr::nested(
                    1,
                    vec![Attr::leaf(1, &[1, 2, 3, 4]), Attr::leaf(2, &[4, 3, 2, 1])],
                ),
                Attr::nested(
                    2,
                    vec![
                        Attr::leaf(1, &[1]),
                        Attr::leaf(4, &[0x04, 0xd2]),
                        Attr::leaf(5, &[8]),
                        Attr::leaf(6, &[0]),
                    ],
                ),
            ],
        );
        let tuple = Tuple::from_attr(&attr, TupleDirection::ORIGINAL).unwrap();
        assert_eq!(
            tuple.to_string(),
            "src=1.2.3.4 dst=4.3.2.1 proto=icmp type=8 code=0 id=1234"
        );
    }
}
