//! Conntrack attribute type codes and protocol numbers
//!
//! These tables are part of the kernel's conntrack netlink ABI: fixed
//! lookups, not configuration. Each is a newtype over its wire-sized
//! primitive with named constants and a total `Display` (unknown codes
//! render as hex, never as an empty string).
//!
//! # Examples
//!
//! ```
//! use ct_decode::decode::codes::{Protocol, TupleDirection};
//!
//! assert_eq!(format!("{}", Protocol::TCP), "tcp");
//! assert_eq!(Protocol::from(6), Protocol::TCP);
//! assert!(Protocol::TCP.is_valid());
//! assert!(!Protocol::from(200).is_valid());
//!
//! // Display is total over the whole numeric domain.
//! assert_eq!(format!("{}", TupleDirection::ORIGINAL), "original");
//! assert_eq!(format!("{}", TupleDirection::from(255)), "0xff");
//! ```

crate::code_constants! {
    /// Root type of a tuple attribute: which direction of the tracked
    /// connection the tuple describes.
    TupleDirection, u16:
        #[default] ORIGINAL = 1;
        REPLY = 2;
}

crate::code_constants! {
    /// Child attributes of a tuple.
    TupleType, u16:
        IP = 1;
        PROTO = 2;
        ZONE = 3;
}

crate::code_constants! {
    /// Child attributes of an IP tuple. The address width is fixed per
    /// code: 4 bytes for V4_*, 16 bytes for V6_*.
    IpTupleType, u16:
        V4_SRC = 1;
        V4_DST = 2;
        V6_SRC = 3;
        V6_DST = 4;
}

crate::code_constants! {
    /// Child attributes of a proto tuple. ICMP ids are 2 bytes, types and
    /// codes 1 byte, for both ICMP families.
    ProtoTupleType, u16:
        NUM = 1;
        SRC_PORT = 2;
        DST_PORT = 3;
        ICMP_ID = 4;
        ICMP_TYPE = 5;
        ICMP_CODE = 6;
        ICMPV6_ID = 7;
        ICMPV6_TYPE = 8;
        ICMPV6_CODE = 9;
}

crate::code_constants! {
    /// Top-level attributes of a conntrack message.
    RecordType, u16:
        TUPLE_ORIG = 1;
        TUPLE_REPLY = 2;
        STATUS = 3;
        PROTOINFO = 4;
        HELP = 5;
        NAT_SRC = 6;
        TIMEOUT = 7;
        MARK = 8;
        COUNTERS_ORIG = 9;
        COUNTERS_REPLY = 10;
        USE = 11;
        ID = 12;
        NAT_DST = 13;
        TUPLE_MASTER = 14;
        SEQ_ADJ_ORIG = 15;
        SEQ_ADJ_REPLY = 16;
        SECMARK = 17;
        ZONE = 18;
        SECCTX = 19;
        TIMESTAMP = 20;
        MARK_MASK = 21;
        LABELS = 22;
        LABELS_MASK = 23;
        SYNPROXY = 24;
}

crate::code_constants! {
    /// Children of a timestamp attribute: 8-byte big-endian nanoseconds.
    TimestampType, u16:
        START = 1;
        STOP = 2;
}

crate::code_constants! {
    /// Address family carried in the nfgenmsg header.
    Family, u8:
        UNSPEC = 0;
        INET = 2;
        INET6 = 10;
}

crate::code_constants! {
    /// Transport protocols conntrack tracks.
    Protocol, u8:
        ICMP = 1;
        TCP = 6;
        UDP = 17;
        DCCP = 33;
        GRE = 47;
        ICMPV6 = 58;
        SCTP = 132;
        UDPLITE = 136;
}
