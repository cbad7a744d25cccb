use std::cmp::min;

use ct_decode::timestamp::Timestamp;
use pcap_parser::{EnhancedPacketBlock, LegacyPcapBlock, SimplePacketBlock};

/// Uniform view over the capture block types pcap-parser yields.
pub trait FrameMetadata {
    fn caplen(&self) -> u32;
    fn origlen(&self) -> u32;
    fn data(&self) -> &[u8];
    fn timestamp(&self) -> Timestamp;
}

impl FrameMetadata for LegacyPcapBlock<'_> {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_nanos((self.ts_sec as u64) * 1_000_000_000 + self.ts_usec as u64 * 1000)
    }

    #[inline]
    fn caplen(&self) -> u32 {
        self.caplen
    }

    #[inline]
    fn origlen(&self) -> u32 {
        self.origlen
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data
    }
}

impl FrameMetadata for EnhancedPacketBlock<'_> {
    fn timestamp(&self) -> Timestamp {
        scale_epb_ticks(((self.ts_high as u64) << 32) | (self.ts_low as u64))
    }

    #[inline]
    fn caplen(&self) -> u32 {
        self.caplen
    }

    #[inline]
    fn origlen(&self) -> u32 {
        self.origlen
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data
    }
}

/// The enhanced-block timestamp unit comes from an interface option this
/// reader does not track, so guess from magnitude: interpreted as
/// nanoseconds, any capture taken between 1973 and 2096 lands in this
/// range. Microsecond ticks divided down fall far below it; the scale-up
/// saturates so garbage tick values cannot overflow.
fn scale_epb_ticks(raw_ts: u64) -> Timestamp {
    let maybe_ns = raw_ts / 1_000_000_000;
    if (100_000_000..=4_000_000_000).contains(&maybe_ns) {
        Timestamp::from_nanos(raw_ts)
    } else {
        Timestamp::from_nanos(raw_ts.saturating_mul(1000))
    }
}

impl FrameMetadata for SimplePacketBlock<'_> {
    #[inline]
    fn timestamp(&self) -> Timestamp {
        Timestamp::ZERO
    }

    #[inline]
    fn caplen(&self) -> u32 {
        min(self.origlen, self.data.len() as u32)
    }

    #[inline]
    fn origlen(&self) -> u32 {
        self.origlen
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data
    }
}
