use std::{fmt::Display, sync::atomic::AtomicU64};

/// Thread-local counters for high-rate frame processing
///
/// Counts accumulate locally and flush to the shared `Stats` struct
/// periodically, so the hot path performs no atomic operations.
#[derive(Default, Debug, Clone)]
pub struct LocalStats {
    // General statistics
    pub frames: u64,
    pub bytes: u64,
    pub messages: u64,
    pub records: u64,

    // Error statistics
    pub truncated_frames: u64,
    pub attr_errors: u64,
    pub decode_errors: u64,

    // Messages skipped without decoding
    pub control: u64,
    pub non_conntrack: u64,
    pub other_event: u64,

    // Event kinds
    pub new: u64,
    pub update: u64,
    pub destroy: u64,

    // Address families
    pub ipv4: u64,
    pub ipv6: u64,

    // Tracked protocols
    pub tcp: u64,
    pub udp: u64,
    pub icmp: u64,
    pub icmpv6: u64,
    pub sctp: u64,
    pub other_proto: u64,

    // Connection status
    pub assured: u64,
    pub unreplied: u64,
    pub src_nat: u64,
    pub dst_nat: u64,
}

impl LocalStats {
    /// Create a new empty local stats instance
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush all local counters to the shared atomic stats
    ///
    /// This performs atomic additions for all non-zero counters and
    /// resets the local counters to zero.
    #[inline]
    pub fn flush(&mut self, stats: &Stats) {
        macro_rules! flush_counter {
            ($field:ident) => {
                if self.$field > 0 {
                    stats
                        .$field
                        .fetch_add(self.$field, std::sync::atomic::Ordering::Relaxed);
                    self.$field = 0;
                }
            };
        }

        flush_counter!(frames);
        flush_counter!(bytes);
        flush_counter!(messages);
        flush_counter!(records);
        flush_counter!(truncated_frames);
        flush_counter!(attr_errors);
        flush_counter!(decode_errors);
        flush_counter!(control);
        flush_counter!(non_conntrack);
        flush_counter!(other_event);
        flush_counter!(new);
        flush_counter!(update);
        flush_counter!(destroy);
        flush_counter!(ipv4);
        flush_counter!(ipv6);
        flush_counter!(tcp);
        flush_counter!(udp);
        flush_counter!(icmp);
        flush_counter!(icmpv6);
        flush_counter!(sctp);
        flush_counter!(other_proto);
        flush_counter!(assured);
        flush_counter!(unreplied);
        flush_counter!(src_nat);
        flush_counter!(dst_nat);
    }

    /// Check if it's time to flush based on frame count
    ///
    /// Returns true every `interval` frames; `interval` must be a
    /// power of two.
    #[inline]
    pub fn should_flush(&self, interval: u64) -> bool {
        self.frames & (interval - 1) == 0
    }
}

/// Flush interval for local stats (must be power of 2)
pub const FLUSH_INTERVAL: u64 = 1024;

#[derive(Default, Debug)]
pub struct Stats {
    // General statistics
    pub frames: AtomicU64,
    pub bytes: AtomicU64,
    pub messages: AtomicU64,
    pub records: AtomicU64,

    // Error statistics
    pub truncated_frames: AtomicU64,
    pub attr_errors: AtomicU64,
    pub decode_errors: AtomicU64,

    // Messages skipped without decoding
    pub control: AtomicU64,
    pub non_conntrack: AtomicU64,
    pub other_event: AtomicU64,

    // Event kinds
    pub new: AtomicU64,
    pub update: AtomicU64,
    pub destroy: AtomicU64,

    // Address families
    pub ipv4: AtomicU64,
    pub ipv6: AtomicU64,

    // Tracked protocols
    pub tcp: AtomicU64,
    pub udp: AtomicU64,
    pub icmp: AtomicU64,
    pub icmpv6: AtomicU64,
    pub sctp: AtomicU64,
    pub other_proto: AtomicU64,

    // Connection status
    pub assured: AtomicU64,
    pub unreplied: AtomicU64,
    pub src_nat: AtomicU64,
    pub dst_nat: AtomicU64,
}

impl Stats {
    /// Get the value of a counter using relaxed ordering
    #[inline]
    fn get(&self, counter: &AtomicU64) -> u64 {
        counter.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Get total decoded events by kind
    pub fn total_events(&self) -> u64 {
        self.get(&self.new) + self.get(&self.update) + self.get(&self.destroy)
    }

    /// Get total errors
    pub fn total_errors(&self) -> u64 {
        self.get(&self.truncated_frames) + self.get(&self.attr_errors) + self.get(&self.decode_errors)
    }

    /// Get total NAT'ed records
    pub fn total_nat(&self) -> u64 {
        self.get(&self.src_nat) + self.get(&self.dst_nat)
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Conntrack Capture Statistics ===")?;
        writeln!(f)?;

        // General
        writeln!(f, "--- General ---")?;
        writeln!(f, "Total frames processed: {}", self.get(&self.frames))?;
        writeln!(f, "Total bytes processed: {}", self.get(&self.bytes))?;
        writeln!(f, "Netlink messages: {}", self.get(&self.messages))?;
        writeln!(f, "Conntrack records: {}", self.get(&self.records))?;
        writeln!(f)?;

        // Errors
        writeln!(f, "--- Errors ---")?;
        writeln!(f, "Total errors: {}", self.total_errors())?;
        writeln!(f, "  Truncated frames: {}", self.get(&self.truncated_frames))?;
        writeln!(f, "  Attribute errors: {}", self.get(&self.attr_errors))?;
        writeln!(f, "  Decode errors: {}", self.get(&self.decode_errors))?;
        writeln!(f)?;

        // Skipped messages
        writeln!(f, "--- Skipped Messages ---")?;
        writeln!(f, "Control: {}", self.get(&self.control))?;
        writeln!(f, "Non-conntrack: {}", self.get(&self.non_conntrack))?;
        writeln!(f, "Other conntrack types: {}", self.get(&self.other_event))?;
        writeln!(f)?;

        // Events
        writeln!(f, "--- Events ---")?;
        writeln!(f, "Total events: {}", self.total_events())?;
        writeln!(f, "  New: {}", self.get(&self.new))?;
        writeln!(f, "  Update: {}", self.get(&self.update))?;
        writeln!(f, "  Destroy: {}", self.get(&self.destroy))?;
        writeln!(f)?;

        // Families
        writeln!(f, "--- Address Families ---")?;
        writeln!(f, "IPv4: {}", self.get(&self.ipv4))?;
        writeln!(f, "IPv6: {}", self.get(&self.ipv6))?;
        writeln!(f)?;

        // Protocols
        writeln!(f, "--- Tracked Protocols ---")?;
        writeln!(f, "TCP: {}", self.get(&self.tcp))?;
        writeln!(f, "UDP: {}", self.get(&self.udp))?;
        writeln!(f, "ICMP: {}", self.get(&self.icmp))?;
        writeln!(f, "ICMPv6: {}", self.get(&self.icmpv6))?;
        writeln!(f, "SCTP: {}", self.get(&self.sctp))?;
        writeln!(f, "Other: {}", self.get(&self.other_proto))?;
        writeln!(f)?;

        // Status
        writeln!(f, "--- Connection Status ---")?;
        writeln!(f, "Assured: {}", self.get(&self.assured))?;
        writeln!(f, "Unreplied: {}", self.get(&self.unreplied))?;
        let total_nat = self.total_nat();
        if total_nat > 0 {
            writeln!(f, "NAT'ed: {}", total_nat)?;
            if self.get(&self.src_nat) > 0 {
                writeln!(f, "  Source NAT: {}", self.get(&self.src_nat))?;
            }
            if self.get(&self.dst_nat) > 0 {
                writeln!(f, "  Destination NAT: {}", self.get(&self.dst_nat))?;
            }
        }

        Ok(())
    }
}
