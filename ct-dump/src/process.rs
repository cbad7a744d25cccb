use ct_decode::decode::codes::{Family, Protocol};
use ct_decode::decode::record::{CtRecord, RecordError};
use ct_decode::nlmsg::{EventKind, NlMsgIter};
use tracing::debug;

use crate::frame::FrameMetadata;
use crate::stats::{LocalStats, Stats, FLUSH_INTERVAL};

/// Process a single capture frame
///
/// Walks the netlink messages inside the frame, decodes every conntrack
/// payload and updates the counters.
pub fn process_frame<Frame: FrameMetadata>(
    frame_count: u64,
    frame: &Frame,
    local_stats: &mut LocalStats,
    stats: &Stats,
    print_records: bool,
) {
    local_stats.frames += 1;
    local_stats.bytes += frame.caplen() as u64;

    for result in NlMsgIter::new(frame.data()) {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                debug!(
                    frame = frame_count,
                    caplen = frame.caplen(),
                    origlen = frame.origlen(),
                    "bad netlink frame: {e}"
                );
                local_stats.truncated_frames += 1;
                break;
            }
        };
        local_stats.messages += 1;

        if msg.header.is_control() {
            local_stats.control += 1;
            continue;
        }
        if !msg.header.is_conntrack() {
            local_stats.non_conntrack += 1;
            continue;
        }

        let kind = msg.kind();
        match kind {
            EventKind::New => local_stats.new += 1,
            EventKind::Update => local_stats.update += 1,
            EventKind::Destroy => local_stats.destroy += 1,
            EventKind::Other(_) => {
                // Expectation and stats messages share the subsystem but
                // not the record layout.
                local_stats.other_event += 1;
                continue;
            }
        }

        match CtRecord::from_payload(msg.payload) {
            Ok(record) => {
                local_stats.records += 1;
                count_record(&record, local_stats);
                if print_records {
                    println!("{:>6} {} [{}] {}", frame_count, frame.timestamp(), kind, record);
                }
            }
            Err(RecordError::Attr(e)) => {
                debug!(frame = frame_count, "bad attribute stream: {e}");
                local_stats.attr_errors += 1;
            }
            Err(RecordError::Decode(e)) => {
                debug!(frame = frame_count, "bad conntrack record: {e}");
                local_stats.decode_errors += 1;
            }
        }
    }

    // Periodic flush to shared stats
    if local_stats.should_flush(FLUSH_INTERVAL) {
        local_stats.flush(stats);
    }
}

fn count_record(record: &CtRecord, local_stats: &mut LocalStats) {
    match record.family {
        Family::INET => local_stats.ipv4 += 1,
        Family::INET6 => local_stats.ipv6 += 1,
        _ => {}
    }

    if let Some(tuple) = &record.original {
        match tuple.proto.protocol {
            Protocol::TCP => local_stats.tcp += 1,
            Protocol::UDP => local_stats.udp += 1,
            Protocol::ICMP => local_stats.icmp += 1,
            Protocol::ICMPV6 => local_stats.icmpv6 += 1,
            Protocol::SCTP => local_stats.sctp += 1,
            _ => local_stats.other_proto += 1,
        }
    }

    if let Some(status) = record.status {
        if status.is_assured() {
            local_stats.assured += 1;
        }
        if !status.is_seen_reply() {
            local_stats.unreplied += 1;
        }
        if status.is_src_nat() {
            local_stats.src_nat += 1;
        }
        if status.is_dst_nat() {
            local_stats.dst_nat += 1;
        }
    }
}
