use clap::Parser;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use std::fs::File;
use std::path::PathBuf;
use tracing::{error, info};

mod frame;
mod process;
mod stats;

/// Link type of nlmon captures; frames start at the netlink header.
const LINKTYPE_NETLINK: i32 = 253;

#[derive(Parser, Debug)]
#[command(name = "ct-dump")]
#[command(about = "Decode conntrack events from an nlmon capture", long_about = None)]
struct Args {
    /// Path to the capture file to read
    #[arg(short, long, value_name = "FILE")]
    pcap: PathBuf,

    /// Print every decoded record
    #[arg(short, long)]
    records: bool,

    /// Print statistics at the end
    #[arg(short, long)]
    stats: bool,
}

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let stats = stats::Stats::default();

    info!("Reading capture file: {:?}", args.pcap);
    if let Err(e) = process_capture(&args.pcap, &args, &stats) {
        error!("Failed to process capture file: {}", e);
        std::process::exit(1);
    }
    if args.stats {
        println!("{stats}");
    }
}

fn check_link_type(linktype: i32) -> Result<(), String> {
    if linktype != LINKTYPE_NETLINK {
        return Err(format!(
            "link type {linktype} is not netlink ({LINKTYPE_NETLINK}); capture on an nlmon interface"
        ));
    }
    Ok(())
}

/// Process the capture file frame by frame
fn process_capture(pcap_path: &PathBuf, args: &Args, stats: &stats::Stats) -> Result<(), String> {
    let mut local_stats = stats::LocalStats::new();

    let file =
        File::open(pcap_path).map_err(|e| format!("Failed to open {:?}: {}", pcap_path, e))?;

    let mut frame_count = 0u64;
    let mut bytes_count = 0u64;

    let start = std::time::Instant::now();

    // Try to create a PCAPNG reader first
    match PcapNGReader::new(65536, file) {
        Ok(mut reader) => {
            info!("Detected PCAPNG format");
            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                                frame_count += 1;
                                bytes_count += epb.caplen as u64;
                                process::process_frame(
                                    frame_count,
                                    &epb,
                                    &mut local_stats,
                                    stats,
                                    args.records,
                                );
                            }
                            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                                frame_count += 1;
                                bytes_count += spb.origlen as u64;
                                process::process_frame(
                                    frame_count,
                                    &spb,
                                    &mut local_stats,
                                    stats,
                                    args.records,
                                );
                            }
                            PcapBlockOwned::NG(Block::SectionHeader(_shb)) => {
                                info!("PCAPNG Section Header found");
                            }
                            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                                check_link_type(idb.linktype.0)?;
                            }
                            _ => {
                                // Other block types (interface statistics, etc.)
                            }
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error refilling buffer: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAPNG: {:?}", e));
                    }
                }
            }
        }
        Err(_) => {
            let file =
                File::open(pcap_path).map_err(|e| format!("Failed to open {:?}: {}", pcap_path, e))?;

            // Try legacy PCAP format
            let mut reader = LegacyPcapReader::new(65536, file)
                .map_err(|e| format!("Failed to create PCAP reader: {:?}", e))?;

            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::Legacy(packet) => {
                                frame_count += 1;
                                bytes_count += packet.caplen as u64;
                                process::process_frame(
                                    frame_count,
                                    &packet,
                                    &mut local_stats,
                                    stats,
                                    args.records,
                                );
                            }
                            PcapBlockOwned::LegacyHeader(header) => {
                                check_link_type(header.network.0)?;
                            }
                            _ => {}
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error refilling buffer: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAP: {:?}", e));
                    }
                }
            }
        }
    }

    // Final flush of local stats
    local_stats.flush(stats);

    info!(
        "Total frames processed: {}, {:.3}M frames/sec, {:.3} Gbps",
        frame_count,
        (frame_count as f64 / start.elapsed().as_secs_f64()) / 1_000_000.0,
        (bytes_count as f64 * 8.0) / (start.elapsed().as_secs_f64() * 1_000_000_000.0)
    );
    Ok(())
}
