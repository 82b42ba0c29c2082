//! portdrop CLI
//!
//! Loader and replay tool for the portdrop TCP port filter.
//!
//! # Usage
//!
//! ```bash
//! portdrop run --port 4040 frames.hex
//! portdrop run --fixed --no-count frames.hex
//! portdrop classify --port 4040 0200000000010200000000020800450000...
//! portdrop inspect 0200000000010200000000020800450000...
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use portdrop_dataplane::{
    inspect, ConfigError, DropReporter, EngineConfig, Filter, FilterConfig, FilterEngine, Rule,
    RuleConfig, RuleSource,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod frames;
mod output;

#[derive(Parser)]
#[command(name = "portdrop")]
#[command(version)]
#[command(about = "Drop TCP frames by destination port", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "text")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a file of hex frames through the filter engine
    Run {
        /// File with one hex-encoded frame per line
        frames: PathBuf,
        /// Destination port to drop
        #[arg(long, short)]
        port: Option<u16>,
        /// Use a fixed rule (defaults to port 4040) instead of the rule store
        #[arg(long)]
        fixed: bool,
        /// Do not count drops
        #[arg(long)]
        no_count: bool,
        /// JSON filter config
        #[arg(long, short, env = "PORTDROP_CONFIG")]
        config: Option<PathBuf>,
        /// Worker threads
        #[arg(long, short)]
        workers: Option<usize>,
    },
    /// Classify a single hex frame
    Classify {
        /// Destination port to drop
        #[arg(long, short, default_value_t = Rule::DEFAULT_BLOCKED_PORT)]
        port: u16,
        /// Hex-encoded frame
        frame: String,
    },
    /// Show the headers decoded from a hex frame
    Inspect {
        /// Hex-encoded frame
        frame: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { frames, port, fixed, no_count, config, workers } => {
            let overrides = Overrides { port, fixed, no_count, workers };
            run(&frames, config.as_deref(), overrides, cli.format)
        }
        Commands::Classify { port, frame } => classify(port, &frame, cli.format),
        Commands::Inspect { frame } => inspect_frame(&frame, cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Command-line values layered over the config file
struct Overrides {
    port: Option<u16>,
    fixed: bool,
    no_count: bool,
    workers: Option<usize>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<FilterConfig> {
    let Some(path) = path else {
        return Ok(FilterConfig::default());
    };
    match FilterConfig::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config not found, using defaults");
            Ok(FilterConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

fn apply_overrides(mut config: FilterConfig, o: &Overrides) -> FilterConfig {
    if o.fixed {
        let port = o.port.unwrap_or(match config.rule {
            RuleConfig::Fixed { port } => port,
            RuleConfig::Configured { .. } => Rule::DEFAULT_BLOCKED_PORT,
        });
        config.rule = RuleConfig::Fixed { port };
    } else if let Some(port) = o.port {
        config.rule = RuleConfig::Configured { port: Some(port) };
    }
    if o.no_count {
        config.track_drops = false;
    }
    if let Some(workers) = o.workers {
        config.workers = workers;
    }
    config
}

#[derive(Debug, Serialize)]
struct RunReport {
    frames: u64,
    bytes: u64,
    passed: u64,
    dropped: u64,
    /// Shared drop counter, when counting
    drop_count: Option<u64>,
}

fn run(
    frames_path: &Path,
    config_path: Option<&Path>,
    overrides: Overrides,
    format: output::OutputFormat,
) -> anyhow::Result<()> {
    let config = apply_overrides(load_config(config_path)?, &overrides);
    config.validate()?;

    match config.rule {
        RuleConfig::Configured { port: Some(port) } => tracing::info!(port, "dropping TCP packets on port"),
        RuleConfig::Configured { port: None } => {
            tracing::warn!("no blocked port configured, every frame will pass")
        }
        RuleConfig::Fixed { port } => tracing::info!(port, "dropping TCP packets on fixed port"),
    }

    let file = File::open(frames_path)
        .with_context(|| format!("opening {}", frames_path.display()))?;
    let frames = frames::read_frames(BufReader::new(file))
        .with_context(|| format!("reading {}", frames_path.display()))?;
    tracing::debug!(count = frames.len(), "frames loaded");

    let filter = config.build_filter();
    let counter = filter.drop_counter().cloned();

    let reporter = match &counter {
        Some(counter) => Some(DropReporter::spawn(
            counter.clone(),
            Duration::from_secs(config.report_interval_secs),
        )?),
        None => None,
    };

    let mut engine = FilterEngine::new(EngineConfig::from(&config), filter);
    engine.start()?;
    for frame in frames {
        engine.submit(Bytes::from(frame))?;
    }
    engine.stop();

    let drop_count = reporter.map(DropReporter::stop);
    let stats = engine.stats();
    let report = RunReport {
        frames: stats.frames,
        bytes: stats.bytes,
        passed: stats.passed,
        dropped: stats.dropped,
        drop_count,
    };

    format.print(&report, || {
        let mut text = format!(
            "Frames: {}  Passed: {}  Dropped: {}",
            report.frames, report.passed, report.dropped
        );
        if let Some(count) = report.drop_count {
            text.push_str(&format!("\nDropped packets: {}", count));
        }
        text
    });
    Ok(())
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    port: u16,
    action: portdrop_dataplane::Action,
}

fn classify(port: u16, hex_frame: &str, format: output::OutputFormat) -> anyhow::Result<()> {
    let frame = frames::parse_hex(hex_frame).context("decoding frame hex")?;
    let filter = Filter::new(RuleSource::Fixed(Rule::new(port)));
    let report = ClassifyReport {
        port,
        action: filter.classify(&frame),
    };
    format.print(&report, || report.action.to_string());
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct InspectReport {
    len: usize,
    ethertype: Option<String>,
    src_mac: Option<String>,
    dst_mac: Option<String>,
    ipv4_ihl: Option<u8>,
    ipv4_protocol: Option<u8>,
    ipv4_src: Option<String>,
    ipv4_dst: Option<String>,
    tcp_src_port: Option<u16>,
    tcp_dst_port: Option<u16>,
    error: Option<String>,
}

fn inspect_frame(hex_frame: &str, format: output::OutputFormat) -> anyhow::Result<()> {
    let frame = frames::parse_hex(hex_frame).context("decoding frame hex")?;
    let mut report = InspectReport { len: frame.len(), ..Default::default() };

    match inspect(&frame) {
        Ok(summary) => {
            report.ethertype = Some(format!("0x{:04x}", summary.ethernet.ethertype));
            report.src_mac = Some(summary.ethernet.src.to_string());
            report.dst_mac = Some(summary.ethernet.dst.to_string());
            if let Some(ip) = summary.ipv4 {
                report.ipv4_ihl = Some(ip.ihl);
                report.ipv4_protocol = Some(ip.protocol);
                report.ipv4_src = Some(ip.src.to_string());
                report.ipv4_dst = Some(ip.dst.to_string());
            }
            if let Some(tcp) = summary.tcp {
                report.tcp_src_port = Some(tcp.src_port);
                report.tcp_dst_port = Some(tcp.dst_port);
            }
        }
        Err(e) => report.error = Some(e.to_string()),
    }

    format.print(&report, || inspect_text(&report));
    Ok(())
}

fn inspect_text(r: &InspectReport) -> String {
    let mut lines = vec![format!("length    {} bytes", r.len)];
    if let (Some(src), Some(dst), Some(et)) = (&r.src_mac, &r.dst_mac, &r.ethertype) {
        lines.push(format!("ethernet  {} -> {} type {}", src, dst, et));
    }
    if let (Some(src), Some(dst), Some(ihl), Some(proto)) =
        (&r.ipv4_src, &r.ipv4_dst, r.ipv4_ihl, r.ipv4_protocol)
    {
        lines.push(format!("ipv4      {} -> {} ihl {} proto {}", src, dst, ihl, proto));
    }
    if let (Some(src), Some(dst)) = (r.tcp_src_port, r.tcp_dst_port) {
        lines.push(format!("tcp       {} -> {}", src, dst));
    }
    if let Some(err) = &r.error {
        lines.push(format!("error     {} (frame passes)", err));
    }
    lines.join("\n")
}
