//! # PIXLINK Node
//!
//! Runs the ingress and render units on two threads with a null rasterizer.
//!
//! ## Usage
//!
//! ```bash
//! pixlink_node --config config/pixlink.toml --seconds 30
//! RUST_LOG=pixlink=debug pixlink_node --frames 300
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use pixlink_core::{NullRasterizer, PipelineConfig};
use pixlink_net::{Pipeline, PipelineReport};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_CONFIG: &str = "config/pixlink.toml";

/// When to stop.
#[derive(Clone, Copy, Debug)]
enum RunLimit {
    Forever,
    Frames(u64),
    Seconds(u64),
}

struct Args {
    config: PathBuf,
    limit: RunLimit,
}

fn print_usage() {
    println!("Usage: pixlink_node [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    TOML configuration (default: {DEFAULT_CONFIG})");
    println!("  -f, --frames <N>       Stop after N rendered frames");
    println!("  -s, --seconds <N>      Stop after N seconds");
    println!("  -h, --help             Show this help");
}

/// Returns `None` when help was requested.
fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args { config: PathBuf::from(DEFAULT_CONFIG), limit: RunLimit::Forever };
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| iter.next().ok_or_else(|| format!("{name} needs a value"));
        match arg.as_str() {
            "--config" | "-c" => args.config = PathBuf::from(value("--config")?),
            "--frames" | "-f" => {
                let n = value("--frames")?;
                args.limit = RunLimit::Frames(n.parse().map_err(|_| format!("bad frame count {n:?}"))?);
            }
            "--seconds" | "-s" => {
                let n = value("--seconds")?;
                args.limit = RunLimit::Seconds(n.parse().map_err(|_| format!("bad duration {n:?}"))?);
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(Some(args))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pixlink=info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}

fn wait_for(pipeline: &Pipeline, limit: RunLimit) {
    let start = Instant::now();
    loop {
        std::thread::sleep(Duration::from_millis(50));
        let done = match limit {
            RunLimit::Forever => false,
            RunLimit::Frames(n) => pipeline.stats().frame_count >= n,
            RunLimit::Seconds(s) => start.elapsed() >= Duration::from_secs(s),
        };
        if done || !pipeline.is_running() {
            return;
        }
    }
}

fn print_summary(report: &PipelineReport) {
    let PipelineReport { ingress, engine, channel, reports_dropped } = report;
    println!();
    println!("== PIXLINK SHUTDOWN ==");
    println!("Frames:              {:>10}", engine.frame_count);
    println!("Avg frame time:      {:>10} us", engine.avg_frame_us);
    println!("Max frame time:      {:>10} us", engine.max_frame_us);
    println!("Late frames:         {:>10}", engine.late_frames);
    println!("Sprites live:        {:>10}", engine.active_sprites);
    println!("Sprites cleaned up:  {:>10}", engine.cleaned_up_total);
    println!("Commands executed:   {:>10}", engine.commands_executed);
    println!("Commands failed:     {:>10}", engine.commands_failed);
    println!("Commands dropped:    {:>10}", channel.dropped);
    println!("Packets received:    {:>10}", ingress.packets_received);
    println!("Packets discarded:   {:>10}", ingress.packets_truncated + ingress.packets_oversized + ingress.unknown_commands);
    println!("Reports sent:        {:>10}", ingress.reports_sent);
    println!("Reports dropped:     {:>10}", reports_dropped);
}

fn main() -> ExitCode {
    init_logging();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("pixlink_node: {err}");
            print_usage();
            return ExitCode::from(2);
        }
    };

    let config = match PipelineConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Cannot load {}: {err}", args.config.display());
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::spawn(&config, Box::new(NullRasterizer)) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            tracing::error!("Cannot start pipeline: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(addr) = pipeline.local_addr() {
        tracing::info!("Accepting commands on {addr}, reporting to port {}", config.network.response_port);
    }

    wait_for(&pipeline, args.limit);

    match pipeline.stop() {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("Shutdown failed: {err}");
            ExitCode::FAILURE
        }
    }
}
