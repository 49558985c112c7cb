use adbreak::{AdSession, AdsSettings, ManualClock, MediaHost, MemoryMediaHost};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;
use std::io::{self, BufRead, Write};

/// Replay a recorded ad-session event log against an in-memory host.
///
/// Reads one JSON object per line from stdin and prints the session status
/// after each one:
///
///   {"event": "play"}          inbound event by name
///   {"call": "begin"}          begin | end | skip | play | reset
///   {"advance_ms": 5000}       move the clock and fire due timers
#[derive(Parser, Debug)]
#[command(name = "adbreak", version)]
struct Args {
    /// Max ms to wait for adsready once play has been requested
    #[arg(long, default_value_t = 5000)]
    timeout: u64,

    #[arg(long)]
    preroll_timeout: Option<u64>,

    #[arg(long)]
    postroll_timeout: Option<u64>,

    /// Ads are stitched into the content stream
    #[arg(long)]
    stitched: bool,

    /// Treat the content as live
    #[arg(long)]
    live: bool,

    /// Log every transition to stderr
    #[arg(long)]
    debug: bool,

    /// Content source loaded on the host at startup
    #[arg(long, default_value = "content")]
    source: String,

    /// Content duration in seconds
    #[arg(long, default_value_t = 600.0)]
    duration: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Step {
    Event { event: String },
    Call { call: String },
    Advance { advance_ms: u64 },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()?;

    let settings = AdsSettings {
        timeout: args.timeout,
        preroll_timeout: args.preroll_timeout,
        postroll_timeout: args.postroll_timeout,
        stitched_ads: args.stitched,
        content_is_live: args.live.then_some(true),
        debug: args.debug,
        ..Default::default()
    };

    let mut host = MemoryMediaHost::with_source(&args.source, args.duration);
    if args.live {
        host.set_duration(Some(f64::INFINITY));
    }
    let clock = ManualClock::new();
    let mut session = AdSession::new(settings, host, clock.clone())?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (n, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let step: Step = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not a replay step", n + 1))?;

        match step {
            Step::Event { event } => session
                .handle_event_name(&event)
                .with_context(|| format!("line {}", n + 1))?,
            Step::Call { call } => match call.as_str() {
                "begin" => session.begin_ad_break()?,
                "end" => session.end_ad_break()?,
                "skip" => session.skip_ad_break()?,
                "play" => {
                    let decision = session.request_play();
                    if decision == adbreak::PlayDecision::Proceed {
                        session.host_mut().play();
                    }
                }
                "reset" => session.reset(),
                other => bail!("line {}: unknown call {:?}", n + 1, other),
            },
            Step::Advance { advance_ms } => {
                clock.advance_ms(advance_ms);
                session.poll_timers()?;
            }
        }

        let signals = session.host_mut().take_signals();
        let report = serde_json::json!({
            "status": session.status(),
            "signals": signals,
            "paused": session.host().paused(),
        });
        writeln!(out, "{}", report)?;
        out.flush()?;
    }
    Ok(())
}
