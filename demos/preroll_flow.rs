//! Walk one session through a preroll, a midroll and a postroll timeout,
//! printing the status after each step.
//! Run with: cargo run --example preroll_flow

use adbreak::{AdEvent, AdSession, AdsSettings, ManualClock, MediaHost, MemoryMediaHost};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = AdsSettings::from_json(r#"{"timeout": 3000, "postrollTimeout": 1500}"#)?;
    let host = MemoryMediaHost::with_source("feature-film", 5400.0);
    let clock = ManualClock::new();
    let mut session = AdSession::new(settings, host, clock.clone())?;

    let show = |label: &str, session: &mut AdSession<MemoryMediaHost, ManualClock>| {
        let signals = session.host_mut().take_signals();
        println!(
            "{:<22} {}  signals={:?}",
            label,
            serde_json::to_string(&session.status()).unwrap_or_default(),
            signals
        );
    };

    session.handle_event(AdEvent::LoadStart)?;
    println!("play -> {:?}", session.request_play());
    show("play requested", &mut session);

    session.handle_event(AdEvent::AdsReady)?;
    show("ads ready", &mut session);

    session.begin_ad_break()?;
    session.host_mut().attach_media("preroll-creative.mp4", 15.0);
    show("preroll started", &mut session);

    session.end_ad_break()?;
    session.handle_event(AdEvent::Playing)?;
    show("content resumed", &mut session);

    session.host_mut().set_position(1800.0);
    session.begin_ad_break()?;
    session.host_mut().attach_media("midroll-creative.mp4", 30.0);
    session.end_ad_break()?;
    session.handle_event(AdEvent::Playing)?;
    println!("back at {}s", session.host().current_time());
    show("midroll done", &mut session);

    session.handle_event(AdEvent::ContentEnding)?;
    show("content ending", &mut session);

    clock.advance_ms(1500);
    session.poll_timers()?;
    show("postroll timed out", &mut session);

    Ok(())
}
