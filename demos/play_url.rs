//! Example: hand a video URL to a receiver
//!
//! Run with: `cargo run --example play_url -- "Living Room" http://host/movie.mp4`
//!
//! Press Enter to toggle pause, Ctrl-C to stop.

use std::sync::Arc;
use std::time::Duration;

use airplay_video::discovery::scan;
use airplay_video::media::StaticVideo;
use airplay_video::{AirPlaySession, DeviceRegistry, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(target_name), Some(url)) = (args.next(), args.next()) else {
        eprintln!("usage: play_url <device name> <url>");
        return Ok(());
    };

    let registry = DeviceRegistry::new();
    for device in scan(Duration::from_secs(3)).await? {
        registry.insert(device).await;
    }
    let Some((handle, device)) = registry.find_by_name(&target_name).await else {
        eprintln!("'{target_name}' not found. Available:");
        for (_, device) in registry.entries().await {
            eprintln!("  - {}", device.name);
        }
        return Ok(());
    };
    println!("Playing on {} ({})", device.name, device.socket_addr());

    let session = AirPlaySession::new(registry, Arc::new(StaticVideo::new(url)));
    let mut events = session.subscribe();
    session.set_target(handle)?;
    session.start().await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::DurationUpdated { duration }) => println!("duration {duration:.1}s"),
                Ok(SessionEvent::PositionUpdated { position }) => println!("position {position:.1}s"),
                Ok(SessionEvent::PausedChanged { paused }) => println!("paused: {paused}"),
                Ok(SessionEvent::Stopped { error }) => {
                    match error {
                        Some(e) => println!("stopped: {e}"),
                        None => println!("finished"),
                    }
                    break;
                }
                Err(_) => break,
            },
            line = stdin.next_line() => {
                if let Ok(Some(_)) = line {
                    if let Err(e) = session.toggle_paused().await {
                        eprintln!("toggle failed: {e}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.stop().await;
            }
        }
    }

    Ok(())
}
