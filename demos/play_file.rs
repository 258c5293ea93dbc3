//! Example: serve a local video file to a receiver
//!
//! Run with: `cargo run --example play_file -- "Living Room" ~/Movies/clip.mp4`

use std::sync::Arc;
use std::time::Duration;

use airplay_video::discovery::scan;
use airplay_video::{
    AirPlayError, AirPlaySession, DeviceRegistry, MediaServer, SessionObserver,
};

/// Prints progress the way a player UI would show it
struct Console;

impl SessionObserver for Console {
    fn set_paused(&self, paused: bool) {
        println!("{}", if paused { "paused" } else { "playing" });
    }

    fn position_updated(&self, position: f64) {
        println!("at {position:.1}s");
    }

    fn duration_updated(&self, duration: f64) {
        println!("length {duration:.1}s");
    }

    fn stopped_with_error(&self, error: Option<&AirPlayError>) {
        match error {
            Some(e) => println!("stopped: {e}"),
            None => println!("done"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "airplay_video=info");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(target_name), Some(path)) = (args.next(), args.next()) else {
        eprintln!("usage: play_file <device name> <file>");
        return Ok(());
    };

    let server = Arc::new(MediaServer::bind(&path).await?);
    println!("Serving {path} on {}", server.local_addr());

    let registry = DeviceRegistry::new();
    let watcher = registry.watch(airplay_video::discover().await?);
    tokio::time::sleep(Duration::from_secs(3)).await;

    let Some((handle, _)) = registry.find_by_name(&target_name).await else {
        eprintln!("'{target_name}' not found");
        let names: Vec<_> = scan(Duration::from_secs(1))
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        eprintln!("Available: {names:?}");
        return Ok(());
    };

    let session = AirPlaySession::new(registry, server.clone());
    let observer = session.observe(Arc::new(Console));
    session.set_target(handle)?;
    session.start().await?;

    tokio::select! {
        _ = observer => {}
        _ = tokio::signal::ctrl_c() => session.stop().await,
    }

    watcher.abort();
    server.shutdown();
    println!("Served {} requests", server.requests_served());
    Ok(())
}
