//! Device discovery example

use airplay_video::scan;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Discovering AirPlay devices...");

    let devices = scan(Duration::from_secs(5)).await?;

    if devices.is_empty() {
        println!("No devices found.");
    } else {
        println!("Found {} devices:", devices.len());
        for device in devices {
            println!(
                "  - {} ({}) at {} video={} hls={}",
                device.name,
                device.id,
                device.socket_addr(),
                device.can_play_video(),
                device.capabilities.supports_hls
            );
        }
    }
    Ok(())
}
