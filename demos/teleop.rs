//! Minimal teleoperation demo: connect, watch, listen, nod, greet.
//!
//! ```bash
//! WEHEAD_TOKEN=your_token cargo run --example teleop
//! ```

use secrecy::ExposeSecret;
use std::time::Duration;
use wehead_sdk::{config, Device, DeviceConfig, Voice};

#[tokio::main]
async fn main() -> wehead_sdk::Result<()> {
    env_logger::init();

    let token = config::load_token()?;
    let device =
        Device::connect_with_config(DeviceConfig::from_env(), token.expose_secret()).await?;

    device.on_video(|image| {
        log::info!("Video frame: {}x{} RGB", image.width(), image.height());
    });
    device.on_phrase(|text| {
        log::info!("Heard: '{}'", text);
    });

    device.say_with_voice("Hello! Watch me look around.", &Voice::Nova.to_string())?;

    // Small pitch/yaw sweep in pose-absolute mode.
    for (pitch, yaw) in [(0.0, -0.6), (0.2, 0.0), (0.0, 0.6), (0.0, 0.0)] {
        log::info!("Posing at pitch {} yaw {}", pitch, yaw);
        device.pose(pitch, yaw)?;
        tokio::time::sleep(Duration::from_millis(750)).await;
    }

    // Linger so inbound video/phrase callbacks have a chance to fire.
    tokio::time::sleep(Duration::from_secs(10)).await;

    device.close().await;
    Ok(())
}
