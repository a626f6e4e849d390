//! Basic example: Discover nearby LED strip controllers
//!
//! Run with: cargo run --example discover_devices

use bledom_rust_ble::{
    BtleplugTransport, ControllerConfig, DeviceController, MemoryStore, Result,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bledom_rust_ble=debug".parse().unwrap()),
        )
        .init();

    println!("Scanning for LED controllers...\n");

    let transport = Arc::new(BtleplugTransport::new().await?);
    let store = Arc::new(MemoryStore::new());
    let config = ControllerConfig::default().with_scan_duration(Duration::from_secs(10));
    let controller = DeviceController::new(transport, store, config).await?;

    let _handle = controller.on_status_changed(|status| {
        println!("[status] {}", status);
    });

    controller.scan()?;
    tokio::time::sleep(Duration::from_secs(11)).await;

    let devices = controller.discovered_devices();
    if devices.is_empty() {
        println!("\nNo controllers found.");
    } else {
        println!("\nFound {} controller(s):", devices.len());
        for device in &devices {
            println!(
                "  {:<24} {:<20} {} dBm",
                device.display_name(),
                device.identifier,
                device.rssi
            );
        }
    }

    controller.shutdown().await?;
    Ok(())
}
