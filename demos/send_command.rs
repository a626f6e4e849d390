//! Send a single command to a controller
//!
//! Connects to the last used controller (or the strongest one found) and
//! sends one command.
//!
//! Run with:
//!   cargo run --example send_command -- on
//!   cargo run --example send_command -- color 255 80 0
//!   cargo run --example send_command -- brightness 128
//!   cargo run --example send_command -- mode 0x25
//!   cargo run --example send_command -- hex "7E 04 04 01 00 00 00 00 EF"
//!
//! Add `--elk` to use the ELK-BLE byte layout.

use bledom_rust_ble::{
    BtleplugTransport, Command, ConnectionState, ControllerConfig, DeviceController, Error,
    JsonFileStore, ProtocolVariant, Result,
};
use std::sync::Arc;
use std::time::Duration;

enum Request {
    Command(Command),
    Hex(String),
}

fn number(args: &[String], index: usize) -> Result<i32> {
    let raw = args.get(index).ok_or_else(|| Error::InvalidParameter {
        name: format!("argument {}", index),
        value: "missing".to_string(),
    })?;
    raw.parse().map_err(|_| Error::InvalidParameter {
        name: format!("argument {}", index),
        value: raw.clone(),
    })
}

fn parse_request(args: &[String]) -> Result<Request> {
    let verb = args.first().map(String::as_str).unwrap_or("on");

    let command = match verb {
        "on" => Command::power_on(),
        "off" => Command::power_off(),
        "brightness" => Command::Brightness(number(args, 1)?),
        "speed" => Command::Speed(number(args, 1)?),
        "color" => Command::Color(number(args, 1)?, number(args, 2)?, number(args, 3)?),
        "white" => Command::ColorTemperature {
            warm: number(args, 1)?,
            cold: number(args, 2)?,
        },
        "mode" => {
            let raw = args.get(1).map(String::as_str).unwrap_or("0x25");
            let value = u8::from_str_radix(raw.trim_start_matches("0x"), 16).map_err(|_| {
                Error::InvalidParameter {
                    name: "mode".to_string(),
                    value: raw.to_string(),
                }
            })?;
            Command::mode_from_raw(value)?
        }
        "sync" => Command::sync_time(&chrono::Local::now()),
        "hex" => return Ok(Request::Hex(args[1..].join(" "))),
        other => {
            return Err(Error::InvalidParameter {
                name: "command".to_string(),
                value: other.to_string(),
            })
        }
    };

    Ok(Request::Command(command))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,bledom_rust_ble=info")
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let elk = args.iter().any(|a| a == "--elk");
    args.retain(|a| a != "--elk");

    let request = parse_request(&args)?;

    let variant = if elk {
        ProtocolVariant::ELK_BLE
    } else {
        ProtocolVariant::BLEDOM
    };
    let config = ControllerConfig::default().with_protocol_variant(variant);

    let transport = Arc::new(BtleplugTransport::new().await?);
    let store = Arc::new(JsonFileStore::new("bledom-state.json"));
    let controller = DeviceController::new(transport, store, config).await?;

    controller.start()?;
    tokio::time::sleep(Duration::from_secs(6)).await;

    if controller.state() == ConnectionState::Scanning {
        if let Some(device) = controller.discovered_devices().first() {
            println!("Connecting to {}...", device.display_name());
            controller.connect(device.identifier.clone())?;
        }
    }

    for _ in 0..20 {
        if controller.state() == ConnectionState::Connected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    println!("Status: {}", controller.status());

    match request {
        Request::Command(command) => controller.send(&command).await?,
        Request::Hex(hex) => controller.dispatcher().submit_hex(&hex).await?,
    }

    for entry in controller.dispatcher().recent_writes() {
        println!("Sent {} to {}", entry.hex, entry.identifier);
    }

    controller.shutdown().await?;
    Ok(())
}
