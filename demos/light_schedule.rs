//! Power schedule example
//!
//! Keeps a connection open and switches the strip on at 07:00 on weekdays
//! and off at 23:30 every day. Schedules are stored next to the last
//! device in `bledom-state.json`.
//!
//! Run with: cargo run --example light_schedule

use bledom_rust_ble::data::{load_schedules, save_schedules};
use bledom_rust_ble::{
    BtleplugTransport, ControllerConfig, DaySet, DeviceController, JsonFileStore, RampPolicy,
    Result, Schedule, ScheduleConfig, ScheduleRunner, TimeOfDay,
};
use parking_lot::RwLock;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,bledom_rust_ble=info")
        .init();

    let transport = Arc::new(BtleplugTransport::new().await?);
    let store = Arc::new(JsonFileStore::new("bledom-state.json"));
    let controller =
        DeviceController::new(transport, store.clone(), ControllerConfig::default()).await?;

    let mut book = load_schedules(store.as_ref()).await?;
    if book.is_empty() {
        book.add(Schedule::new(TimeOfDay::new(7, 0)?, DaySet::WEEKDAYS, true).with_ramp(true));
        book.add(Schedule::new(TimeOfDay::new(23, 30)?, DaySet::EVERY_DAY, false));
        save_schedules(store.as_ref(), &book).await?;
    }

    for schedule in book.iter() {
        println!(
            "{} {} -> {}",
            schedule.time_of_day,
            schedule.days_of_week,
            if schedule.target_power_state { "on" } else { "off" }
        );
    }

    let _status = controller.on_status_changed(|status| println!("[status] {}", status));
    controller.start()?;

    let config = ScheduleConfig::default().with_ramp(RampPolicy::StartFrom { brightness: 10 });
    let runner = Arc::new(ScheduleRunner::new(
        controller.dispatcher().clone(),
        Arc::new(RwLock::new(book)),
        config,
    ));
    let handle = runner.spawn();

    println!("Running. Press Ctrl+C to exit.");
    let _ = tokio::signal::ctrl_c().await;

    handle.abort();
    controller.shutdown().await?;
    Ok(())
}
