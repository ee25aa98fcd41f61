//! RainWatch - split LED firmware
//!
//! Display, LED matrix and buzzer plus one LED per sensor:
//! - Red LED follows the rain sensor
//! - Green LED follows the water level sensor
//! - 5 consumers fed by the sampler

#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use panic_halt as _;

use rainwatch::*;

const VARIANT: variant::Variant = variant::Variant::SplitLeds;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let mut supervisor = supervisor::AppSupervisor::new_for_variant(VARIANT);
    supervisor.print_startup_banner();

    match hardware::init_tasks_for_variant(&spawner, p, VARIANT).await {
        Ok(()) => {
            info!("Split LED firmware initialized");
            supervisor.print_init_success();
        }
        Err(e) => {
            error!("Failed to initialize hardware: {:?}", e);
            core::panic!("Hardware initialization failed");
        }
    }

    supervisor.run().await
}
