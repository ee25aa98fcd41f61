//! RainWatch - bicolor indicator firmware
//!
//! Display, single red/green indicator, LED matrix and buzzer:
//! - Red LED on alarm, green LED otherwise
//! - 4 consumers fed by the sampler

#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use panic_halt as _;

use rainwatch::*;

const VARIANT: variant::Variant = variant::Variant::Bicolor;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let mut supervisor = supervisor::AppSupervisor::new_for_variant(VARIANT);
    supervisor.print_startup_banner();

    match hardware::init_tasks_for_variant(&spawner, p, VARIANT).await {
        Ok(()) => supervisor.print_init_success(),
        Err(e) => {
            error!("Failed to initialize hardware: {:?}", e);
            core::panic!("Hardware initialization failed");
        }
    }

    supervisor.run().await
}
