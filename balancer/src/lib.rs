#![no_std]

use balance_core::Clock;
use embassy_time::Instant;

pub mod motors;
pub mod status;

/// Milliseconds since boot from the embassy time driver.
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&mut self) -> u64 {
        Instant::now().as_millis()
    }
}
