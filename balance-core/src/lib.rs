#![no_std]

#[cfg(test)]
extern crate std;

pub mod balance;
pub mod config;
pub mod controller;
pub mod mpu;
pub mod startup;
pub mod tilt;
pub mod trig;

#[cfg(test)]
mod testing;

use log::{info, warn};

use crate::mpu::{DeviceId, GyroStatistics};

/// Degrees scaled by 100, so 0.01° resolution without floating point.
pub type AngleHundredths = i32;

/// Left/right wheel motors.
///
/// Values are signed duty cycles in `-1024..=1023`, sign selects direction.
pub trait Motors {
    fn drive(&mut self, left: i16, right: i16);
    fn stop(&mut self);
}

/// Monotonic millisecond time source used to measure loop periods.
pub trait Clock {
    fn now_ms(&mut self) -> u64;
}

/// Receives coarse progress of the bring-up sequence.
///
/// Purely observational, nothing reported here feeds back into control.
/// Every event defaults to doing nothing.
pub trait Status {
    fn awaiting_start(&mut self) {}
    fn sensor_found(&mut self, _id: DeviceId) {}
    fn sensor_missing(&mut self) {}
    fn calibrated(&mut self, _stats: &GyroStatistics) {}
    fn calibration_failed(&mut self, _stats: &GyroStatistics) {}
}

/// [`Status`] that reports nothing.
impl Status for () {}

/// [`Status`] that only writes to the log.
pub struct LogStatus;

impl Status for LogStatus {
    fn awaiting_start(&mut self) {
        info!("waiting for start");
    }

    fn sensor_found(&mut self, id: DeviceId) {
        info!("found {id:?}");
    }

    fn sensor_missing(&mut self) {
        warn!("no MPU found");
    }

    fn calibrated(&mut self, stats: &GyroStatistics) {
        let [var_x, var_y, var_z] = stats.variance;
        let [bias_x, bias_y, bias_z] = stats.mean;
        info!("X variance {var_x}");
        info!("Y variance {var_y}");
        info!("Z variance {var_z}");
        info!("X bias {bias_x}");
        info!("Y bias {bias_y}");
        info!("Z bias {bias_z}");
    }

    fn calibration_failed(&mut self, stats: &GyroStatistics) {
        warn!(
            "gyro too unsteady to calibrate, variance {:?}",
            stats.variance
        );
    }
}
