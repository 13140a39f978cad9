use balance_core::mpu::{DeviceId, GyroStatistics};
use balance_core::{LogStatus, Status};
use esp_hal::gpio::Output;

/// Status LED on top of the log output.
///
/// Lit while waiting for the start button, flips on every press that finds
/// no sensor, dark once the sensor answers. Lit again if calibration fails.
pub struct LedStatus {
    led: Output<'static>,
    log: LogStatus,
}

impl LedStatus {
    pub fn new(led: Output<'static>) -> Self {
        Self { led, log: LogStatus }
    }
}

impl Status for LedStatus {
    fn awaiting_start(&mut self) {
        self.led.set_high();
        self.log.awaiting_start();
    }

    fn sensor_found(&mut self, id: DeviceId) {
        self.led.set_low();
        self.log.sensor_found(id);
    }

    fn sensor_missing(&mut self) {
        self.led.toggle();
        self.log.sensor_missing();
    }

    fn calibrated(&mut self, stats: &GyroStatistics) {
        self.log.calibrated(stats);
    }

    fn calibration_failed(&mut self, stats: &GyroStatistics) {
        self.led.set_high();
        self.log.calibration_failed(stats);
    }
}
