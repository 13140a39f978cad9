// Tunables. Fixed at build time, nothing here changes while running.

use crate::AngleHundredths;

// Gyro calibration
pub const CALIBRATION_SAMPLES: usize = 100;
pub const MAX_GYRO_VARIANCE: i32 = 40; // raw units squared, per axis
pub const CALIBRATION_PAUSE_MS: u32 = 1;

// Digital low pass filter settings, 0..=7, see the MPU-9250 register map
pub const GYRO_LPF: u8 = 0;
pub const ACCEL_LPF: u8 = 0;

// Bring-up pacing
pub const BUTTON_POLL_MS: u32 = 10;
pub const SETTLE_MS: u32 = 100;

/// Control loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Estimate at which the vehicle is upright.
    pub target_angle: AngleHundredths,
    pub kp: i32,
    pub kd: i32,
    /// Added to the left output and taken from the right one.
    /// Increase to reduce forward power to the right.
    pub motor_bias: i32,
    /// Error beyond which the vehicle counts as fallen.
    pub fall_threshold: AngleHundredths,
    /// Error within which the motors get enabled.
    pub enable_deadband: AngleHundredths,
    /// Gyro weight of the complementary filter against one part accelerometer.
    pub filter_weight: i32,
    pub loop_pause_ms: u32,
}

impl Tuning {
    pub const DEFAULT: Self = Self {
        target_angle: -9000,
        kp: 2400,
        kd: 24,
        motor_bias: 0,
        fall_threshold: 3000,
        enable_deadband: 500,
        filter_weight: 49,
        loop_pause_ms: 5,
    };
}

impl Default for Tuning {
    fn default() -> Self {
        Self::DEFAULT
    }
}
