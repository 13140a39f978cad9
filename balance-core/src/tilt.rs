//! Tilt estimation: accelerometer angle fused with integrated gyro rate.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::AngleHundredths;
use crate::mpu::{Error, Mpu};
use crate::trig;

/// ±2000°/s full scale in degrees * 100 per second.
const GYRO_FULL_SCALE: i64 = 200_000;
const SAMPLE_SPAN: i64 = 32768;

/// Source of the two measurements the estimator fuses.
///
/// Axis mapping is a property of how the sensor is mounted on the vehicle,
/// implementors pick the axes.
pub trait TiltSensor {
    type Error;

    /// Absolute tilt from gravity, degrees * 100.
    fn accel_tilt(&mut self) -> Result<AngleHundredths, Self::Error>;

    /// Raw gyro sample about the tilt axis, signed so that it grows with the
    /// accelerometer angle.
    fn gyro_rate(&mut self) -> Result<i32, Self::Error>;
}

/// Sensor mounted with the tilt axis along Y and gravity in the X/Z plane.
pub fn tilt_from_accel([x, _, z]: [i16; 3]) -> AngleHundredths {
    trig::atan2(z as i32, -(x as i32))
}

impl<I2C, D, E> TiltSensor for Mpu<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    type Error = Error<E>;

    fn accel_tilt(&mut self) -> Result<AngleHundredths, Self::Error> {
        self.read_accel().map(tilt_from_accel)
    }

    fn gyro_rate(&mut self) -> Result<i32, Self::Error> {
        let [_, y, _] = self.read_gyro()?;
        Ok(-(y as i32))
    }
}

/// Raw gyro sample to degrees * 100 per second.
pub fn angle_rate(raw: i32) -> i32 {
    (raw as i64 * GYRO_FULL_SCALE / SAMPLE_SPAN) as i32
}

/// First order complementary filter.
///
/// `new = (w * (previous + gyro_delta) + accel_angle) / (w + 1)`
pub struct TiltEstimator {
    angle: AngleHundredths,
    weight: i32,
}

impl TiltEstimator {
    pub fn new(angle: AngleHundredths, weight: i32) -> Self {
        assert!(weight >= 0, "filter weight must not be negative");
        Self { angle, weight }
    }

    /// Seeds the estimate with one accelerometer reading.
    pub fn start<S: TiltSensor>(sensor: &mut S, weight: i32) -> Result<Self, S::Error> {
        Ok(Self::new(sensor.accel_tilt()?, weight))
    }

    pub fn angle(&self) -> AngleHundredths {
        self.angle
    }

    /// Blends one accelerometer angle and raw gyro rate into the estimate.
    ///
    /// `elapsed_ms` is the measured time since the previous call.
    pub fn fuse(
        &mut self,
        accel_angle: AngleHundredths,
        raw_rate: i32,
        elapsed_ms: u32,
    ) -> AngleHundredths {
        let change = angle_rate(raw_rate) as i64 * elapsed_ms as i64 / 1000;
        let weight = self.weight as i64;
        let gyro_angle = self.angle as i64 + change;

        self.angle = ((weight * gyro_angle + accel_angle as i64) / (weight + 1)) as i32;
        self.angle
    }

    /// Reads both sensors and advances the estimate.
    pub fn update<S: TiltSensor>(
        &mut self,
        sensor: &mut S,
        elapsed_ms: u32,
    ) -> Result<AngleHundredths, S::Error> {
        let accel_angle = sensor.accel_tilt()?;
        let raw_rate = sensor.gyro_rate()?;
        Ok(self.fuse(accel_angle, raw_rate, elapsed_ms))
    }
}
