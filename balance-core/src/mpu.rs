//! InvenSense MPU-6500 / MPU-9250 / MPU-9255 over I2C.
//!
//! Only the handful of registers needed for balancing: identification,
//! reset, full scale and low pass configuration, raw gyro and accelerometer
//! samples and the gyro offset registers.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::config::{CALIBRATION_PAUSE_MS, CALIBRATION_SAMPLES, MAX_GYRO_VARIANCE};

pub const ADDRESS: u8 = 0x68;

pub const XG_OFFSET_H: u8 = 0x13;
pub const YG_OFFSET_H: u8 = 0x15;
pub const ZG_OFFSET_H: u8 = 0x17;

pub const CONFIG: u8 = 0x1a;
pub const GYRO_CONFIG: u8 = 0x1b;
pub const ACCEL_CONFIG: u8 = 0x1c;
pub const ACCEL_CONFIG2: u8 = 0x1d;

pub const ACCEL_XOUT_H: u8 = 0x3b;
pub const ACCEL_YOUT_H: u8 = 0x3d;
pub const ACCEL_ZOUT_H: u8 = 0x3f;

pub const GYRO_XOUT_H: u8 = 0x43;
pub const GYRO_YOUT_H: u8 = 0x45;
pub const GYRO_ZOUT_H: u8 = 0x47;

pub const SIGNAL_PATH_RESET: u8 = 0x68;
pub const USER_CTRL: u8 = 0x6a;
pub const PWR_MGMT_1: u8 = 0x6b;
pub const WHO_AM_I: u8 = 0x75;

const H_RESET: u8 = 0x80; // internal 20MHz clock
const GYRO_RST: u8 = 0b100;
const ACCEL_RST: u8 = 0b010;
const TEMP_RST: u8 = 0b001;
const SIG_COND_RST: u8 = 0b1;
const GYRO_FS_2000DPS: u8 = 0b11 << 3; // DLPF on
const ACCEL_FS_16G: u8 = 0b11 << 3;

const MAX_LPF: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceId {
    Mpu6500 = 0x70,
    Mpu9250 = 0x71,
    Mpu9255 = 0x73,
}

impl DeviceId {
    pub fn from_who_am_i(id: u8) -> Option<Self> {
        match id {
            0x70 => Some(Self::Mpu6500),
            0x71 => Some(Self::Mpu9250),
            0x73 => Some(Self::Mpu9255),
            _ => None,
        }
    }
}

/// Per axis mean and population variance of a window of raw gyro samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GyroStatistics {
    pub mean: [i32; 3],
    pub variance: [i32; 3],
}

impl GyroStatistics {
    /// Means and variances truncate towards zero.
    ///
    /// # Panics
    ///
    /// If `samples` is empty.
    pub fn from_samples(samples: &[[i16; 3]]) -> Self {
        assert!(!samples.is_empty(), "no samples");
        let n = samples.len() as i64;

        let sums = samples.iter().fold([0i64; 3], |mut acc, sample| {
            for axis in 0..3 {
                acc[axis] += sample[axis] as i64;
            }
            acc
        });
        let mean = sums.map(|sum| sum / n);

        let squares = samples.iter().fold([0i64; 3], |mut acc, sample| {
            for axis in 0..3 {
                let d = sample[axis] as i64 - mean[axis];
                acc[axis] += d * d;
            }
            acc
        });

        Self {
            mean: mean.map(|m| m as i32),
            variance: squares.map(|s| (s / n) as i32),
        }
    }

    /// True if every axis variance is strictly below `max_variance`.
    pub fn is_steady(&self, max_variance: i32) -> bool {
        self.variance.iter().all(|&v| v < max_variance)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error<E: core::fmt::Debug> {
    #[error("I2c error: {0:?}")]
    I2c(E),

    #[error("Gyro too unsteady to calibrate, variance {:?}", .0.variance)]
    Unsteady(GyroStatistics),
}

pub struct Mpu<I2C, D> {
    bus: I2C,
    delay: D,
    bias: [i32; 3],
}

impl<I2C, D, E> Mpu<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    pub fn new(bus: I2C, delay: D) -> Self {
        Self {
            bus,
            delay,
            bias: [0; 3],
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.bus, self.delay)
    }

    /// Pacing primitive shared with the bring-up sequence.
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Last bias accepted by [`Self::compute_gyro_bias`].
    pub fn bias(&self) -> [i32; 3] {
        self.bias
    }

    /// Looks for a MPU-6500, MPU-9250 or MPU-9255.
    pub fn identify(&mut self) -> Result<Option<DeviceId>, Error<E>> {
        let id = self.read_u8(WHO_AM_I)?;
        debug!("[MPU] who am i: 0x{id:02x}");
        Ok(DeviceId::from_who_am_i(id))
    }

    /// Resets the device and configures the gyroscope to ±2000°/s and the
    /// accelerometer to ±16g.
    ///
    /// The low pass settings control how sensitive the sensors are to quick
    /// changes, in order of increasing sensitivity: 6, 5, 4, 3, 2, 1, 0, 7.
    ///
    /// | setting | gyro bandwidth | gyro delay | accel bandwidth | accel delay |
    /// |---------|----------------|------------|-----------------|-------------|
    /// | 7       | 3600Hz         | 0.17ms     | 420Hz           | 1.38ms      |
    /// | 0       | 250Hz          | 0.97ms     | 218.1Hz         | 1.88ms      |
    /// | 1       | 184Hz          | 2.9ms      | 218.1Hz         | 1.88ms      |
    /// | 2       | 92Hz           | 3.9ms      | 99Hz            | 2.88ms      |
    /// | 3       | 41Hz           | 5.9ms      | 44.8Hz          | 4.88ms      |
    /// | 4       | 20Hz           | 9.9ms      | 21.2Hz          | 8.87ms      |
    /// | 5       | 10Hz           | 17.85ms    | 10.2Hz          | 16.83ms     |
    /// | 6       | 5Hz            | 33.48ms    | 5.05Hz          | 32.48ms     |
    ///
    /// # Panics
    ///
    /// If either setting is above 7.
    pub fn reset_and_configure(&mut self, gyro_lpf: u8, accel_lpf: u8) -> Result<(), Error<E>> {
        assert!(gyro_lpf <= MAX_LPF, "gyro_lpf must be between 0 and 7");
        assert!(accel_lpf <= MAX_LPF, "accel_lpf must be between 0 and 7");

        self.write_u8(PWR_MGMT_1, H_RESET)?;
        self.write_u8(SIGNAL_PATH_RESET, GYRO_RST | ACCEL_RST | TEMP_RST)?;
        self.write_u8(USER_CTRL, SIG_COND_RST)?;
        self.write_u8(CONFIG, gyro_lpf)?;
        self.write_u8(GYRO_CONFIG, GYRO_FS_2000DPS)?;
        self.write_u8(ACCEL_CONFIG, ACCEL_FS_16G)?;
        self.write_u8(ACCEL_CONFIG2, accel_lpf)?;
        Ok(())
    }

    pub fn read_gyro(&mut self) -> Result<[i16; 3], Error<E>> {
        Ok([
            self.read_i16(GYRO_XOUT_H)?,
            self.read_i16(GYRO_YOUT_H)?,
            self.read_i16(GYRO_ZOUT_H)?,
        ])
    }

    pub fn read_accel(&mut self) -> Result<[i16; 3], Error<E>> {
        Ok([
            self.read_i16(ACCEL_XOUT_H)?,
            self.read_i16(ACCEL_YOUT_H)?,
            self.read_i16(ACCEL_ZOUT_H)?,
        ])
    }

    /// Measures the gyro bias as the mean of [`CALIBRATION_SAMPLES`] samples.
    ///
    /// The hardware offsets are cleared first so the samples show the raw
    /// bias. Fails with [`Error::Unsteady`] if any axis variance reaches
    /// [`MAX_GYRO_VARIANCE`], in which case the stored bias is kept.
    pub fn compute_gyro_bias(&mut self) -> Result<GyroStatistics, Error<E>> {
        self.write_offsets([0; 3])?;

        let mut samples = [[0i16; 3]; CALIBRATION_SAMPLES];
        for sample in samples.iter_mut() {
            *sample = self.read_gyro()?;
            self.delay.delay_ms(CALIBRATION_PAUSE_MS);
        }

        let stats = GyroStatistics::from_samples(&samples);
        if !stats.is_steady(MAX_GYRO_VARIANCE) {
            return Err(Error::Unsteady(stats));
        }

        info!("[MPU] gyro bias {:?}", stats.mean);
        self.bias = stats.mean;
        Ok(stats)
    }

    /// Programs the hardware offsets to cancel `bias`.
    ///
    /// Offset registers count in half raw units, hence `-2 * bias`.
    pub fn set_gyro_bias(&mut self, bias: [i32; 3]) -> Result<(), Error<E>> {
        self.write_offsets(bias.map(|b| -2 * b))
    }

    fn write_offsets(&mut self, offsets: [i32; 3]) -> Result<(), Error<E>> {
        let [x, y, z] = offsets;
        self.write_i16(XG_OFFSET_H, x)?;
        self.write_i16(YG_OFFSET_H, y)?;
        self.write_i16(ZG_OFFSET_H, z)?;
        Ok(())
    }

    fn read_u8(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8];
        self.bus
            .write_read(ADDRESS, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    fn read_i16(&mut self, reg: u8) -> Result<i16, Error<E>> {
        let mut buf = [0u8; 2];
        self.bus
            .write_read(ADDRESS, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        let v = i16::from_be_bytes(buf);

        debug!("[MPU] read(0x{reg:02x}) => {v}");
        Ok(v)
    }

    fn write_u8(&mut self, reg: u8, val: u8) -> Result<(), Error<E>> {
        debug!("[MPU] write(0x{reg:02x}) => 0x{val:02x}");
        self.bus.write(ADDRESS, &[reg, val]).map_err(Error::I2c)
    }

    // high byte at `reg`, low byte at `reg + 1`, truncated to 16 bits
    fn write_i16(&mut self, reg: u8, val: i32) -> Result<(), Error<E>> {
        let [hi, lo] = (val as u16).to_be_bytes();
        self.write_u8(reg, hi)?;
        self.write_u8(reg + 1, lo)
    }
}
