//! One-time bring-up before balancing starts.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::info;

use crate::Status;
use crate::config::{ACCEL_LPF, BUTTON_POLL_MS, GYRO_LPF, SETTLE_MS};
use crate::mpu::{DeviceId, Error, Mpu};

/// Waits for the operator, finds the sensor and calibrates its gyro.
///
/// `start_pressed` is polled every [`BUTTON_POLL_MS`]. If no supported
/// device answers, the miss is reported and the sequence waits for the
/// next press. A gyro too unsteady to calibrate is reported and leaves the
/// hardware offsets cleared; any bus error aborts.
pub fn bring_up<I2C, D, E, S>(
    mpu: &mut Mpu<I2C, D>,
    status: &mut S,
    mut start_pressed: impl FnMut() -> bool,
) -> Result<DeviceId, Error<E>>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
    S: Status,
{
    status.awaiting_start();
    let id = loop {
        while !start_pressed() {
            mpu.delay().delay_ms(BUTTON_POLL_MS);
        }
        match mpu.identify()? {
            Some(id) => break id,
            None => status.sensor_missing(),
        }
    };
    status.sensor_found(id);

    mpu.reset_and_configure(GYRO_LPF, ACCEL_LPF)?;
    mpu.delay().delay_ms(SETTLE_MS);

    match mpu.compute_gyro_bias() {
        Ok(stats) => {
            status.calibrated(&stats);
            mpu.set_gyro_bias(stats.mean)?;
        }
        Err(Error::Unsteady(stats)) => status.calibration_failed(&stats),
        Err(e) => return Err(e),
    }

    info!("bring-up done");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::config::CALIBRATION_SAMPLES;
    use crate::mpu::{GyroStatistics, WHO_AM_I, XG_OFFSET_H, ZG_OFFSET_H};
    use crate::testing::{FakeBus, FakeDelay, FakeStatus, StatusEvent};

    fn bus(who_am_i: u8, gyro: &[[i16; 3]]) -> FakeBus {
        let mut bus = FakeBus::default();
        bus.registers[WHO_AM_I as usize] = who_am_i;
        bus.gyro.extend(gyro.iter().copied());
        bus
    }

    fn mpu(who_am_i: u8, gyro: &[[i16; 3]]) -> Mpu<FakeBus, FakeDelay> {
        Mpu::new(bus(who_am_i, gyro), FakeDelay::default())
    }

    fn offsets(writes: &[(u8, u8)]) -> Vec<(u8, u8)> {
        writes
            .iter()
            .copied()
            .filter(|(reg, _)| (XG_OFFSET_H..=ZG_OFFSET_H + 1).contains(reg))
            .collect()
    }

    #[test]
    fn calibrates_and_programs_bias() {
        let mut imu = mpu(0x71, &[[10, -4, 0]]);
        let mut status = FakeStatus::default();

        let id = bring_up(&mut imu, &mut status, || true).unwrap();
        assert_eq!(id, DeviceId::Mpu9250);

        let stats = GyroStatistics {
            mean: [10, -4, 0],
            variance: [0; 3],
        };
        assert_eq!(
            status.events,
            vec![
                StatusEvent::AwaitingStart,
                StatusEvent::Found(DeviceId::Mpu9250),
                StatusEvent::Calibrated(stats),
            ]
        );
        assert_eq!(imu.bias(), [10, -4, 0]);

        let (bus, delay) = imu.release();
        assert_eq!(
            offsets(&bus.writes),
            vec![
                // cleared before sampling
                (0x13, 0x00),
                (0x14, 0x00),
                (0x15, 0x00),
                (0x16, 0x00),
                (0x17, 0x00),
                (0x18, 0x00),
                // -2 * bias
                (0x13, 0xff),
                (0x14, 0xec),
                (0x15, 0x00),
                (0x16, 0x08),
                (0x17, 0x00),
                (0x18, 0x00),
            ]
        );
        // settle plus one pause per sample
        assert_eq!(delay.total_ms(), SETTLE_MS as u64 + CALIBRATION_SAMPLES as u64);
    }

    #[test]
    fn waits_for_button() {
        let mut imu = mpu(0x70, &[]);
        let mut status = FakeStatus::default();
        let mut polls = 0;

        bring_up(&mut imu, &mut status, || {
            polls += 1;
            polls > 3
        })
        .unwrap();

        assert_eq!(polls, 4);
        let (_, delay) = imu.release();
        assert_eq!(
            delay.total_ms(),
            3 * BUTTON_POLL_MS as u64 + SETTLE_MS as u64 + CALIBRATION_SAMPLES as u64
        );
    }

    #[test]
    fn missing_sensor_waits_for_next_press() {
        let mut bus = bus(0x00, &[]);
        bus.who_am_i.extend([0x68, 0x70]);
        let mut imu = Mpu::new(bus, FakeDelay::default());
        let mut status = FakeStatus::default();
        let mut presses = 0;

        let id = bring_up(&mut imu, &mut status, || {
            presses += 1;
            true
        })
        .unwrap();

        assert_eq!(id, DeviceId::Mpu6500);
        assert_eq!(presses, 2);
        assert_eq!(
            &status.events[..3],
            &[
                StatusEvent::AwaitingStart,
                StatusEvent::Missing,
                StatusEvent::Found(DeviceId::Mpu6500),
            ]
        );
    }

    #[test]
    fn unsteady_gyro_is_reported_and_skipped() {
        let gyro: Vec<[i16; 3]> = (0..CALIBRATION_SAMPLES)
            .map(|i| if i % 2 == 0 { [0, 20, 0] } else { [0, -20, 0] })
            .collect();
        let mut imu = mpu(0x73, &gyro);
        let mut status = FakeStatus::default();

        assert_eq!(
            bring_up(&mut imu, &mut status, || true).unwrap(),
            DeviceId::Mpu9255
        );

        let stats = GyroStatistics {
            mean: [0; 3],
            variance: [0, 400, 0],
        };
        assert_eq!(
            status.events.last(),
            Some(&StatusEvent::CalibrationFailed(stats))
        );
        assert_eq!(imu.bias(), [0; 3]);

        // only the clearing writes
        let (bus, _) = imu.release();
        assert_eq!(offsets(&bus.writes).len(), 6);
        assert!(offsets(&bus.writes).iter().all(|&(_, val)| val == 0));
    }

    #[test]
    fn status_events_are_optional() {
        let mut imu = mpu(0x71, &[[3, 3, 3]]);

        assert_eq!(
            bring_up(&mut imu, &mut (), || true).unwrap(),
            DeviceId::Mpu9250
        );
        assert_eq!(imu.bias(), [3, 3, 3]);
    }

    #[test]
    fn bus_error_aborts() {
        let mut bus = bus(0x71, &[]);
        bus.fail = true;
        let mut imu = Mpu::new(bus, FakeDelay::default());
        let mut status = FakeStatus::default();

        assert!(matches!(
            bring_up(&mut imu, &mut status, || true),
            Err(Error::I2c(_))
        ));
        assert_eq!(status.events, vec![StatusEvent::AwaitingStart]);
    }
}
