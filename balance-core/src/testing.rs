// Hardware stand-ins for unit tests.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use crate::mpu::{
    ACCEL_XOUT_H, ACCEL_YOUT_H, ACCEL_ZOUT_H, ADDRESS, DeviceId, GYRO_XOUT_H, GYRO_YOUT_H,
    GYRO_ZOUT_H, GyroStatistics, WHO_AM_I,
};
use crate::tilt::TiltSensor;
use crate::{AngleHundredths, Clock, Motors, Status};

/// MPU register file.
///
/// Gyro triples are consumed from `gyro` one per read of the X register; once
/// the queue runs dry the last triple repeats. `who_am_i` works the same way
/// for the identity register.
pub struct FakeBus {
    pub registers: Vec<u8>,
    pub who_am_i: VecDeque<u8>,
    pub writes: Vec<(u8, u8)>,
    pub gyro: VecDeque<[i16; 3]>,
    pub accel: [i16; 3],
    pub fail: bool,
    current_gyro: [i16; 3],
    pointer: u8,
}

impl Default for FakeBus {
    fn default() -> Self {
        Self {
            registers: std::vec![0; 128],
            who_am_i: VecDeque::new(),
            writes: Vec::new(),
            gyro: VecDeque::new(),
            accel: [0; 3],
            fail: false,
            current_gyro: [0; 3],
            pointer: 0,
        }
    }
}

impl FakeBus {
    fn sample(&mut self, reg: u8) -> Option<i16> {
        if reg == GYRO_XOUT_H {
            if let Some(next) = self.gyro.pop_front() {
                self.current_gyro = next;
            }
        }
        match reg {
            GYRO_XOUT_H => Some(self.current_gyro[0]),
            GYRO_YOUT_H => Some(self.current_gyro[1]),
            GYRO_ZOUT_H => Some(self.current_gyro[2]),
            ACCEL_XOUT_H => Some(self.accel[0]),
            ACCEL_YOUT_H => Some(self.accel[1]),
            ACCEL_ZOUT_H => Some(self.accel[2]),
            _ => None,
        }
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        assert_eq!(address, ADDRESS);
        if self.fail {
            return Err(ErrorKind::Bus);
        }

        for operation in operations {
            match operation {
                Operation::Write([reg]) => self.pointer = *reg,
                Operation::Write([reg, val]) => self.writes.push((*reg, *val)),
                Operation::Write(bytes) => panic!("unexpected write {bytes:?}"),
                Operation::Read(buf) => {
                    let reg = self.pointer;
                    if reg == WHO_AM_I {
                        if let Some(id) = self.who_am_i.pop_front() {
                            self.registers[reg as usize] = id;
                        }
                    }
                    match (buf.len(), self.sample(reg)) {
                        (2, Some(v)) => buf.copy_from_slice(&v.to_be_bytes()),
                        (1, _) => buf[0] = self.registers[reg as usize],
                        (len, _) => panic!("unexpected {len} byte read of 0x{reg:02x}"),
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDelay {
    pub total_ns: u64,
}

impl FakeDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCall {
    Drive(i16, i16),
    Stop,
}

#[derive(Default)]
pub struct FakeMotors {
    pub calls: Vec<MotorCall>,
}

impl Motors for FakeMotors {
    fn drive(&mut self, left: i16, right: i16) {
        self.calls.push(MotorCall::Drive(left, right));
    }

    fn stop(&mut self) {
        self.calls.push(MotorCall::Stop);
    }
}

/// Clock that advances by a scripted step on every read.
pub struct FakeClock {
    pub now: u64,
    pub steps: VecDeque<u64>,
}

impl FakeClock {
    pub fn new(start: u64, steps: &[u64]) -> Self {
        Self {
            now: start,
            steps: steps.iter().copied().collect(),
        }
    }
}

impl Clock for FakeClock {
    fn now_ms(&mut self) -> u64 {
        let now = self.now;
        if let Some(step) = self.steps.pop_front() {
            self.now += step;
        }
        now
    }
}

/// Scripted tilt readings, repeats the last one when exhausted.
#[derive(Default)]
pub struct FakeTilt {
    pub accel: VecDeque<AngleHundredths>,
    pub rate: VecDeque<i32>,
    pub fail: bool,
    last_accel: AngleHundredths,
    last_rate: i32,
}

impl FakeTilt {
    pub fn new(accel: &[AngleHundredths], rate: &[i32]) -> Self {
        Self {
            accel: accel.iter().copied().collect(),
            rate: rate.iter().copied().collect(),
            ..Default::default()
        }
    }
}

impl TiltSensor for FakeTilt {
    type Error = ErrorKind;

    fn accel_tilt(&mut self) -> Result<AngleHundredths, Self::Error> {
        if self.fail {
            return Err(ErrorKind::Bus);
        }
        if let Some(next) = self.accel.pop_front() {
            self.last_accel = next;
        }
        Ok(self.last_accel)
    }

    fn gyro_rate(&mut self) -> Result<i32, Self::Error> {
        if self.fail {
            return Err(ErrorKind::Bus);
        }
        if let Some(next) = self.rate.pop_front() {
            self.last_rate = next;
        }
        Ok(self.last_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    AwaitingStart,
    Found(DeviceId),
    Missing,
    Calibrated(GyroStatistics),
    CalibrationFailed(GyroStatistics),
}

#[derive(Default)]
pub struct FakeStatus {
    pub events: Vec<StatusEvent>,
}

impl Status for FakeStatus {
    fn awaiting_start(&mut self) {
        self.events.push(StatusEvent::AwaitingStart);
    }

    fn sensor_found(&mut self, id: DeviceId) {
        self.events.push(StatusEvent::Found(id));
    }

    fn sensor_missing(&mut self) {
        self.events.push(StatusEvent::Missing);
    }

    fn calibrated(&mut self, stats: &GyroStatistics) {
        self.events.push(StatusEvent::Calibrated(*stats));
    }

    fn calibration_failed(&mut self, stats: &GyroStatistics) {
        self.events.push(StatusEvent::CalibrationFailed(*stats));
    }
}
