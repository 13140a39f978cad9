use log::{info, warn};

use crate::config::Tuning;
use crate::{AngleHundredths, Motors};

pub const MOTOR_MIN: i16 = -1024;
pub const MOTOR_MAX: i16 = 1023;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub motor_enabled: bool,
    pub last_error: AngleHundredths,
    /// Never accumulated, the law is PD only. Zeroed together with
    /// `last_error` when the vehicle falls.
    pub integral_error: AngleHundredths,
}

/// What a single controller step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Disabled and outside the enable deadband, motors untouched.
    Idle,
    /// Just entered the deadband, motors start with the next step.
    Armed,
    /// Left the fall threshold, motors were stopped.
    Fallen,
    Drive { left: i16, right: i16 },
}

/// PD balance law with fall detection.
pub struct BalanceController {
    tuning: Tuning,
    state: ControllerState,
}

impl BalanceController {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            state: ControllerState::default(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Runs one iteration for the latest `estimate`.
    ///
    /// `elapsed_ms` is the measured time since the previous step. A zero
    /// period is treated as 1ms for the derivative.
    pub fn step<M: Motors>(
        &mut self,
        estimate: AngleHundredths,
        elapsed_ms: u32,
        motors: &mut M,
    ) -> Command {
        let error = estimate - self.tuning.target_angle;

        if self.state.motor_enabled && error.abs() > self.tuning.fall_threshold {
            self.state = ControllerState::default();
            motors.stop();
            warn!("fallen at {estimate}, motors stopped");
            return Command::Fallen;
        }

        if self.state.motor_enabled {
            let (left, right) = self.drive(error, elapsed_ms);
            motors.drive(left, right);
            Command::Drive { left, right }
        } else if error.abs() <= self.tuning.enable_deadband {
            self.state.motor_enabled = true;
            info!("upright at {estimate}, motors enabled");
            Command::Armed
        } else {
            Command::Idle
        }
    }

    fn drive(&mut self, error: AngleHundredths, elapsed_ms: u32) -> (i16, i16) {
        let elapsed_ms = elapsed_ms.max(1) as i64;
        let d_error = (error - self.state.last_error) as i64 * 1000 / elapsed_ms;
        self.state.last_error = error;

        let effort = error as i64 * self.tuning.kp as i64 + d_error * self.tuning.kd as i64;
        let out = effort / 1000;
        let bias = self.tuning.motor_bias as i64;

        (clamp(out + bias), clamp(out - bias))
    }
}

fn clamp(value: i64) -> i16 {
    value.clamp(MOTOR_MIN as i64, MOTOR_MAX as i64) as i16
}
