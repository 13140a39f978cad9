use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::config::Tuning;
use crate::controller::{BalanceController, Command};
use crate::tilt::{TiltEstimator, TiltSensor};
use crate::{AngleHundredths, Clock, Motors};

/// The running balance loop.
///
/// Each step reads the clock, updates the tilt estimate from the sensor,
/// runs the controller (which commands the motors) and then pauses.
pub struct BalanceLoop<S, M, C, D> {
    sensor: S,
    motors: M,
    clock: C,
    delay: D,
    estimator: TiltEstimator,
    controller: BalanceController,
    last_ms: u64,
    pause_ms: u32,
}

impl<S, M, C, D> BalanceLoop<S, M, C, D>
where
    S: TiltSensor,
    M: Motors,
    C: Clock,
    D: DelayNs,
{
    /// Seeds the estimate from one accelerometer reading and starts timing.
    pub fn start(
        mut sensor: S,
        motors: M,
        mut clock: C,
        delay: D,
        tuning: Tuning,
    ) -> Result<Self, S::Error> {
        let estimator = TiltEstimator::start(&mut sensor, tuning.filter_weight)?;
        let last_ms = clock.now_ms();

        Ok(Self {
            sensor,
            motors,
            clock,
            delay,
            estimator,
            controller: BalanceController::new(tuning),
            last_ms,
            pause_ms: tuning.loop_pause_ms,
        })
    }

    pub fn angle(&self) -> AngleHundredths {
        self.estimator.angle()
    }

    pub fn controller(&self) -> &BalanceController {
        &self.controller
    }

    pub fn step(&mut self) -> Result<Command, S::Error> {
        let now = self.clock.now_ms();
        let elapsed_ms = u32::try_from(now.saturating_sub(self.last_ms)).unwrap_or(u32::MAX);
        self.last_ms = now;

        let angle = self.estimator.update(&mut self.sensor, elapsed_ms)?;
        let command = self.controller.step(angle, elapsed_ms, &mut self.motors);

        self.delay.delay_ms(self.pause_ms);
        Ok(command)
    }

    /// Runs until the sensor fails, stopping the motors on the way out.
    pub fn run(mut self) -> Result<Infallible, S::Error> {
        loop {
            if let Err(e) = self.step() {
                self.motors.stop();
                return Err(e);
            }
        }
    }

    pub fn release(self) -> (S, M, C, D) {
        (self.sensor, self.motors, self.clock, self.delay)
    }
}
