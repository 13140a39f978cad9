use balance_core::Motors;
use esp_hal::{
    gpio::{Output, interconnect::PeripheralOutput},
    mcpwm::{
        McPwm, PeripheralClockConfig, PwmPeripheral,
        operator::{PwmPin, PwmPinConfig},
        timer::PwmWorkingMode,
    },
    time::Rate,
};

/// Timer period, 1024 duty steps.
const PERIOD: u16 = 1023;

/// One side of the L293D: PWM on the enable line, direction on the inputs.
struct Channel<PWM: 'static, const IS_A: bool> {
    enable: PwmPin<'static, PWM, 0, IS_A>,
    forward: Output<'static>,
    backward: Output<'static>,
}

impl<PWM: PwmPeripheral + 'static, const IS_A: bool> Channel<PWM, IS_A> {
    fn set(&mut self, speed: i16) {
        match speed.signum() {
            1 => {
                self.backward.set_low();
                self.forward.set_high();
            }
            -1 => {
                self.forward.set_low();
                self.backward.set_high();
            }
            _ => {
                self.forward.set_low();
                self.backward.set_low();
            }
        }
        self.enable.set_timestamp(speed.unsigned_abs().min(PERIOD));
    }
}

/// Dual H-bridge. Both enable lines share MCPWM operator 0.
pub struct HBridge<PWM: 'static> {
    left: Channel<PWM, true>,
    right: Channel<PWM, false>,
}

impl<PWM: PwmPeripheral + 'static> HBridge<PWM> {
    /// `left` and `right` are the forward/backward direction outputs of
    /// each side.
    pub fn new(
        mcpwm: PWM,
        left_enable: impl PeripheralOutput<'static>,
        right_enable: impl PeripheralOutput<'static>,
        left: (Output<'static>, Output<'static>),
        right: (Output<'static>, Output<'static>),
    ) -> Self {
        let clock_cfg = PeripheralClockConfig::with_frequency(Rate::from_mhz(32))
            .expect("motor peripheral clock config");
        let mut mcpwm = McPwm::new(mcpwm, clock_cfg);

        mcpwm.operator0.set_timer(&mcpwm.timer0);
        let (mut left_enable, mut right_enable) = mcpwm.operator0.with_pins(
            left_enable,
            PwmPinConfig::UP_ACTIVE_HIGH,
            right_enable,
            PwmPinConfig::UP_ACTIVE_HIGH,
        );
        left_enable.set_timestamp(0);
        right_enable.set_timestamp(0);

        // 32MHz / 2 / 1024
        let timer_clock_cfg = clock_cfg
            .timer_clock_with_frequency(PERIOD, PwmWorkingMode::Increase, Rate::from_hz(15_625))
            .expect("motor pwm clock config");
        mcpwm.timer0.start(timer_clock_cfg);

        let mut bridge = Self {
            left: Channel {
                enable: left_enable,
                forward: left.0,
                backward: left.1,
            },
            right: Channel {
                enable: right_enable,
                forward: right.0,
                backward: right.1,
            },
        };
        bridge.stop();
        bridge
    }
}

impl<PWM: PwmPeripheral + 'static> Motors for HBridge<PWM> {
    fn drive(&mut self, left: i16, right: i16) {
        self.left.set(left);
        self.right.set(right);
    }

    /// Coast, both sides undriven.
    fn stop(&mut self) {
        self.left.set(0);
        self.right.set(0);
    }
}
