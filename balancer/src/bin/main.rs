#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use balance_core::balance::BalanceLoop;
use balance_core::config::Tuning;
use balance_core::mpu::Mpu;
use balance_core::startup::bring_up;
use balancer::UptimeClock;
use balancer::motors::HBridge;
use balancer::status::LedStatus;
use embassy_executor::Spawner;
use embassy_time::Delay;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::{i2c::master, time::Rate};
use log::info;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let p = esp_hal::init(config);

    let timg0 = TimerGroup::new(p.TIMG0);
    let sw_interrupt = esp_hal::interrupt::software::SoftwareInterruptControl::new(p.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    info!("Embassy initialized!");

    let i2c_config = master::Config::default().with_frequency(Rate::from_khz(400));
    let i2c = master::I2c::new(p.I2C0, i2c_config)
        .expect("i2c config")
        .with_sda(p.GPIO4)
        .with_scl(p.GPIO5);

    // BOOT button, active low
    let button = Input::new(p.GPIO9, InputConfig::default().with_pull(Pull::Up));
    let led = Output::new(p.GPIO15, Level::Low, OutputConfig::default());

    let left = (
        Output::new(p.GPIO20, Level::Low, OutputConfig::default()),
        Output::new(p.GPIO21, Level::Low, OutputConfig::default()),
    );
    let right = (
        Output::new(p.GPIO22, Level::Low, OutputConfig::default()),
        Output::new(p.GPIO23, Level::Low, OutputConfig::default()),
    );
    let motors = HBridge::new(p.MCPWM0, p.GPIO18, p.GPIO19, left, right);

    let mut imu = Mpu::new(i2c, Delay);
    let mut status = LedStatus::new(led);
    let id = bring_up(&mut imu, &mut status, || button.is_low()).expect("bring-up");
    info!("balancing with {id:?}");

    let balance = BalanceLoop::start(imu, motors, UptimeClock, Delay, Tuning::DEFAULT)
        .expect("initial tilt reading");
    let Err(e) = balance.run();
    panic!("balance loop stopped: {e}");
}
