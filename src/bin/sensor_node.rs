//! WinLink sensor/actuator node: entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  SensorBoard          EepromAdapter     LogEventSink     │
//! │  (Sensor+Button+Motor)(Storage+Config)  (EventSink)      │
//! │  UartTransport                                           │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │     SensorNode (session runner, pure logic)        │  │
//! │  │     Link · FaultCounterStore · BreachDetector      │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

use anyhow::{Context, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use winlink::adapters::eeprom::EepromAdapter;
use winlink::adapters::hardware::SensorBoard;
use winlink::adapters::log_sink::LogEventSink;
use winlink::adapters::uart_transport::UartTransport;
use winlink::app::events::{NodeEvent, NodeRole};
use winlink::app::ports::{ConfigPort, EventSink};
use winlink::config::NodeConfig;
use winlink::drivers::hw_init;
use winlink::error::Error;
use winlink::drivers::motor::WindowMotor;
use winlink::faults::{FaultCounterStore, Thresholds};
use winlink::link::Link;
use winlink::pins;
use winlink::sensors::SensorHub;
use winlink::sensors::lm35::Lm35Sensor;
use winlink::sensors::ultrasonic::UltrasonicSensor;
use winlink::session::SensorNode;

type DirPin = PinDriver<'static, AnyOutputPin, Output>;

fn output(pin: AnyOutputPin) -> Result<DirPin> {
    Ok(PinDriver::output(pin)?)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("WinLink sensor node v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Raw peripherals (ADC, buttons, ultrasonic) ─────────
    hw_init::init_peripherals()
        .map_err(Error::from)
        .context("HAL init failed")?;
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {} (distance will not update)", e);
    }

    // ── 3. Storage and config ─────────────────────────────────
    let mut eeprom = EepromAdapter::new()
        .map_err(Error::from)
        .context("storage init failed")?;
    let config = eeprom.load().map_err(Error::from).unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        NodeConfig::default()
    });

    // ── 4. Window motors ──────────────────────────────────────
    // GPIO numbers below follow `pins::W*_GPIO`.
    let p = Peripherals::take()?;
    let pwm_timer = LedcTimerDriver::new(
        p.ledc.timer0,
        &TimerConfig::default().frequency(Hertz(pins::MOTOR_PWM_FREQ_HZ)),
    )?;
    let window1 = WindowMotor::new(
        output(p.pins.gpio1.into())?,
        output(p.pins.gpio2.into())?,
        LedcDriver::new(p.ledc.channel0, &pwm_timer, p.pins.gpio3)?,
        config.motor_duty_percent,
    )
    .map_err(Error::from)
    .context("window 1")?;
    let window2 = WindowMotor::new(
        output(p.pins.gpio4.into())?,
        output(p.pins.gpio5.into())?,
        LedcDriver::new(p.ledc.channel1, &pwm_timer, p.pins.gpio10)?,
        config.motor_duty_percent,
    )
    .map_err(Error::from)
    .context("window 2")?;

    let hub = SensorHub::new(
        Lm35Sensor::new(pins::LM35_ADC1_CHANNEL),
        UltrasonicSensor::new(pins::US_TRIGGER_GPIO),
    );
    let mut board = SensorBoard::new(hub, window1, window2);

    // ── 5. Link ───────────────────────────────────────────────
    let uart = UartTransport::new(p.uart1, p.pins.gpio17.into(), p.pins.gpio18.into(), &config.link)?;
    let link = Link::new(uart, &config.link);

    // ── 6. Session loop ───────────────────────────────────────
    let store = FaultCounterStore::new(eeprom, config.storage_retries);
    let mut node = SensorNode::new(link, store, Thresholds::from(&config));
    let mut sink = LogEventSink::new(NodeRole::Sensor);
    sink.emit(&NodeEvent::Started(NodeRole::Sensor));

    loop {
        if let Err(e) = node.serve_once(&mut board, &mut sink) {
            warn!("LINK | idle wait failed: {}", e);
            FreeRtos::delay_ms(100);
        }
    }
}
