//! WinLink operator console: entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  OperatorPanel (MatrixKeypad + LogDisplay)               │
//! │  TimerTicks (esp_timer → TimerRegistry → AtomicU8)       │
//! │  UartTransport        LogEventSink                       │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ConsoleNode (menu, tick clock, session mirror)          │
//! └──────────────────────────────────────────────────────────┘
//! ```

use anyhow::{Context, Result};
use esp_idf_hal::delay::Delay;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use winlink::adapters::eeprom::EepromAdapter;
use winlink::adapters::log_display::LogDisplay;
use winlink::adapters::log_sink::LogEventSink;
use winlink::adapters::panel::OperatorPanel;
use winlink::adapters::uart_transport::UartTransport;
use winlink::app::events::{NodeEvent, NodeRole};
use winlink::app::ports::{ConfigPort, EventSink};
use winlink::config::NodeConfig;
use winlink::drivers::hw_timer::{TimerId, TimerTicks};
use winlink::drivers::keypad::MatrixKeypad;
use winlink::error::Error;
use winlink::link::Link;
use winlink::session::ConsoleNode;

fn row(pin: AnyOutputPin) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    Ok(PinDriver::output(pin)?)
}

fn col(pin: AnyInputPin) -> Result<PinDriver<'static, AnyInputPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

fn load_config() -> winlink::error::Result<NodeConfig> {
    let mut eeprom = EepromAdapter::new()?;
    Ok(eeprom.load()?)
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("WinLink console node v{}", env!("CARGO_PKG_VERSION"));

    // Only the config lives in storage on this node.
    let config = load_config().unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        NodeConfig::default()
    });

    // Keypad GPIOs follow `pins::KEYPAD_*_GPIOS`.
    let p = Peripherals::take()?;
    let rows = [
        row(p.pins.gpio1.into())?,
        row(p.pins.gpio2.into())?,
        row(p.pins.gpio3.into())?,
        row(p.pins.gpio4.into())?,
    ];
    let cols = [
        col(p.pins.gpio5.into())?,
        col(p.pins.gpio6.into())?,
        col(p.pins.gpio7.into())?,
        col(p.pins.gpio8.into())?,
    ];
    let mut panel = OperatorPanel::new(
        MatrixKeypad::new(rows, cols, Delay::new_default()),
        LogDisplay::new(),
    );

    let mut ticks = TimerTicks::new(TimerId::Timer0, config.tick_period_ms)
        .map_err(Error::from)
        .context("tick timer")?;

    let uart = UartTransport::new(p.uart1, p.pins.gpio17.into(), p.pins.gpio18.into(), &config.link)?;
    let mut node = ConsoleNode::new(Link::new(uart, &config.link));
    let mut sink = LogEventSink::new(NodeRole::Console);
    sink.emit(&NodeEvent::Started(NodeRole::Console));

    loop {
        node.run_once(&mut panel, &mut ticks, &mut sink);
    }
}
