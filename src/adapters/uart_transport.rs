//! UART transport for the inter-node link (ESP-IDF only).
//!
//! Wraps an `esp-idf-hal` [`UartDriver`] configured 8N1 at the link baud
//! rate. One `read` call waits at most the configured poll interval, which
//! is what the link's bounded waits count.

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::uart::{self, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::EspError;
use log::info;

use crate::config::LinkConfig;
use crate::link::Transport;

pub struct UartTransport<'d> {
    driver: UartDriver<'d>,
    poll_ticks: u32,
}

impl<'d> UartTransport<'d> {
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx: AnyIOPin,
        rx: AnyIOPin,
        config: &LinkConfig,
    ) -> Result<Self, EspError> {
        let uart_cfg = uart::config::Config::default().baudrate(Hertz(config.baud_rate));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_cfg,
        )?;
        info!("UartTransport: {} baud, 8N1", config.baud_rate);
        Ok(Self {
            driver,
            poll_ticks: TickType::new_millis(u64::from(config.poll_interval_ms)).ticks(),
        })
    }
}

impl Transport for UartTransport<'_> {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.driver.read(buf, self.poll_ticks)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.driver.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        self.driver.wait_tx_done(self.poll_ticks)
    }
}
