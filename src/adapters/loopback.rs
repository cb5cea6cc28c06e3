//! In-memory duplex link between two nodes.
//!
//! Two bounded `embassy-sync` channels, one per direction, shared by the
//! two ends of the pair. Each end is a [`Transport`], so a sensor node and
//! a console node can run on two threads of one process and talk exactly
//! as they would over the UART.
//!
//! ```text
//! ┌──────────────┐   a → b   ┌──────────────┐
//! │  end A       │──────────▶│  end B       │
//! │              │◀──────────│              │
//! └──────────────┘   b → a   └──────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::link::Transport;

/// Bytes buffered per direction, roughly a UART FIFO.
pub const LOOPBACK_DEPTH: usize = 128;

type Pipe = Channel<CriticalSectionRawMutex, u8, LOOPBACK_DEPTH>;

/// How often an idle read re-checks its queue within one poll interval.
const IDLE_STEP: Duration = Duration::from_micros(200);

pub struct LoopbackTransport {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
    /// Set on the sending end to drop everything it writes.
    muted: Arc<AtomicBool>,
    poll_interval: Duration,
}

/// Create the two connected ends.
pub fn loopback_pair(poll_interval_ms: u32) -> (LoopbackTransport, LoopbackTransport) {
    let a_to_b = Arc::new(Pipe::new());
    let b_to_a = Arc::new(Pipe::new());
    let poll_interval = Duration::from_millis(u64::from(poll_interval_ms));
    let a = LoopbackTransport {
        rx: Arc::clone(&b_to_a),
        tx: Arc::clone(&a_to_b),
        muted: Arc::new(AtomicBool::new(false)),
        poll_interval,
    };
    let b = LoopbackTransport {
        rx: a_to_b,
        tx: b_to_a,
        muted: Arc::new(AtomicBool::new(false)),
        poll_interval,
    };
    (a, b)
}

impl LoopbackTransport {
    /// Drop every byte this end writes from now on, as if its TX wire were
    /// cut. Returns a handle so another thread can cut the wire mid-session.
    pub fn mute_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.muted)
    }

    /// Queue `bytes` on this end's receive side, as if they arrived on the
    /// wire. Returns how many fit.
    pub fn inject(&self, bytes: &[u8]) -> usize {
        bytes.iter().take_while(|&&b| self.rx.try_send(b).is_ok()).count()
    }

    /// Bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for LoopbackTransport {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let deadline = Instant::now() + self.poll_interval;
        loop {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.try_receive() {
                    Ok(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    Err(_) => break,
                }
            }
            if n > 0 || Instant::now() >= deadline {
                return Ok(n);
            }
            std::thread::sleep(IDLE_STEP);
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if self.muted.load(Ordering::Acquire) {
            return Ok(data.len());
        }
        Ok(data.iter().take_while(|&&b| self.tx.try_send(b).is_ok()).count())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
