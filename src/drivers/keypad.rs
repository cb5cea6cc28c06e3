//! 4×4 matrix keypad scanner.
//!
//! Rows are driven low one at a time; a column that reads low while its row
//! is driven marks the pressed key. Columns idle high through pull-ups and
//! undriven rows are held high.
//!
//! Key values follow the legend printed on the pad:
//!
//! ```text
//!   7  8  9  %
//!   4  5  6  *
//!   1  2  3  -
//!   ⏎  0  =  +      (⏎ reports 13)
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::KeypadPort;

pub const ROWS: usize = 4;
pub const COLS: usize = 4;

/// Value reported for each position, row-major.
pub const KEY_MAP: [[u8; COLS]; ROWS] = [
    [7, 8, 9, b'%'],
    [4, 5, 6, b'*'],
    [1, 2, 3, b'-'],
    [13, 0, b'=', b'+'],
];

/// Pause between row scans.
const SCAN_INTERVAL_MS: u32 = 10;
/// Consecutive identical scans that count as a press.
const DEBOUNCE_SCANS: u8 = 3;

pub struct MatrixKeypad<R, C, D>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
{
    rows: [R; ROWS],
    cols: [C; COLS],
    delay: D,
}

impl<R, C, D> MatrixKeypad<R, C, D>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
{
    pub fn new(mut rows: [R; ROWS], cols: [C; COLS], delay: D) -> Self {
        for row in &mut rows {
            let _ = row.set_high();
        }
        Self { rows, cols, delay }
    }

    /// One pass over the matrix. Returns the first pressed position.
    pub fn scan(&mut self) -> Option<(usize, usize)> {
        for r in 0..ROWS {
            if self.rows[r].set_low().is_err() {
                continue;
            }
            let hit = self
                .cols
                .iter_mut()
                .position(|col| col.is_low().unwrap_or(false));
            let _ = self.rows[r].set_high();
            if let Some(c) = hit {
                return Some((r, c));
            }
        }
        None
    }

    /// Block until a key has been pressed and released.
    pub fn wait_key(&mut self) -> u8 {
        let (r, c) = self.wait_press();
        while self.scan().is_some() {
            self.delay.delay_ms(SCAN_INTERVAL_MS);
        }
        KEY_MAP[r][c]
    }

    fn wait_press(&mut self) -> (usize, usize) {
        let mut candidate = None;
        let mut stable = 0u8;
        loop {
            let now = self.scan();
            if now.is_some() && now == candidate {
                stable += 1;
                if stable >= DEBOUNCE_SCANS {
                    if let Some(pos) = now {
                        return pos;
                    }
                }
            } else {
                candidate = now;
                stable = u8::from(now.is_some());
            }
            self.delay.delay_ms(SCAN_INTERVAL_MS);
        }
    }
}

impl<R, C, D> KeypadPort for MatrixKeypad<R, C, D>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
{
    fn read_key(&mut self) -> u8 {
        self.wait_key()
    }
}
