//! Operator panel: one keypad and one display presented as a single UI.

use crate::app::ports::{DisplayPort, KeypadPort};
use crate::display::Screen;

pub struct OperatorPanel<K, D> {
    pub keypad: K,
    pub display: D,
}

impl<K: KeypadPort, D: DisplayPort> OperatorPanel<K, D> {
    pub fn new(keypad: K, display: D) -> Self {
        Self { keypad, display }
    }
}

impl<K: KeypadPort, D> KeypadPort for OperatorPanel<K, D> {
    fn read_key(&mut self) -> u8 {
        self.keypad.read_key()
    }
}

impl<K, D: DisplayPort> DisplayPort for OperatorPanel<K, D> {
    fn show(&mut self, screen: &Screen) {
        self.display.show(screen);
    }
}
