//! Test and helper mocks for dosa_core

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dosa_traits::{DigitalIo, PinId};

#[derive(Debug, Default)]
struct PinState {
    levels: HashMap<PinId, bool>,
    writes: Vec<(PinId, bool)>,
}

/// In-memory pin bank. Clones share state, so a test can keep a handle
/// while the controller owns another.
///
/// Pins that were never written or set read high (pulled up), which keeps
/// an active-low emergency stop released by default.
#[derive(Debug, Clone, Default)]
pub struct MemoryIo {
    state: Arc<Mutex<PinState>>,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Force an input level, as if the outside world drove the pin.
    pub fn set_level(&self, pin: PinId, level: bool) {
        self.lock().levels.insert(pin, level);
    }

    /// Current level, `None` if never touched.
    pub fn level(&self, pin: PinId) -> Option<bool> {
        self.lock().levels.get(&pin).copied()
    }

    /// Every write in order.
    pub fn writes(&self) -> Vec<(PinId, bool)> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self, pin: PinId) -> usize {
        self.lock().writes.iter().filter(|(p, _)| *p == pin).count()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }
}

impl DigitalIo for MemoryIo {
    fn read(&mut self, pin: PinId) -> bool {
        self.level(pin).unwrap_or(true)
    }

    fn write(&mut self, pin: PinId, level: bool) {
        let mut st = self.lock();
        st.levels.insert(pin, level);
        st.writes.push((pin, level));
    }
}
