//! Per-slot decode state machine.
//!
//! Each worker slot cycles through three states. The coordinator moves a
//! slot to `SettingUp` when it hands over a packet; the worker announces
//! `SetupFinished` once the frame's dimensions and buffers are fixed
//! (releasing the next submission), and returns to `InputReady` when the
//! decode call ends.

use parking_lot::{Condvar, Mutex};
use tracing::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Idle, ready to accept the next packet.
    InputReady,
    /// Decoding, frame geometry not yet fixed.
    SettingUp,
    /// Still decoding, but setup is done and the next packet may go in.
    SetupFinished,
}

/// The slot state plus the condvar its transitions are announced on.
pub struct StateCell {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::InputReady),
            cond: Condvar::new(),
        }
    }

    pub fn get(&self) -> SlotState {
        *self.state.lock()
    }

    /// Coordinator side: mark the slot busy before signalling the worker.
    pub fn begin_setup(&self) {
        *self.state.lock() = SlotState::SettingUp;
    }

    /// Worker side: announce that frame geometry is fixed. Returns `false`
    /// if setup was already finished for this frame (repeat calls are
    /// tolerated but logged).
    pub fn finish_setup(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SlotState::SetupFinished {
            warn!("setup already marked finished for this frame");
            return false;
        }
        *state = SlotState::SetupFinished;
        self.cond.notify_all();
        true
    }

    /// Worker side: decode call over, slot idle again.
    pub fn finish_work(&self) {
        *self.state.lock() = SlotState::InputReady;
        self.cond.notify_all();
    }

    /// Block until the slot has left `SettingUp`. Returns immediately when
    /// setup already finished or the slot went idle.
    pub fn wait_setup_finished(&self) {
        let mut state = self.state.lock();
        while *state == SlotState::SettingUp {
            self.cond.wait(&mut state);
        }
    }

    /// Block until the worker is idle.
    pub fn wait_input_ready(&self) {
        let mut state = self.state.lock();
        while *state != SlotState::InputReady {
            self.cond.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fresh_cell_is_input_ready() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), SlotState::InputReady);
        // No worker active, waits return immediately.
        cell.wait_setup_finished();
        cell.wait_input_ready();
    }

    #[test]
    fn repeat_finish_setup_is_tolerated() {
        let cell = StateCell::new();
        cell.begin_setup();
        assert!(cell.finish_setup());
        assert!(!cell.finish_setup());
        assert_eq!(cell.get(), SlotState::SetupFinished);
    }

    #[test]
    fn wait_setup_finished_wakes_on_transition() {
        let cell = Arc::new(StateCell::new());
        cell.begin_setup();

        let worker = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(20));
                cell.finish_setup();
            })
        };
        cell.wait_setup_finished();
        assert_eq!(cell.get(), SlotState::SetupFinished);
        worker.join().unwrap();
    }

    #[test]
    fn wait_input_ready_wakes_when_work_ends() {
        let cell = Arc::new(StateCell::new());
        cell.begin_setup();

        let worker = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                cell.finish_setup();
                thread::sleep(std::time::Duration::from_millis(20));
                cell.finish_work();
            })
        };
        cell.wait_input_ready();
        assert_eq!(cell.get(), SlotState::InputReady);
        worker.join().unwrap();
    }
}
