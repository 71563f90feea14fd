//! The collaborator seams for display and keyboard, plus a thread safe
//! keypad implementation for hosts.
use parking_lot::{Condvar, Mutex};

use crate::{definitions::keyboard, framebuffer::FrameBuffer};

/// The trait responsible for the display based code
#[cfg_attr(test, mockall::automock)]
pub trait DisplayCommands {
    /// Receives the pixel state produced by the last draw or clear.
    ///
    /// The buffer is `Copy`, a consumer on another thread has to keep its
    /// own snapshot instead of aliasing live chip state.
    fn draw(&mut self, buffer: &FrameBuffer);
}

/// The trait responsible for reading the keyboard state
#[cfg_attr(test, mockall::automock)]
pub trait KeyboardCommands {
    /// A snapshot of the currently held keys, bit `i` set while key `i`
    /// is down.
    fn pressed_keys(&self) -> u16;

    /// Blocks until a key is released and returns the mask of that key.
    ///
    /// Returns `None` once the keyboard was shut down, which tells the
    /// execution loop to halt instead of waiting forever.
    fn wait_for_release(&self) -> Option<u16>;
}

#[derive(Debug, Default)]
struct KeypadState {
    /// bit `i` set while key `i` is held
    held: u16,
    /// mask of the most recent release, consumed by a pending wait
    released: Option<u16>,
    shutdown: bool,
}

/// The internal keyboard representation.
///
/// Input is done with a hex keyboard that has 16 keys ranging `0-F`.
/// A host thread feeds `press`/`release` events; the execution loop reads
/// snapshots and can block on the next release. `shutdown` wakes a pending
/// wait so the whole machine can be torn down mid `FX0A`.
#[derive(Debug, Default)]
pub struct Keypad {
    state: Mutex<KeypadState>,
    release_event: Condvar,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: usize) {
        self.set_key(key, true);
    }

    pub fn release(&self, key: usize) {
        self.set_key(key, false);
    }

    /// Will set the held state of the given key, signalling waiters on a
    /// release edge.
    pub fn set_key(&self, key: usize, to: bool) {
        debug_assert!(key < keyboard::SIZE);
        let mask = 1 << key;
        let mut state = self.state.lock();
        let was_held = state.held & mask != 0;
        if to {
            state.held |= mask;
        } else {
            state.held &= !mask;
            if was_held {
                state.released = Some(mask);
                self.release_event.notify_all();
            }
        }
    }

    /// Cancels any pending key wait and makes all future waits return
    /// immediately.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.release_event.notify_all();
    }
}

impl KeyboardCommands for Keypad {
    fn pressed_keys(&self) -> u16 {
        self.state.lock().held
    }

    fn wait_for_release(&self) -> Option<u16> {
        let mut state = self.state.lock();
        // a release from before the wait started does not count
        state.released = None;
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(mask) = state.released.take() {
                return Some(mask);
            }
            self.release_event.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn test_pressed_keys_snapshot() {
        let keypad = Keypad::new();
        assert_eq!(keypad.pressed_keys(), 0);

        keypad.press(0x1);
        keypad.press(0xC);
        assert_eq!(keypad.pressed_keys(), (1 << 0x1) | (1 << 0xC));

        keypad.release(0x1);
        assert_eq!(keypad.pressed_keys(), 1 << 0xC);
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let keypad = Keypad::new();
        // key 3 was never held, no release event may be recorded
        keypad.release(0x3);
        assert_eq!(keypad.state.lock().released, None);

        keypad.press(0x3);
        keypad.release(0x3);
        assert_eq!(keypad.state.lock().released, Some(1 << 0x3));
    }

    #[test]
    fn test_wait_for_release_wakes_on_release() {
        let keypad = Arc::new(Keypad::new());
        let waiter = {
            let keypad = Arc::clone(&keypad);
            thread::spawn(move || keypad.wait_for_release())
        };

        // the wait discards events from before its entry, so keep pulsing
        // the key until the waiter observed a release
        while !waiter.is_finished() {
            keypad.press(0xA);
            keypad.release(0xA);
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(waiter.join().unwrap(), Some(1 << 0xA));
    }

    #[test]
    fn test_shutdown_cancels_pending_wait() {
        let keypad = Arc::new(Keypad::new());
        let waiter = {
            let keypad = Arc::clone(&keypad);
            thread::spawn(move || keypad.wait_for_release())
        };

        thread::sleep(Duration::from_millis(20));
        keypad.shutdown();

        assert_eq!(waiter.join().unwrap(), None);
        // and every wait afterwards returns immediately
        assert_eq!(keypad.wait_for_release(), None);
    }
}
