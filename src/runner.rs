use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::{
    chip8::ChipSet,
    definitions::{cpu, timer},
    devices::{DisplayCommands, KeyboardCommands},
    error::ProcessError,
    opcode::Operation,
};

/// when the loop was stalled longer than this (a blocking key wait), the
/// timer clock resumes at the current instant instead of catching up
const STALL_THRESHOLD: Duration = Duration::from_millis(4 * timer::INTERVAL);

/// Drives the fetch-decode-execute loop until the program halts.
///
/// The cpu runs at its own cadence while the delay and sound timers are
/// decremented on a 60 hertz wall clock, so timer behaviour does not depend
/// on instruction throughput. The display collaborator is handed the pixel
/// state once per step that produced a draw. Returns when `halt` is raised,
/// when a pending key wait gets cancelled, or with the error that stopped
/// the program.
pub fn run<D, K>(
    chip: &mut ChipSet,
    display: &mut D,
    keyboard: &K,
    halt: &AtomicBool,
) -> Result<(), ProcessError>
where
    D: DisplayCommands,
    K: KeyboardCommands,
{
    let step_interval = Duration::from_millis(cpu::INTERVAL);
    let tick_interval = Duration::from_millis(timer::INTERVAL);

    let mut next_step = Instant::now();
    let mut last_tick = Instant::now();

    while !halt.load(Ordering::Acquire) {
        match chip.step(keyboard)? {
            Operation::Draw => display.draw(chip.get_framebuffer()),
            Operation::Halt => return Ok(()),
            Operation::None => {}
        }

        let now = Instant::now();
        if now.duration_since(last_tick) >= STALL_THRESHOLD {
            last_tick = now;
            chip.tick_timers();
        } else {
            while now.duration_since(last_tick) >= tick_interval {
                chip.tick_timers();
                last_tick += tick_interval;
            }
        }

        next_step += step_interval;
        let now = Instant::now();
        if next_step > now {
            thread::sleep(next_step - now);
        } else {
            // running behind, continue at full speed rather than catch up
            next_step = now;
        }
    }
    Ok(())
}
