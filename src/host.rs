//! The narrow interface between the engine and whatever displays its output.

use std::time::{Duration, Instant};

/// Presentation hint attached to each chunk of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Plain,
    Prompt,
    Error,
    Highlight,
    Center,
}

/// Output sink and event loop of the interactive front end.
///
/// The engine calls [`Host::append`] many times with partial chunks; the order
/// of calls is the order in which text must appear. Between bounded units of
/// blocking work it calls [`Host::pump_events`] so a single-threaded host can
/// repaint and process input.
pub trait Host {
    /// Append `text` to the display.
    fn append(&mut self, text: &str, style: Style);

    /// Process pending host events. Called between slices of blocking work.
    fn pump_events(&mut self) {}

    /// Wipe the display.
    fn clear(&mut self) {}
}

/// Sleep for `total`, waking every `slice` to pump host events.
///
/// A zero `slice` sleeps in one go after a single pump.
pub fn cooperative_sleep(host: &mut dyn Host, total: Duration, slice: Duration) {
    let deadline = Instant::now() + total;
    loop {
        host.pump_events();
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let remaining = deadline - now;
        let step = if slice.is_zero() {
            remaining
        } else {
            remaining.min(slice)
        };
        std::thread::sleep(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemoryHost;

    #[test]
    fn test_cooperative_sleep_pumps_between_slices() {
        let mut host = MemoryHost::new();
        let started = Instant::now();
        cooperative_sleep(&mut host, Duration::from_millis(40), Duration::from_millis(10));
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(host.pump_count() >= 4);
    }

    #[test]
    fn test_zero_duration_still_pumps_once() {
        let mut host = MemoryHost::new();
        cooperative_sleep(&mut host, Duration::ZERO, Duration::from_millis(10));
        assert_eq!(host.pump_count(), 1);
    }
}
