use crate::host::{Host, Style};
use std::cell::RefCell;
use std::rc::Rc;

/// One chunk of output as it was handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub style: Style,
}

#[derive(Debug, Default)]
struct Recording {
    chunks: Vec<Chunk>,
    pumps: usize,
    clears: usize,
}

/// Memory-backed host that records every chunk appended to it.
///
/// Clones share the same recording, so a caller can hand one clone to the
/// interpreter and inspect the output through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    recording: Rc<RefCell<Recording>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: create a host and return (host, handle) sharing one recording.
    pub fn with_handle() -> (Self, Self) {
        let host = MemoryHost::new();
        let handle = host.clone();
        (host, handle)
    }

    /// Every chunk appended so far, in order.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.recording.borrow().chunks.clone()
    }

    /// All appended text concatenated, styles dropped.
    pub fn text(&self) -> String {
        self.recording
            .borrow()
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect()
    }

    /// Text of chunks appended with `style`.
    pub fn text_with_style(&self, style: Style) -> String {
        self.recording
            .borrow()
            .chunks
            .iter()
            .filter(|c| c.style == style)
            .map(|c| c.text.as_str())
            .collect()
    }

    pub fn pump_count(&self) -> usize {
        self.recording.borrow().pumps
    }

    pub fn clear_count(&self) -> usize {
        self.recording.borrow().clears
    }

    /// Drop recorded chunks but keep the counters.
    pub fn take_text(&self) -> String {
        let chunks = std::mem::take(&mut self.recording.borrow_mut().chunks);
        chunks.into_iter().map(|c| c.text).collect()
    }
}

impl Host for MemoryHost {
    fn append(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.recording.borrow_mut().chunks.push(Chunk {
            text: text.to_string(),
            style,
        });
    }

    fn pump_events(&mut self) {
        self.recording.borrow_mut().pumps += 1;
    }

    fn clear(&mut self) {
        let mut recording = self.recording.borrow_mut();
        recording.chunks.clear();
        recording.clears += 1;
    }
}
