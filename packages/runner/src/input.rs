use std::collections::VecDeque;

use crate::error::RunnerError;

/// Client-side flow control for program input.
///
/// At most one line is in flight: the next line is released only after the
/// sandbox echoes the previous one. Lines arriving meanwhile wait in a
/// bounded FIFO, so the program sees them in the order they were typed.
/// Bare newlines are never echoed back and therefore never block the queue.
#[derive(Debug)]
pub struct InputQueue {
    pending: VecDeque<String>,
    in_flight: bool,
    capacity: usize,
}

/// Split raw text into newline-terminated lines. A missing final newline is
/// appended and `\r\n` becomes `\n`.
pub fn lines(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return vec!["\n".to_string()];
    }
    raw.split_inclusive('\n')
        .map(|line| {
            let text = line.trim_end_matches('\n').trim_end_matches('\r');
            format!("{text}\n")
        })
        .collect()
}

fn awaits_echo(line: &str) -> bool {
    line != "\n"
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: false,
            capacity,
        }
    }

    /// Queue `line`. Returns the lines that may be sent right away.
    pub fn push(&mut self, line: String) -> Result<Vec<String>, RunnerError> {
        if self.pending.len() >= self.capacity {
            return Err(RunnerError::InputQueueFull(self.pending.len()));
        }
        self.pending.push_back(line);
        Ok(self.release())
    }

    /// The in-flight line was consumed. Returns the lines that may be sent now.
    pub fn on_echo(&mut self) -> Vec<String> {
        self.in_flight = false;
        self.release()
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn release(&mut self) -> Vec<String> {
        let mut ready = Vec::new();
        while !self.in_flight {
            let Some(line) = self.pending.pop_front() else {
                break;
            };
            self.in_flight = awaits_echo(&line);
            ready.push(line);
        }
        ready
    }
}
