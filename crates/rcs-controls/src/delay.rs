//! Transport delay: fixed-capacity ring buffer.
//!
//! A value pushed at tick `n` is returned at tick `n + len`. Until `len`
//! values have been written the buffer is [`DelayPhase::Priming`] and reads
//! return zero. A zero-length delay passes values straight through.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Hard cap on the number of delay slots.
pub const MAX_DELAY_SLOTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayPhase {
    /// Fewer than `len` values written; output is zero.
    Priming { filled: usize },
    /// Output is the value written `len` ticks ago.
    Primed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportDelay {
    slots: Vec<f64>,
    write: usize,
    phase: DelayPhase,
    /// Requested length was larger than [`MAX_DELAY_SLOTS`].
    capped: bool,
}

impl TransportDelay {
    /// Delay of `ceil(delay_s / dt_s)` ticks, capped at [`MAX_DELAY_SLOTS`].
    pub fn new(delay_s: f64, dt_s: f64) -> ControlResult<Self> {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return Err(ControlError::InvalidTiming {
                what: "timestep",
                value: dt_s,
            });
        }
        if !delay_s.is_finite() || delay_s < 0.0 {
            return Err(ControlError::InvalidTiming {
                what: "transport delay",
                value: delay_s,
            });
        }
        // Ratios like 20/10 must not round up to 3.
        let wanted = (delay_s / dt_s - 1e-9).ceil().max(0.0) as usize;
        Ok(Self::with_len(wanted))
    }

    /// Delay of exactly `len` ticks, capped at [`MAX_DELAY_SLOTS`].
    pub fn with_len(len: usize) -> Self {
        let capped = len > MAX_DELAY_SLOTS;
        let len = len.min(MAX_DELAY_SLOTS);
        Self {
            slots: vec![0.0; len],
            write: 0,
            phase: if len == 0 {
                DelayPhase::Primed
            } else {
                DelayPhase::Priming { filled: 0 }
            },
            capped,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn phase(&self) -> DelayPhase {
        self.phase
    }

    pub fn is_primed(&self) -> bool {
        self.phase == DelayPhase::Primed
    }

    pub fn was_capped(&self) -> bool {
        self.capped
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    /// Value the next [`push`](Self::push) will return.
    pub fn peek(&self) -> f64 {
        match self.phase {
            _ if self.slots.is_empty() => 0.0,
            DelayPhase::Priming { .. } => 0.0,
            DelayPhase::Primed => self.slots[self.write],
        }
    }

    /// Write `value` and return the delayed output for this tick.
    pub fn push(&mut self, value: f64) -> f64 {
        let len = self.slots.len();
        if len == 0 {
            return value;
        }
        let out = self.peek();
        self.slots[self.write] = value;
        self.write = (self.write + 1) % len;
        if let DelayPhase::Priming { filled } = self.phase {
            self.phase = if filled + 1 >= len {
                DelayPhase::Primed
            } else {
                DelayPhase::Priming { filled: filled + 1 }
            };
        }
        out
    }

    /// Empty the buffer and return to priming.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
        self.write = 0;
        self.phase = if self.slots.is_empty() {
            DelayPhase::Primed
        } else {
            DelayPhase::Priming { filled: 0 }
        };
    }
}
