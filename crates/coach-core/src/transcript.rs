//! Rolling buffer of recognized speech between hint dispatches.

use std::time::Instant;

/// Accumulates recognition output until the next silence dispatch drains it.
///
/// Finalized text only ever grows until [`drain`](Self::drain) takes it;
/// interim text is a preview that each update overwrites. The accumulator
/// never reads a clock. Callers stamp every update, which keeps the
/// silence-window arithmetic deterministic under test.
#[derive(Debug)]
pub struct TranscriptAccumulator {
    finalized: String,
    interim: String,
    last_spoken_at: Instant,
}

/// Borrowed view of the accumulator for display.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptSnapshot<'a> {
    pub finalized: &'a str,
    pub interim: &'a str,
    pub last_spoken_at: Instant,
}

impl TranscriptAccumulator {
    /// Empty buffer with the silence window starting at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            finalized: String::new(),
            interim: String::new(),
            last_spoken_at: now,
        }
    }

    /// Records one recognition update. Finalized text is appended to the
    /// buffer, space-separated from what came before; interim text replaces
    /// the previous preview. Either one marks `now` as the moment the
    /// candidate last spoke. An update carrying neither is a no-op.
    pub fn on_segment(&mut self, final_text: Option<&str>, interim_text: Option<&str>, now: Instant) {
        if final_text.is_none() && interim_text.is_none() {
            return;
        }
        if let Some(text) = final_text {
            if !self.finalized.is_empty() {
                self.finalized.push(' ');
            }
            self.finalized.push_str(text);
        }
        if let Some(text) = interim_text {
            self.interim.clear();
            self.interim.push_str(text);
        }
        self.last_spoken_at = now;
    }

    pub fn peek(&self) -> TranscriptSnapshot<'_> {
        TranscriptSnapshot {
            finalized: &self.finalized,
            interim: &self.interim,
            last_spoken_at: self.last_spoken_at,
        }
    }

    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn last_spoken_at(&self) -> Instant {
        self.last_spoken_at
    }

    /// Takes the finalized transcript and leaves the buffer empty. The
    /// interim preview stays: it belongs to speech still in flight.
    pub fn drain(&mut self) -> String {
        std::mem::take(&mut self.finalized)
    }

    /// Restarts the silence window, e.g. right after a dispatch or when the
    /// mic comes back on.
    pub fn reset_silence(&mut self, now: Instant) {
        self.last_spoken_at = now;
    }
}
