//! When a quiet candidate should be offered help.

use std::time::{Duration, Instant};

/// Tuning for the silence-dispatch decision. Deployments run anywhere from
/// four to twelve second windows, so both knobs come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceConfig {
    /// How long the candidate must stay quiet before a dispatch fires.
    pub silence_threshold: Duration,
    /// Trimmed character count the buffered transcript must exceed to be
    /// worth the service's attention.
    pub min_content_len: usize,
}

/// Decides, once per externally scheduled tick, whether the buffered
/// transcript should go to the hint service.
///
/// The answer is a pure function of the inputs; the detector keeps no timer
/// and no per-tick state. Draining the buffer and resetting the window after
/// a firing is the caller's job, and is exactly what holds a firing to once
/// per silence window.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    config: SilenceConfig,
}

impl SilenceDetector {
    pub fn new(config: SilenceConfig) -> Self {
        Self { config }
    }

    /// True when the window has elapsed since `last_spoken_at` and the
    /// buffered text has substance. Interim text never reaches this
    /// decision; callers pass only the finalized buffer.
    pub fn should_dispatch(&self, now: Instant, last_spoken_at: Instant, buffered: &str) -> bool {
        if buffered.trim().chars().count() <= self.config.min_content_len {
            return false;
        }
        now.duration_since(last_spoken_at) >= self.config.silence_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SilenceDetector {
        SilenceDetector::new(SilenceConfig {
            silence_threshold: Duration::from_millis(4000),
            min_content_len: 5,
        })
    }

    #[test]
    fn short_or_blank_transcripts_never_fire() {
        let t0 = Instant::now();
        let long_quiet = t0 + Duration::from_secs(60);
        for text in ["", "   ", "hi", "12345", "  1234   "] {
            assert!(
                !detector().should_dispatch(long_quiet, t0, text),
                "{text:?} should not fire"
            );
        }
    }

    #[test]
    fn length_gate_counts_characters_not_bytes() {
        let t0 = Instant::now();
        let quiet = t0 + Duration::from_secs(60);
        // Six characters, seven bytes: clears a five-character gate.
        assert!(detector().should_dispatch(quiet, t0, "héllo!"));
    }

    #[test]
    fn fires_exactly_at_the_threshold_and_not_before() {
        let t0 = Instant::now();
        let text = "thinking about sorting first";
        assert!(!detector().should_dispatch(t0 + Duration::from_millis(3999), t0, text));
        assert!(detector().should_dispatch(t0 + Duration::from_millis(4000), t0, text));
        assert!(detector().should_dispatch(t0 + Duration::from_millis(4001), t0, text));
    }

    #[test]
    fn drained_buffer_and_fresh_window_hold_the_next_tick_quiet() {
        let t0 = Instant::now();
        let fired_at = t0 + Duration::from_millis(4000);
        assert!(detector().should_dispatch(fired_at, t0, "plenty of buffered speech"));
        // After the caller drains and resets, the very same instant decides
        // differently on both gates.
        assert!(!detector().should_dispatch(fired_at, fired_at, ""));
    }

    #[test]
    fn speech_mid_window_pushes_the_firing_out() {
        let t0 = Instant::now();
        let spoke_again = t0 + Duration::from_millis(3000);
        let text = "maybe a sliding window works";
        assert!(!detector().should_dispatch(
            spoke_again + Duration::from_millis(3999),
            spoke_again,
            text
        ));
        assert!(detector().should_dispatch(
            spoke_again + Duration::from_millis(4000),
            spoke_again,
            text
        ));
    }
}
