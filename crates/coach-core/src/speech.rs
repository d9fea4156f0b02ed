//! Speech input and output at the edge of the core.

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// One recognition update from the external speech-to-text capability.
///
/// Recognizers emit committed text, a provisional preview, or both in one
/// update; an update with neither is ignored downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechSegment {
    /// Text the recognizer has committed to. Appended to the transcript.
    pub final_text: Option<String>,
    /// Provisional text, replaced by the next update.
    pub interim_text: Option<String>,
}

impl SpeechSegment {
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            final_text: Some(text.into()),
            interim_text: None,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            final_text: None,
            interim_text: Some(text.into()),
        }
    }
}

/// Reads a line aloud to the candidate. Callers never wait on playback;
/// a synthesizer that cannot speak should log and move on.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}
