//! Console stand-in for the text-to-speech capability.

use anyhow::Result;
use async_trait::async_trait;
use coach_core::speech::SpeechSynthesizer;

/// Prints the line that a voice frontend would speak. Keeps the command
/// handler shaped for a real synthesizer without pulling audio plumbing
/// into a terminal client.
pub struct ConsoleSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("(coach) {text}");
        Ok(())
    }
}
