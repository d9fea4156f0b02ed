//! Orchestration core of the interview coaching client.
//!
//! Everything in here is runtime-agnostic: the modules own the session
//! state machine, the transcript buffer, the silence-dispatch policy and
//! the hint history, and they reach the outside world only through the
//! traits in [`channel`], [`runner`] and [`speech`]. The frontend feeds
//! events in through [`orchestrator::Orchestrator`] and receives
//! [`Command`]s back on a channel.

pub mod channel;
pub mod hints;
pub mod orchestrator;
pub mod runner;
pub mod session;
pub mod silence;
pub mod speech;
pub mod transcript;

/// Side effects the core asks the runtime to perform. Keeping these as data
/// keeps the orchestration logic testable without audio or terminal
/// plumbing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Say this line to the candidate.
    Speak(String),
    /// The service delivered its final summary; the session is over.
    SessionComplete(String),
}
