//! Single-owner event loop core.
//!
//! Every source in the client (recognizer, scheduler ticks, socket frames,
//! user actions) is funneled into [`CoachEvent`] and fed through one
//! [`Orchestrator`], so session state never needs a lock. Side effects the
//! core cannot perform itself go out as [`Command`]s.

use std::time::Instant;

use anyhow::{Context, Result};
use hint_channel::protocol::{CodeAnalysis, InboundMessage, OutboundMessage};
use tokio::sync::mpsc;

use crate::Command;
use crate::channel::HintChannel;
use crate::hints::{HintKind, HintLog};
use crate::runner::CodeRunner;
use crate::session::{PreconditionError, Session, Stage};
use crate::silence::SilenceDetector;
use crate::speech::SpeechSegment;
use crate::transcript::{TranscriptAccumulator, TranscriptSnapshot};

/// Everything the outside world can feed the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum CoachEvent {
    /// A recognition update, stamped with its arrival instant.
    Segment { segment: SpeechSegment, at: Instant },
    /// The recognizer failed. The session keeps going; listening stays
    /// wherever the candidate put it.
    RecognitionError(String),
    /// One beat of the external silence scheduler.
    Tick(Instant),
    /// A frame from the hint service.
    Inbound(InboundMessage),
    /// Something the candidate did, stamped with its arrival instant.
    User { action: UserAction, at: Instant },
}

/// Deliberate candidate actions, as opposed to ambient speech.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SubmitProblem(String),
    SubmitApproach(String),
    SubmitCode(String),
    /// Editor keystrokes landing in the code buffer; not a submission.
    UpdateCode(String),
    Chat(String),
    SetListening(bool),
    EndSession,
}

/// Owns the session, the transcript and the hint history, and drives the
/// outbound half of the hint channel. One instance per client run.
pub struct Orchestrator<C: HintChannel, R: CodeRunner> {
    session: Session,
    transcript: TranscriptAccumulator,
    detector: SilenceDetector,
    hints: HintLog,
    listening: bool,
    channel: C,
    runner: R,
    command_tx: mpsc::Sender<Command>,
}

impl<C: HintChannel, R: CodeRunner> Orchestrator<C, R> {
    /// Starts with the mic off and an empty transcript whose silence window
    /// opens at `now`.
    pub fn new(
        session: Session,
        detector: SilenceDetector,
        channel: C,
        runner: R,
        command_tx: mpsc::Sender<Command>,
        now: Instant,
    ) -> Self {
        Self {
            session,
            transcript: TranscriptAccumulator::new(now),
            detector,
            hints: HintLog::new(),
            listening: false,
            channel,
            runner,
            command_tx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn hints(&self) -> &HintLog {
        &self.hints
    }

    pub fn transcript(&self) -> TranscriptSnapshot<'_> {
        self.transcript.peek()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Turns the mic on or off. Re-enabling restarts the silence window so
    /// quiet time accrued while the mic was off cannot fire an immediate
    /// dispatch.
    pub fn set_listening(&mut self, enabled: bool, now: Instant) {
        if enabled && !self.listening {
            self.transcript.reset_silence(now);
        }
        self.listening = enabled;
    }

    /// Feeds one event through the core.
    ///
    /// Errors out only for refused user actions and failed user-initiated
    /// sends, which the frontend shows the candidate. Background events
    /// (ticks, frames, recognition trouble) log their failures here and
    /// never escalate.
    pub async fn handle_event(&mut self, event: CoachEvent) -> Result<()> {
        match event {
            CoachEvent::Segment { segment, at } => {
                self.transcript.on_segment(
                    segment.final_text.as_deref(),
                    segment.interim_text.as_deref(),
                    at,
                );
                Ok(())
            }
            CoachEvent::RecognitionError(reason) => {
                tracing::warn!("speech recognition failed: {reason}");
                Ok(())
            }
            CoachEvent::Tick(now) => {
                self.on_tick(now).await;
                Ok(())
            }
            CoachEvent::Inbound(message) => {
                self.on_inbound(message).await;
                Ok(())
            }
            CoachEvent::User { action, at } => self.on_user(action, at).await,
        }
    }

    /// Runs the current code buffer through the executor and returns the
    /// text to show. Failures degrade to an error line; a run never takes
    /// the session down.
    pub async fn run_code(&self) -> String {
        match self.runner.run(self.session.code()).await {
            Ok(run) if run.output.trim().is_empty() => "Code executed (no output).".to_string(),
            Ok(run) => run.output,
            Err(e) => format!("Error: {e}"),
        }
    }

    async fn on_tick(&mut self, now: Instant) {
        if !self.listening {
            return;
        }
        if !self.detector.should_dispatch(
            now,
            self.transcript.last_spoken_at(),
            self.transcript.finalized(),
        ) {
            return;
        }
        // Checked before draining: a dead socket must leave the transcript
        // intact for a later window.
        if !self.channel.is_open() {
            tracing::debug!("silence window elapsed but the hint channel is down; keeping transcript");
            return;
        }
        let transcript = self.transcript.drain();
        self.transcript.reset_silence(now);
        let message = OutboundMessage::SilenceTrigger {
            transcript,
            problem: self.session.problem().to_string(),
            code: self.session.code().to_string(),
        };
        if let Err(e) = self.channel.dispatch(message).await {
            tracing::warn!("failed to dispatch silence trigger: {e}");
        }
    }

    async fn on_inbound(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::System { message, .. } => {
                self.hints.record(HintKind::System, message);
            }
            InboundMessage::AiResponse { message, .. } => {
                self.hints.record(HintKind::Advice, message.clone());
                self.issue(Command::Speak(message)).await;
            }
            InboundMessage::CodeAnalysis { analysis, .. } => {
                // From Coding this is the move to Feedback. Anywhere else
                // the analysis still lands in the feed, it just moves
                // nothing.
                if let Err(e) = self.session.record_analysis() {
                    tracing::warn!("code analysis arrived out of turn: {e}");
                }
                self.hints.record(HintKind::Analysis, format_analysis(&analysis));
            }
            InboundMessage::SessionSummary { summary, .. } => {
                self.hints.record(HintKind::Summary, summary.clone());
                self.issue(Command::SessionComplete(summary)).await;
            }
            InboundMessage::Error { message, .. } => {
                tracing::warn!("hint service reported an error: {message}");
                self.hints.record(HintKind::Error, message);
            }
        }
    }

    async fn on_user(&mut self, action: UserAction, at: Instant) -> Result<()> {
        match action {
            UserAction::SubmitProblem(text) => {
                self.session.submit_problem(&text)?;
                self.dispatch(OutboundMessage::ProblemDescription(
                    self.session.problem().to_string(),
                ))
                .await?;
                self.issue(Command::Speak(problem_acknowledgement(self.session.problem())))
                    .await;
                Ok(())
            }
            UserAction::SubmitApproach(text) => {
                self.session.submit_approach(&text)?;
                self.dispatch(OutboundMessage::Explanation(
                    self.session.approach().to_string(),
                ))
                .await
            }
            UserAction::SubmitCode(code) => {
                self.session.submit_code(&code)?;
                self.dispatch(OutboundMessage::CodeSubmission {
                    code: self.session.code().to_string(),
                    language: self.session.language(),
                })
                .await
            }
            UserAction::UpdateCode(code) => {
                self.session.update_code(&code);
                Ok(())
            }
            UserAction::Chat(text) => {
                if self.session.stage() == Stage::Ended {
                    return Err(PreconditionError::WrongStage {
                        action: "chat",
                        stage: Stage::Ended,
                    }
                    .into());
                }
                if text.trim().is_empty() {
                    return Err(PreconditionError::EmptyText { what: "the message" }.into());
                }
                self.dispatch(OutboundMessage::Chat(text)).await
            }
            UserAction::SetListening(enabled) => {
                self.set_listening(enabled, at);
                Ok(())
            }
            UserAction::EndSession => {
                self.session.end_session()?;
                self.dispatch(OutboundMessage::EndSession {}).await
            }
        }
    }

    async fn dispatch(&self, message: OutboundMessage) -> Result<()> {
        self.channel
            .dispatch(message)
            .await
            .context("failed to send frame to the hint service")
    }

    async fn issue(&self, command: Command) {
        if self.command_tx.send(command).await.is_err() {
            tracing::warn!("command receiver dropped");
        }
    }
}

/// Renders an analysis into one feed entry.
fn format_analysis(analysis: &CodeAnalysis) -> String {
    let mut text = format!(
        "score {}/10: {}",
        analysis.score, analysis.technical_feedback
    );
    text.push_str(&format!("\ncomplexity: {}", analysis.complexity_analysis));
    if let Some(quality) = &analysis.code_quality {
        text.push_str(&format!("\nquality: {quality}"));
    }
    text
}

/// Spoken confirmation that the problem was taken, quoting its opening back
/// at the candidate.
fn problem_acknowledgement(problem: &str) -> String {
    let teaser: String = problem.chars().take(30).collect();
    format!("Got it. I'll help you prepare for the {teaser} challenge. Let me know your thought process.")
}
