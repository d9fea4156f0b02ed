//! The interview session and its stage machine.

use hint_channel::protocol::Language;
use thiserror::Error;
use uuid::Uuid;

/// Phase of the interview. Derives `Ord` so "only ever forward" is a
/// comparison, not a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    AwaitingProblem,
    AwaitingApproach,
    Coding,
    Feedback,
    Ended,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::AwaitingProblem => "awaiting a problem",
            Stage::AwaitingApproach => "awaiting an approach",
            Stage::Coding => "coding",
            Stage::Feedback => "in feedback",
            Stage::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// Why an action was refused. Refusals never change session state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("cannot {action} while the session is {stage}")]
    WrongStage { action: &'static str, stage: Stage },
    #[error("{what} must not be empty")]
    EmptyText { what: &'static str },
    #[error("the code buffer still holds the starter placeholder")]
    UnmodifiedCode,
}

/// Starter contents of the code buffer. Submitting this text unchanged is
/// refused: it proves the candidate has not written anything yet.
pub fn starter_code(language: Language) -> &'static str {
    match language {
        Language::Python => "# Write your Python code here\nprint('Hello World!')",
        Language::Javascript => "// Write your JavaScript code here\nconsole.log('Hello World!');",
        Language::Rust => "// Write your Rust code here\nfn main() {\n    println!(\"Hello World!\");\n}",
    }
}

/// One interview session: identity, stage, and the artifacts gathered so
/// far. All mutation goes through the transition methods, each of which
/// refuses with a [`PreconditionError`] instead of moving when its guard
/// fails, so the stage can only ever advance.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    stage: Stage,
    language: Language,
    problem: String,
    approach: String,
    code: String,
    analysis_pending: bool,
}

impl Session {
    /// Fresh session in [`Stage::AwaitingProblem`] with a starter code
    /// buffer for `language`.
    pub fn new(language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::AwaitingProblem,
            language,
            problem: String::new(),
            approach: String::new(),
            code: starter_code(language).to_string(),
            analysis_pending: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    pub fn approach(&self) -> &str {
        &self.approach
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether a code submission has gone out with no analysis back yet.
    pub fn analysis_pending(&self) -> bool {
        self.analysis_pending
    }

    fn advance(&mut self, to: Stage) {
        debug_assert!(to >= self.stage, "session stages only move forward");
        self.stage = to;
    }

    /// `AwaitingProblem` to `AwaitingApproach`.
    pub fn submit_problem(&mut self, text: &str) -> Result<(), PreconditionError> {
        if self.stage != Stage::AwaitingProblem {
            return Err(PreconditionError::WrongStage {
                action: "submit a problem",
                stage: self.stage,
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PreconditionError::EmptyText {
                what: "the problem statement",
            });
        }
        self.problem = text.to_string();
        self.advance(Stage::AwaitingApproach);
        Ok(())
    }

    /// `AwaitingApproach` to `Coding`.
    pub fn submit_approach(&mut self, text: &str) -> Result<(), PreconditionError> {
        if self.stage != Stage::AwaitingApproach {
            return Err(PreconditionError::WrongStage {
                action: "explain an approach",
                stage: self.stage,
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(PreconditionError::EmptyText {
                what: "the approach",
            });
        }
        self.approach = text.to_string();
        self.advance(Stage::Coding);
        Ok(())
    }

    /// Replaces the code buffer with the editor's current contents. Not a
    /// transition; valid in any stage.
    pub fn update_code(&mut self, code: &str) {
        self.code = code.to_string();
    }

    /// Accepts a submission for analysis. The stage stays `Coding`, now with
    /// an analysis pending; resubmitting before the reply lands just
    /// refreshes the submitted code.
    pub fn submit_code(&mut self, code: &str) -> Result<(), PreconditionError> {
        if self.stage != Stage::Coding {
            return Err(PreconditionError::WrongStage {
                action: "submit code",
                stage: self.stage,
            });
        }
        if code.trim().is_empty() {
            return Err(PreconditionError::EmptyText {
                what: "the code submission",
            });
        }
        if code == starter_code(self.language) {
            return Err(PreconditionError::UnmodifiedCode);
        }
        self.code = code.to_string();
        self.analysis_pending = true;
        Ok(())
    }

    /// `Coding` to `Feedback`. The analysis itself is what makes feedback
    /// reachable; any other stage refuses.
    pub fn record_analysis(&mut self) -> Result<(), PreconditionError> {
        if self.stage != Stage::Coding {
            return Err(PreconditionError::WrongStage {
                action: "record an analysis",
                stage: self.stage,
            });
        }
        self.analysis_pending = false;
        self.advance(Stage::Feedback);
        Ok(())
    }

    /// `Feedback` to `Ended`. Earlier stages have nothing to wrap up yet.
    pub fn end_session(&mut self) -> Result<(), PreconditionError> {
        if self.stage != Stage::Feedback {
            return Err(PreconditionError::WrongStage {
                action: "end the session",
                stage: self.stage,
            });
        }
        self.advance(Stage::Ended);
        Ok(())
    }
}
