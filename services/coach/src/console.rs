//! Line-oriented console frontend.
//!
//! Bare lines stand in for the recognizer feed and become finalized speech
//! segments; `/slash` commands map to deliberate session actions.

use coach_core::orchestrator::UserAction;
use coach_core::speech::SpeechSegment;

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    /// Hand straight to the orchestrator.
    Action(UserAction),
    /// A finalized speech segment.
    Speech(SpeechSegment),
    /// Run the current code buffer.
    Run,
    /// Print the command help.
    Help,
    /// Leave the program.
    Quit,
    /// Could not be parsed; carries the message to show.
    Invalid(String),
}

pub const HELP: &str = "\
/problem <text>    submit the problem statement
/approach <text>   explain your approach
/code <text>       submit code for analysis (use \\n for line breaks)
/edit <text>       update the code buffer without submitting
/run               run the current code buffer
/say <text>        send a chat message to the coach
/mic on|off        toggle the voice transcript
/end               end the session and request a summary
/help              show this help
/quit              leave
anything else      a finalized piece of spoken reasoning (mic starts off)";

/// Parses one console line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ConsoleInput::Speech(SpeechSegment::finalized(line)));
    };

    let (command, arg) = match rest.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (rest, ""),
    };
    let input = match command {
        "problem" => ConsoleInput::Action(UserAction::SubmitProblem(arg.to_string())),
        "approach" => ConsoleInput::Action(UserAction::SubmitApproach(arg.to_string())),
        "code" => ConsoleInput::Action(UserAction::SubmitCode(unescape_newlines(arg))),
        "edit" => ConsoleInput::Action(UserAction::UpdateCode(unescape_newlines(arg))),
        "say" | "chat" => ConsoleInput::Action(UserAction::Chat(arg.to_string())),
        "mic" => match arg {
            "on" => ConsoleInput::Action(UserAction::SetListening(true)),
            "off" => ConsoleInput::Action(UserAction::SetListening(false)),
            other => ConsoleInput::Invalid(format!("expected /mic on|off, got '{other}'")),
        },
        "run" => ConsoleInput::Run,
        "end" => ConsoleInput::Action(UserAction::EndSession),
        "help" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        other => ConsoleInput::Invalid(format!("unknown command '/{other}' (try /help)")),
    };
    Some(input)
}

/// Code typed on a single console line marks line breaks as `\n` escapes.
fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}
