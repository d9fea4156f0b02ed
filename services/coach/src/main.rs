mod channel_adapter;
mod config;
mod console;
mod speech_adapter;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use coach_core::Command;
use coach_core::orchestrator::{CoachEvent, Orchestrator, UserAction};
use coach_core::runner::HttpCodeRunner;
use coach_core::session::Session;
use coach_core::silence::{SilenceConfig, SilenceDetector};
use coach_core::speech::SpeechSynthesizer;
use hint_channel::client::{ChannelConfig, ChannelEvent};
use hint_channel::protocol::Language;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::fmt::time::ChronoLocal;

use crate::channel_adapter::SocketChannel;
use crate::config::Config;
use crate::console::ConsoleInput;
use crate::speech_adapter::ConsoleSynthesizer;

/// Service-level inputs feeding the orchestration loop.
enum Input {
    /// An event for the core.
    Core(CoachEvent),
    /// Run the code buffer and show the output.
    Run,
    /// Print the command help.
    Help,
    /// A line to show the candidate outside the hint feed.
    Notice(String),
    /// Leave the loop.
    Quit,
}

#[derive(Parser)]
#[command(name = "coach", about = "Interactive interview coaching client")]
struct Cli {
    /// Override COACH_SOCKET_URL.
    #[arg(long)]
    socket_url: Option<String>,
    /// Override COACH_RUNNER_URL.
    #[arg(long)]
    runner_url: Option<String>,
    /// Language of the code buffer: python, javascript or rust.
    #[arg(long, default_value = "python")]
    language: String,
}

fn parse_language(raw: &str) -> Result<Language> {
    match raw.to_lowercase().as_str() {
        "python" | "py" => Ok(Language::Python),
        "javascript" | "js" => Ok(Language::Javascript),
        "rust" | "rs" => Ok(Language::Rust),
        other => anyhow::bail!("unsupported language '{other}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Apply command-line overrides ---
    let args = Cli::parse();
    if let Some(url) = args.socket_url {
        config.socket_url = url;
    }
    if let Some(url) = args.runner_url {
        config.runner_url = url;
    }
    let language = parse_language(&args.language)?;

    // --- 4. Open the session and its channel ---
    let session = Session::new(language);
    tracing::info!("Starting coaching session {}", session.id());
    let endpoint = format!(
        "{}/{}",
        config.socket_url.trim_end_matches('/'),
        session.id()
    );
    let client = hint_channel::connect(
        ChannelConfig::new(endpoint).with_reconnect(config.reconnect.clone()),
    )
    .await
    .context("Failed to connect to the hint service")?;
    let mut channel_events = client.events();

    let detector = SilenceDetector::new(SilenceConfig {
        silence_threshold: config.silence_threshold,
        min_content_len: config.min_transcript_chars,
    });
    let runner = HttpCodeRunner::new(config.runner_url.clone());

    let (input_tx, mut input_rx) = mpsc::channel::<Input>(256);
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let (listening_tx, listening_rx) = watch::channel(false);

    let mut orchestrator = Orchestrator::new(
        session,
        detector,
        SocketChannel::new(client),
        runner,
        command_tx,
        Instant::now(),
    );

    // --- 5. Pump channel lifecycle and inbound frames ---
    let channel_input = input_tx.clone();
    let channel_pump = tokio::spawn(async move {
        loop {
            let input = match channel_events.recv().await {
                Ok(ChannelEvent::Opened) => Input::Notice("connected to the hint service".into()),
                Ok(ChannelEvent::Message(message)) => Input::Core(CoachEvent::Inbound(message)),
                Ok(ChannelEvent::Error(reason)) => {
                    Input::Notice(format!("hint service connection error: {reason}"))
                }
                Ok(ChannelEvent::Closed { reason }) => Input::Notice(match reason {
                    Some(reason) => format!("hint service connection closed: {reason}"),
                    None => "hint service connection closed".into(),
                }),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("dropped {missed} channel events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if channel_input.send(input).await.is_err() {
                break;
            }
        }
    });

    // --- 6. Silence scheduler, parked while the mic is off ---
    let tick_input = input_tx.clone();
    let tick_interval = config.tick_interval;
    let mut listening = listening_rx;
    let tick_task = tokio::spawn(async move {
        loop {
            if listening.wait_for(|on| *on).await.is_err() {
                return;
            }
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if tick_input
                            .send(Input::Core(CoachEvent::Tick(Instant::now())))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    changed = listening.changed() => {
                        match changed {
                            Err(_) => return,
                            Ok(()) => {
                                if !*listening.borrow() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }
    });

    // --- 7. Read console lines ---
    let console_input = input_tx.clone();
    let console_task = tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(parsed) = console::parse_line(&line) else {
                        continue;
                    };
                    let input = match parsed {
                        ConsoleInput::Action(action) => Input::Core(CoachEvent::User {
                            action,
                            at: Instant::now(),
                        }),
                        ConsoleInput::Speech(segment) => Input::Core(CoachEvent::Segment {
                            segment,
                            at: Instant::now(),
                        }),
                        ConsoleInput::Run => Input::Run,
                        ConsoleInput::Help => Input::Help,
                        ConsoleInput::Quit => Input::Quit,
                        ConsoleInput::Invalid(reason) => Input::Notice(reason),
                    };
                    if console_input.send(input).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = console_input.send(Input::Quit).await;
                    break;
                }
                Err(e) => {
                    // The input feed failing is the console twin of a
                    // recognizer failure: report it, stop reading.
                    let _ = console_input
                        .send(Input::Core(CoachEvent::RecognitionError(e.to_string())))
                        .await;
                    break;
                }
            }
        }
    });

    // --- 8. Handle core commands: spoken lines and session completion ---
    let command_input = input_tx.clone();
    let command_handler = tokio::spawn(async move {
        let synthesizer = ConsoleSynthesizer;
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Speak(text) => {
                    if let Err(e) = synthesizer.speak(&text).await {
                        tracing::warn!("speech synthesis failed: {e}");
                    }
                }
                Command::SessionComplete(summary) => {
                    tracing::info!("session complete");
                    println!("\n=== Session summary ===\n{summary}");
                    let _ = command_input.send(Input::Quit).await;
                }
            }
        }
    });

    // --- 9. Orchestration loop: the single owner of session state ---
    drop(input_tx);
    let orchestrate = async move {
        println!("session {}\n{}", orchestrator.session().id(), console::HELP);
        let mut shown = 0usize;
        while let Some(input) = input_rx.recv().await {
            match input {
                Input::Core(event) => {
                    // Bare lines stand in for the recognizer, and turning
                    // the mic off stops the recognizer. Drop them instead of
                    // letting dead-mic text pile into the transcript.
                    if matches!(event, CoachEvent::Segment { .. }) && !orchestrator.is_listening() {
                        println!("** mic is off; /mic on to narrate, or /say to chat");
                        continue;
                    }
                    // Mirror mic toggles into the scheduler's watch before
                    // the core applies them.
                    if let CoachEvent::User {
                        action: UserAction::SetListening(on),
                        ..
                    } = &event
                    {
                        let _ = listening_tx.send(*on);
                        println!("** mic {}", if *on { "on" } else { "off" });
                    }
                    let before = orchestrator.session().stage();
                    if let Err(e) = orchestrator.handle_event(event).await {
                        println!("!! {e}");
                    }
                    let after = orchestrator.session().stage();
                    if before != after {
                        println!("** session is now {after}");
                    }
                    while let Some(hint) = orchestrator.hints().get(shown) {
                        println!("[{}] {}", hint.kind, hint.text);
                        shown += 1;
                    }
                }
                Input::Run => {
                    let output = orchestrator.run_code().await;
                    println!("{output}");
                }
                Input::Help => println!("{}", console::HELP),
                Input::Notice(text) => println!("** {text}"),
                Input::Quit => break,
            }
        }
    };

    // --- 10. Run until the loop finishes or the process is interrupted ---
    tokio::select! {
        _ = orchestrate => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    channel_pump.abort();
    tick_task.abort();
    console_task.abort();
    command_handler.abort();
    tracing::info!("Shutting down...");
    Ok(())
}
