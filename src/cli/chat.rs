use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::{ConversationSession, SubmissionObserver, SubmissionOutcome};
use crate::domain::{
    usage_total_tokens, ConversationAction, ConversationState, StreamMetadata, SubmissionView,
    ToolKind, AVAILABLE_MODELS,
};

const HELP: &str = "\
Type a prompt and press Enter to send it. Ctrl-C cancels a pending answer.

  /model <name>   select a model (see /models)
  /temp <0-2>     set the temperature
  /web [on|off]   toggle web search
  /clear          forget the conversation and the prompt
  /models         list available models
  /status         show current settings
  /quit           leave";

/// One line of input, interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Submit(String),
    SelectModel(String),
    SetTemperature(f64),
    /// `None` toggles.
    SetWebSearch(Option<bool>),
    Clear,
    ListModels,
    Status,
    Help,
    Quit,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return ReplCommand::Submit(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (command, None),
        };

        match (name, arg) {
            ("model", Some(model)) => ReplCommand::SelectModel(model.to_string()),
            ("model", None) => ReplCommand::Invalid("Usage: /model <name>".to_string()),
            ("temp", Some(value)) => match value.parse::<f64>() {
                Ok(t) if t.is_finite() => ReplCommand::SetTemperature(t),
                _ => ReplCommand::Invalid("Usage: /temp <0-2>".to_string()),
            },
            ("temp", None) => ReplCommand::Invalid("Usage: /temp <0-2>".to_string()),
            ("web", None) => ReplCommand::SetWebSearch(None),
            ("web", Some("on" | "true")) => ReplCommand::SetWebSearch(Some(true)),
            ("web", Some("off" | "false")) => ReplCommand::SetWebSearch(Some(false)),
            ("web", Some(_)) => ReplCommand::Invalid("Usage: /web [on|off]".to_string()),
            ("clear", _) => ReplCommand::Clear,
            ("models", _) => ReplCommand::ListModels,
            ("status", _) => ReplCommand::Status,
            ("help", _) => ReplCommand::Help,
            ("quit" | "exit", _) => ReplCommand::Quit,
            _ => ReplCommand::Invalid(format!("Unknown command: /{name} (try /help)")),
        }
    }
}

/// What the loop does after a command.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(Option<String>),
    Submit,
    Quit,
}

/// Spinner while waiting, streamed text as it arrives.
pub struct TerminalObserver {
    spinner: Option<ProgressBar>,
    streamed: bool,
}

impl TerminalObserver {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Waiting for response...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner: Some(spinner),
            streamed: false,
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn finish(mut self) {
        self.clear_spinner();
        if self.streamed {
            println!();
        }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionObserver for TerminalObserver {
    fn on_stream_started(&mut self, metadata: &StreamMetadata) {
        debug!("Streaming from {} at {}", metadata.model, metadata.temperature);
        self.clear_spinner();
    }

    fn on_chunk(&mut self, text: &str) {
        self.streamed = true;
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_fallback(&mut self) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message("Streaming unavailable, retrying...");
        }
    }
}

/// Line-oriented conversation client.
pub struct ChatRepl {
    session: ConversationSession,
}

impl ChatRepl {
    pub fn new(session: ConversationSession) -> Self {
        Self { session }
    }

    pub fn state(&self) -> &ConversationState {
        self.session.state()
    }

    pub async fn execute(&mut self, command: ReplCommand) -> Flow {
        match command {
            ReplCommand::Submit(prompt) => {
                self.session.dispatch(ConversationAction::SetPrompt(prompt)).await;
                Flow::Submit
            }
            ReplCommand::SelectModel(model) => {
                if !AVAILABLE_MODELS.contains(&model.as_str()) {
                    return Flow::Continue(Some(format!(
                        "Unknown model {model}. Available: {}",
                        AVAILABLE_MODELS.join(", ")
                    )));
                }
                self.session.dispatch(ConversationAction::SelectModel(model)).await;
                Flow::Continue(Some(settings_line(self.state())))
            }
            ReplCommand::SetTemperature(temperature) => {
                if self.state().temperature_locked() {
                    return Flow::Continue(Some(format!(
                        "Temperature is fixed at {} for {}",
                        self.state().effective_temperature(),
                        self.state().model
                    )));
                }
                self.session
                    .dispatch(ConversationAction::SetTemperature(temperature))
                    .await;
                Flow::Continue(Some(settings_line(self.state())))
            }
            ReplCommand::SetWebSearch(enabled) => {
                let enabled = enabled.unwrap_or(!self.state().web_search);
                self.session.dispatch(ConversationAction::SetWebSearch(enabled)).await;
                Flow::Continue(Some(settings_line(self.state())))
            }
            ReplCommand::Clear => {
                self.session.dispatch(ConversationAction::Reset).await;
                Flow::Continue(Some("Conversation cleared.".to_string()))
            }
            ReplCommand::ListModels => {
                let current = &self.state().model;
                let list = AVAILABLE_MODELS
                    .iter()
                    .map(|m| {
                        let marker = if *m == current.as_str() { "*" } else { " " };
                        format!("{marker} {m}")
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                Flow::Continue(Some(list))
            }
            ReplCommand::Status => Flow::Continue(Some(status_text(self.state()))),
            ReplCommand::Help => Flow::Continue(Some(HELP.to_string())),
            ReplCommand::Quit => Flow::Quit,
            ReplCommand::Invalid(message) => Flow::Continue(Some(message)),
        }
    }

    /// Run one submission; Ctrl-C cancels it.
    pub async fn submit_interruptible(&mut self) -> SubmissionOutcome {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let mut observer = TerminalObserver::new();
        let outcome = self.session.submit(&cancel, &mut observer).await;
        watcher.abort();
        observer.finish();
        outcome
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}\nType /help for commands.", settings_line(self.state()));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            match self.execute(ReplCommand::parse(&line)).await {
                Flow::Continue(Some(text)) => println!("{text}"),
                Flow::Continue(None) => {}
                Flow::Quit => break,
                Flow::Submit => match self.submit_interruptible().await {
                    SubmissionOutcome::Skipped => {}
                    SubmissionOutcome::Completed { via_fallback } => {
                        if via_fallback {
                            println!("{}", self.state().view.result);
                        }
                        println!("{}", response_footer(&self.state().view));
                    }
                    SubmissionOutcome::Failed(message) => eprintln!("Error: {message}"),
                    SubmissionOutcome::Cancelled => eprintln!("Request cancelled"),
                },
            }
        }
        Ok(())
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// One-line summary of the settings the next submission will use.
pub fn settings_line(state: &ConversationState) -> String {
    let lock = if state.temperature_locked() { " (fixed)" } else { "" };
    format!(
        "model {} | temperature {}{} | web search {}",
        state.model,
        state.effective_temperature(),
        lock,
        on_off(state.web_search)
    )
}

pub fn status_text(state: &ConversationState) -> String {
    let mut text = settings_line(state);
    text.push_str(&format!("\nturns: {}", state.messages.len() / 2));
    if state.view.server_model.is_some() {
        text.push_str(&format!("\nlast response: {}", response_footer(&state.view)));
    }
    if let Some(status) = state.view.status.message() {
        text.push_str(&format!("\nstatus: {status}"));
    }
    text
}

/// Effective parameters the server reported for the last answer.
pub fn response_footer(view: &SubmissionView) -> String {
    let mut parts = Vec::new();
    if let Some(model) = &view.server_model {
        parts.push(model.clone());
    }
    if let Some(temperature) = view.server_temperature {
        parts.push(format!("temperature {temperature}"));
    }
    if !view.server_tools.is_empty() {
        parts.push(format!("tools {}", ToolKind::join(&view.server_tools)));
    }
    if let Some(total) = view.usage.as_ref().and_then(usage_total_tokens) {
        parts.push(format!("{total} tokens"));
    }
    format!("[{}]", parts.join(" | "))
}
