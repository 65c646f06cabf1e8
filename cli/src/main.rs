//! K-Xpert CLI - line-oriented chat front end.
//!
//! ```text
//! main() -> load config -> SessionState::restore -> setup (first run) -> Repl::run
//!                                                                          |
//!                              line ──> "/cmd" ──> Command::parse ──> session setter
//!                                  └──> text   ──> SessionState::submit_turn ──> Transcript
//! ```
//!
//! Logs go to `~/.kxpert/logs/kxpert.log`, never to the terminal.

mod commands;
mod view;

use std::fs::{self, File, OpenOptions};
use std::io::{IsTerminal, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin, stdin};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kxpert_config::KxpertConfig;
use kxpert_engine::{Outcome, SessionState, SessionStore, SettingsError};
use kxpert_providers::ImageAttachment;
use kxpert_render::{CodeBlockId, Expansion, TerminalStyle, sanitize_terminal_text};
use kxpert_types::{Provider, Theme};

use commands::{Command, command_help};
use view::Transcript;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, open_errors) = open_log_file();

    let Some((log_path, file)) = log_file else {
        // Without a log file, drop logs rather than interleave them with the chat.
        tracing_subscriber::registry().with(env_filter).init();
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(env_filter)
        .init();

    tracing::info!(path = %log_path.display(), "Logging initialized");
    for error in open_errors {
        tracing::warn!("{error}");
    }
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut errors = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            errors.push(format!("Cannot create log dir {}: {e}", parent.display()));
            continue;
        }
        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), errors),
            Err(e) => errors.push(format!("Cannot open log file {}: {e}", candidate.display())),
        }
    }
    (None, errors)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let relative = Path::new("logs").join("kxpert.log");
    let mut candidates = Vec::new();
    if let Some(dir) = kxpert_config::data_dir() {
        candidates.push(dir.join(&relative));
    }
    candidates.push(Path::new(".kxpert").join(relative));
    candidates
}

fn load_config() -> KxpertConfig {
    match KxpertConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("{e}");
            eprintln!("Ignoring config: {e}");
            KxpertConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = load_config();
    let settings = config.provider_settings();
    let session = match SessionStore::default_location() {
        Some(store) => {
            SessionState::restore(settings, store, config.provider_config(), config.theme())
        }
        None => {
            tracing::warn!("No home directory; this session will not be saved");
            SessionState::new(settings, config.provider_config(), config.theme())
        }
    }
    .with_persist_failures(config.persist_failures());

    let style = if stdout().is_terminal() {
        TerminalStyle::Ansi
    } else {
        TerminalStyle::Plain
    };

    let mut repl = Repl {
        session,
        transcript: Transcript::new(config.code_preview_lines(), style),
        pending_image: None,
        shown: 0,
        input: BufReader::new(stdin()).lines(),
    };
    repl.run().await
}

struct Repl {
    session: SessionState,
    transcript: Transcript,
    /// Image attached with `/attach`, sent with the next message.
    pending_image: Option<ImageAttachment>,
    /// History turns already printed.
    shown: usize,
    input: Lines<BufReader<Stdin>>,
}

enum Flow {
    Continue,
    Quit,
}

impl Repl {
    async fn run(&mut self) -> Result<()> {
        self.print_new_turns();
        if !self.session.is_setup_complete() {
            self.setup().await?;
        }
        println!("Type a message, or /help for commands.");

        loop {
            prompt(&format!("[{}] > ", self.session.api_status()))?;
            let Some(line) = self.input.next_line().await.context("failed to read input")? else {
                break;
            };
            let flow = match line.trim().strip_prefix('/') {
                Some(command) => self.command(command),
                None => {
                    self.submit(&line).await;
                    Flow::Continue
                }
            };
            if matches!(flow, Flow::Quit) {
                break;
            }
        }
        Ok(())
    }

    /// First run: pick a provider and key, or skip.
    async fn setup(&mut self) -> Result<()> {
        println!("Welcome to K-Xpert.");
        let provider = loop {
            prompt("Provider (gemini/openai), or Enter to skip setup: ")?;
            let Some(answer) = self.input.next_line().await? else {
                return Ok(());
            };
            if answer.trim().is_empty() {
                self.session.skip_setup();
                self.print_new_turns();
                return Ok(());
            }
            match Provider::parse(&answer) {
                Ok(provider) => break provider,
                Err(e) => println!("{e}"),
            }
        };

        prompt(&format!("{} ({}), or Enter to add later: ", provider.short_name(), provider.env_var()))?;
        let key = self.input.next_line().await?.unwrap_or_default();
        self.session.complete_setup(provider, &key);
        if let Err(e) = KxpertConfig::persist_provider(provider) {
            tracing::warn!("Failed to save provider to config: {e}");
        }
        self.print_new_turns();
        Ok(())
    }

    async fn submit(&mut self, text: &str) {
        if text.trim().is_empty() && self.pending_image.is_none() {
            return;
        }
        println!("K-Xpert is thinking...");
        let image = self.pending_image.take();
        let Some(outcome) = self.session.submit_turn(text, image).await else {
            return;
        };
        self.print_new_turns();

        if let Outcome::Failure { kind, message } = &outcome
            && !self.session.persist_failures()
        {
            println!("{}\n", self.transcript.render_failure(*kind, message));
        }
    }

    fn command(&mut self, raw: &str) -> Flow {
        match Command::parse(raw) {
            Command::Quit => return Flow::Quit,
            Command::Empty | Command::Help => println!("{}", command_help()),
            Command::Unknown(name) => println!("Unknown command /{name}. Try /help."),
            Command::Status => self.print_status(),
            Command::Clear => {
                self.session.clear();
                self.transcript.reset();
                self.shown = 0;
                println!("Chat cleared.");
            }
            Command::Provider(None) => println!("Usage: /provider <gemini|openai>"),
            Command::Provider(Some(name)) => match Provider::parse(name) {
                Ok(provider) => {
                    self.session.set_provider(provider);
                    if let Err(e) = KxpertConfig::persist_provider(provider) {
                        tracing::warn!("Failed to save provider to config: {e}");
                    }
                    println!("Provider set to {}.", provider.display_name());
                }
                Err(e) => println!("{e}"),
            },
            Command::Key(key) => {
                self.session.set_api_key(key.unwrap_or_default());
                println!("API status: {}", self.session.api_status());
            }
            Command::Settings {
                provider,
                key,
                theme,
            } => self.save_settings(provider, key, theme),
            Command::Theme(value) => {
                let theme = match value.map(Theme::parse) {
                    None => self.session.toggle_theme(),
                    Some(Some(theme)) => {
                        self.session.set_theme(theme);
                        theme
                    }
                    Some(None) => {
                        println!("Usage: /theme [light|dark]");
                        return Flow::Continue;
                    }
                };
                if let Err(e) = KxpertConfig::persist_theme(theme) {
                    tracing::warn!("Failed to save theme to config: {e}");
                }
                println!("Theme: {}", theme.as_str());
            }
            Command::Attach(None) => {
                if self.pending_image.take().is_some() {
                    println!("Attachment removed.");
                } else {
                    println!("Usage: /attach <image path>");
                }
            }
            Command::Attach(Some(path)) => match ImageAttachment::from_file(&expand_home(path)) {
                Ok(image) => {
                    println!("Attached {} image; it will be sent with your next message.", image.mime_type());
                    self.pending_image = Some(image);
                }
                Err(e) => println!("Cannot attach: {e}"),
            },
            Command::Expand(id) => self.expand(id),
            Command::Copy(id) => {
                match id.and_then(CodeBlockId::parse).and_then(|id| {
                    self.transcript.copy_text(&id).map(str::to_string)
                }) {
                    Some(source) => println!("{}", sanitize_terminal_text(&source)),
                    None => println!("Usage: /copy <block id shown in a code block header>"),
                }
            }
        }
        Flow::Continue
    }

    fn save_settings(&mut self, provider: Option<&str>, key: Option<&str>, theme: Option<&str>) {
        let Some(provider) = provider.and_then(|p| Provider::parse(p).ok()) else {
            println!("Usage: /settings <gemini|openai> <key> [light|dark]");
            return;
        };
        let theme = match theme {
            Some(raw) => match Theme::parse(raw) {
                Some(theme) => theme,
                None => {
                    println!("Unknown theme {raw:?}.");
                    return;
                }
            },
            None => self.session.theme(),
        };
        match self.session.save_settings(provider, key.unwrap_or_default(), theme) {
            Ok(()) => {
                for result in [
                    KxpertConfig::persist_provider(provider),
                    KxpertConfig::persist_theme(theme),
                ] {
                    if let Err(e) = result {
                        tracing::warn!("Failed to save settings to config: {e}");
                    }
                }
                println!("Settings saved. API status: {}", self.session.api_status());
            }
            Err(SettingsError::EmptyApiKey) => println!("{}", SettingsError::EmptyApiKey),
        }
    }

    fn expand(&mut self, id: Option<&str>) {
        let Some(id) = id.and_then(CodeBlockId::parse) else {
            println!("Usage: /expand <block id>");
            return;
        };
        let Some((index, expansion)) = self.transcript.toggle(&id) else {
            println!("No collapsible code block {id}.");
            return;
        };
        tracing::debug!(block = %id, expanded = expansion == Expansion::Expanded, "Toggled code block");
        if let Some(turn) = self.session.history().turns().get(index) {
            let theme = self.session.theme();
            println!("{}\n", self.transcript.render_turn(index, turn, theme));
        }
    }

    fn print_status(&self) {
        let config = self.session.provider_config();
        println!(
            "Provider: {} | API: {} | Theme: {} | Attachment: {}",
            config.provider().display_name(),
            self.session.api_status(),
            self.session.theme().as_str(),
            self.pending_image
                .as_ref()
                .map_or("none", ImageAttachment::mime_type),
        );
    }

    fn print_new_turns(&mut self) {
        let theme = self.session.theme();
        let turns = self.session.history().turns();
        for (index, turn) in turns.iter().enumerate().skip(self.shown) {
            println!("{}\n", self.transcript.render_turn(index, turn, theme));
        }
        self.shown = turns.len();
    }
}

fn prompt(text: &str) -> Result<()> {
    let mut out = stdout();
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
