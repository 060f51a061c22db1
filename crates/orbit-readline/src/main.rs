mod render;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use orbit_application::session::ControllerOptions;
use orbit_application::{InputRouter, QueryController, RouteOutcome, SessionView, SubmitOutcome};
use orbit_core::slash_command::{Autocomplete, CommandRegistry, PaletteKey};
use orbit_infrastructure::{ConfigService, LocalEventBus, OrbitPaths, build_backend};

use render::{RenderOp, ViewRenderer};

const CLEAR_COMMAND: &str = "/clear";
const TRACKS_PREFIX: &str = "@tracks";
/// Used when the config disables the invocation timeout.
const DRAIN_FALLBACK: Duration = Duration::from_secs(300);

/// rustyline helper backed by the command palette.
struct OrbitHelper {
    registry: Arc<CommandRegistry>,
}

impl OrbitHelper {
    fn palette_for(&self, line: &str) -> Autocomplete {
        let mut palette = Autocomplete::new(self.registry.clone());
        palette.set_input(line);
        palette
    }
}

impl Helper for OrbitHelper {}

impl Completer for OrbitHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let palette = self.palette_for(&line[..pos]);
        let candidates = palette
            .suggestions()
            .iter()
            .map(|command| Pair {
                display: format!("{:<12} {}", command.name, command.description),
                replacement: command.name.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for OrbitHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for OrbitHelper {
    type Hint = String;

    /// Shows the rest of the command Enter would commit, when it extends
    /// what was typed.
    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        let palette = self.palette_for(line);
        palette
            .highlighted()
            .and_then(|command| command.name.strip_prefix(line))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

impl Validator for OrbitHelper {}

/// Installs a file logger under `logs_dir` and returns the flush guard.
fn init_tracing(logs_dir: &Path, level: &str) -> Result<WorkerGuard> {
    OrbitPaths::ensure_dir(logs_dir)?;
    let appender = tracing_appender::rolling::daily(logs_dir, "orbit.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(format!("orbit={level}")))
                .unwrap_or_else(|_| EnvFilter::new("orbit=info")),
        )
        .with_ansi(false)
        .with_writer(writer)
        .init();

    Ok(guard)
}

fn print_ops(ops: Vec<RenderOp>) {
    for op in ops {
        match op {
            RenderOp::Cleared => println!("{}", "Conversation cleared.".bright_black()),
            RenderOp::Appended(text) => print!("{}", text.bright_blue()),
            RenderOp::Replaced(text) => {
                println!();
                if text.starts_with("Error:") {
                    print!("{}", text.red());
                } else {
                    print!("{}", text.bright_blue());
                }
            }
            RenderOp::Finished => println!(),
        }
    }
    let _ = std::io::stdout().flush();
}

fn render_latest(renderer: &mut ViewRenderer, rx: &mut watch::Receiver<SessionView>) {
    let view = rx.borrow_and_update().clone();
    print_ops(renderer.update(&view));
}

/// Runs one line through the router while printing the answer as it streams.
async fn run_query(
    router: &mut InputRouter,
    line: &str,
    renderer: &mut ViewRenderer,
    rx: &mut watch::Receiver<SessionView>,
    drain_limit: Duration,
) -> RouteOutcome {
    router.set_input(line);
    let routed = router.handle_key(PaletteKey::Enter);
    tokio::pin!(routed);

    let outcome = loop {
        tokio::select! {
            outcome = &mut routed => break outcome,
            changed = rx.changed() => {
                if changed.is_err() {
                    break (&mut routed).await;
                }
                render_latest(renderer, rx);
            }
        }
    };
    render_latest(renderer, rx);

    // Some transports return before the stream has finished.
    if rx.borrow().loading {
        let drained = tokio::time::timeout(drain_limit, async {
            while rx.changed().await.is_ok() {
                render_latest(renderer, rx);
                if !rx.borrow().loading {
                    break;
                }
            }
        })
        .await;
        if drained.is_err() {
            println!("{}", "Still waiting for the backend...".yellow());
        }
    }
    outcome
}

fn report(outcome: &RouteOutcome) {
    match outcome {
        RouteOutcome::ModeChanged(mode) => {
            println!("{}", format!("Mode: {:?}", mode).bright_magenta());
        }
        RouteOutcome::Submitted(SubmitOutcome::Rejected) => {
            println!("{}", "Still answering the previous question.".yellow());
        }
        RouteOutcome::Submitted(_) | RouteOutcome::Palette(_) => {}
    }
}

/// Entry point of the Orbit terminal client.
///
/// Loads `~/.config/orbit/config.toml`, logs to `~/.config/orbit/logs/`,
/// and runs a REPL whose completion and hints come from the command palette.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration & logging =====
    let config_service = ConfigService::new();
    let config = config_service.get_config();
    let _log_guard = init_tracing(&config_service.paths().logs_dir()?, &config.log_level)?;
    tracing::info!("[orbit] Starting with {:?} delivery", config.backend.delivery);

    // ===== Session wiring =====
    let bus = Arc::new(LocalEventBus::new());
    let backend = build_backend(&config.backend, bus.clone())?;
    let options = ControllerOptions::from(&config.backend);
    let drain_limit = options.timeout.unwrap_or(DRAIN_FALLBACK);
    let controller = Arc::new(QueryController::with_options(backend, bus, options));
    let registry = Arc::new(CommandRegistry::with_builtins(config.commands.clone()));
    let mut router = InputRouter::new(controller.clone(), registry.clone());

    let mut view_rx = controller.watch();
    let mut renderer = ViewRenderer::new();

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(OrbitHelper { registry }));

    println!("{}", "=== Orbit ===".bright_magenta().bold());
    println!(
        "{}",
        "Ask anything. '/producer' or '/standard' switch modes, '/clear' wipes the chat,\n\
         '@tracks <json>' sets the selected tracks, 'quit' exits."
            .bright_black()
    );
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if trimmed == CLEAR_COMMAND {
                    router.clear();
                    render_latest(&mut renderer, &mut view_rx);
                    continue;
                }

                if let Some(json) = trimmed.strip_prefix(TRACKS_PREFIX) {
                    let json = json.trim();
                    let count = if json.is_empty() {
                        router.set_tracks(Vec::new());
                        0
                    } else {
                        router.set_tracks_json(json)
                    };
                    println!("{}", format!("{} track(s) selected", count).bright_black());
                    continue;
                }

                println!("{}", format!("> {}", trimmed).green());
                let outcome =
                    run_query(&mut router, trimmed, &mut renderer, &mut view_rx, drain_limit).await;
                report(&outcome);
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    tracing::info!("[orbit] Shutting down");
    Ok(())
}
