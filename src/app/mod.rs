//! Editor session and its console host.

mod context;
mod engine_events;

pub use context::{EditorContext, KeyOutcome};
pub use engine_events::{EngineEvent, EngineEventQueue};

use crate::binding::BindingError;
use crate::config::{ConfigError, EditorConfig};
use crate::console::ConsoleError;
use crate::scene::SceneError;
use std::io::{self, BufRead, Write};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Console(#[from] ConsoleError),
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("unknown view preset '{0}'")]
    UnknownView(String),
    #[error("cannot edit '{path}': {reason}")]
    InvalidEdit { path: String, reason: &'static str },
}

/// Runs an interactive console session on stdin until `quit`, `exit` or EOF.
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Previz editor console");
    log::info!("   Type 'help' for commands, 'quit' to exit");

    let config = EditorConfig::load_from_file(&EditorConfig::config_path());
    let mut editor = match EditorContext::new(config) {
        Ok(editor) => editor.with_default_scene(),
        Err(err) => {
            log::error!("Failed to start editor: {}", err);
            return;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("stdin: {}", err);
                break;
            }
        };
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }
        if let Some(response) = editor.execute_command(&line) {
            if writeln!(stdout, "{response}").is_err() {
                break;
            }
        }
    }

    log::info!(
        "Session ended with {} object(s), {} history entries",
        editor.scene().object_count(),
        editor.history().len()
    );
}
