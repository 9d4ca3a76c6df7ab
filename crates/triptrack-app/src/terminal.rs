//! Terminal host and log-based renderer

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use triptrack_core::client::ClientHandle;
use triptrack_core::dashboard::CameraFocus;
use triptrack_core::render::{HeadlessDisplay, Host, Renderer, TextField};
use triptrack_core::telemetry::{Coordinates, PathPoint};

/// How long a reset confirmation waits for an answer
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a backend origin counts as a secure context
///
/// Mirrors the browser rule: HTTPS anywhere, or plain HTTP on loopback.
pub fn is_trusted_origin(scheme: &str, host: Option<&str>) -> bool {
    scheme == "https" || matches!(host, Some("localhost" | "127.0.0.1" | "[::1]" | "::1"))
}

/// Lines typed while a confirmation is pending are routed here
#[derive(Debug, Clone, Default)]
pub struct PromptState {
    awaiting: Arc<AtomicBool>,
}

/// Read stdin on a plain thread: `r` requests a reset, anything typed while a
/// prompt is open answers it
pub fn spawn_stdin_reader(
    handle: ClientHandle,
    prompt: PromptState,
    answers: mpsc::Sender<String>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim().to_string();

            if prompt.awaiting.load(Ordering::SeqCst) {
                if answers.send(line).is_err() {
                    break;
                }
                continue;
            }

            match line.as_str() {
                "r" | "R" | "reset" => {
                    if !handle.reset() {
                        break;
                    }
                }
                "" => {}
                other => tracing::info!("Unknown command '{}' (type 'r' to reset the trip)", other),
            }
        }
        tracing::debug!("stdin closed");
    })
}

/// [`Host`] backed by the terminal
pub struct TerminalHost {
    secure: bool,
    assume_yes: bool,
    prompt: PromptState,
    answers: mpsc::Receiver<String>,
}

impl TerminalHost {
    pub fn new(
        secure: bool,
        assume_yes: bool,
        prompt: PromptState,
        answers: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            secure,
            assume_yes,
            prompt,
            answers,
        }
    }

    fn read_answer(&self) -> Option<String> {
        // Drop anything typed before the question was asked
        while self.answers.try_recv().is_ok() {}
        self.prompt.awaiting.store(true, Ordering::SeqCst);
        let answer = tokio::task::block_in_place(|| self.answers.recv_timeout(CONFIRM_TIMEOUT));
        self.prompt.awaiting.store(false, Ordering::SeqCst);
        answer.ok()
    }
}

impl Host for TerminalHost {
    fn is_secure_context(&self) -> bool {
        self.secure
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            tracing::info!("{} (yes, --yes given)", prompt);
            return true;
        }

        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();

        match self.read_answer() {
            Some(answer) => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
            None => {
                tracing::warn!("No answer to confirmation, assuming no");
                false
            }
        }
    }

    fn alert(&mut self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Keeps a [`HeadlessDisplay`] and logs one line per frame
#[derive(Debug, Default)]
pub struct LogRenderer {
    display: HeadlessDisplay,
    last_line: String,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(&mut self) {
        let line = self.display.summary();
        if line != self.last_line {
            tracing::info!("{}", line);
            self.last_line = line;
        }
    }
}

impl Renderer for LogRenderer {
    fn set_text(&mut self, field: TextField, text: &str) {
        self.display.set_text(field, text);
        if field == TextField::Gps {
            self.flush();
        }
    }

    fn set_gauge(&mut self, fraction: f64) {
        self.display.set_gauge(fraction);
    }

    fn replace_path(&mut self, path: &[PathPoint]) {
        let cleared = path.is_empty() && !self.display.path.is_empty();
        self.display.replace_path(path);
        if cleared {
            self.flush();
        }
    }

    fn move_marker(&mut self, position: Coordinates) {
        self.display.move_marker(position);
        tracing::debug!(
            "Position {:.6}, {:.6}",
            position.latitude,
            position.longitude
        );
    }

    fn set_camera(&mut self, focus: CameraFocus) {
        self.display.set_camera(focus);
    }

    fn set_online(&mut self, online: bool) {
        self.display.set_online(online);
        self.flush();
    }
}
