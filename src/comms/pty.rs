//! Console channel: reads lines from stdin, submits them to the controller
//! and prints the guide's turns to stdout.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin is closed.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, Role};
use crate::error::AppError;

use super::{Component, ComponentFuture, Rejected, SharedController, begin, finish};

const GUIDE_PREFIX: &str = "angika › ";
const BUSY_INDICATOR: &str = "        · · ·";

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    controller: SharedController,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, controller: SharedController) -> Self {
        Self { channel_id: channel_id.into(), controller }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.controller, shutdown))
    }
}

/// Console line for a turn. User turns are not echoed back.
fn render(message: &ChatMessage) -> Option<String> {
    match message.role {
        Role::User => None,
        Role::Model if message.is_error() => Some(format!("{GUIDE_PREFIX}{} [!]", message.text)),
        Role::Model => Some(format!("{GUIDE_PREFIX}{}", message.text)),
    }
}

/// The text to submit for a console line: the line as typed, or `None` when
/// it is blank. Trimming only decides blankness, as in the HTTP shell.
fn submission(line: &str) -> Option<&str> {
    (!line.trim().is_empty()).then_some(line)
}

fn print_from(messages: &[ChatMessage], from: usize) {
    for line in messages.iter().skip(from).filter_map(render) {
        println!("{line}");
    }
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(
    channel_id: String,
    controller: SharedController,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "console channel started. Type a message and press Enter. Ctrl-C to quit.");
    println!("─────────────────────────────────");
    println!(" Angika guide  (Ctrl-C to quit)");
    println!("─────────────────────────────────");
    print_from(controller.lock().await.messages(), 0);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let input = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!("console channel shutting down");
                break;
            }

            line = lines.next_line() => match line {
                Err(e) => {
                    warn!("console read error: {e}");
                    break;
                }
                Ok(None) => {
                    info!("console stdin closed");
                    break;
                }
                Ok(Some(input)) => input,
            },
        };

        let Some(text) = submission(&input) else {
            continue;
        };
        debug!(len = text.len(), "console received line");

        let pending = match begin(&controller, Some(text)).await {
            Ok(pending) => pending,
            Err(Rejected::Busy) => {
                println!("(the guide is still answering another message)");
                continue;
            }
            Err(Rejected::Blank) => continue,
        };

        // Index of the first turn this exchange can add after the user turn.
        let from = controller.lock().await.messages().len();
        println!("{BUSY_INDICATOR}");

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("console channel shutting down with a reply pending");
                break;
            }

            settled = finish(&controller, pending) => settled?,
        }

        print_from(controller.lock().await.messages(), from);
    }

    Ok(())
}
