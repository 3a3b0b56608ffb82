//! Presentation shells: the channels that drive the chat controller.
//!
//! # Architecture
//!
//! Each channel (console, HTTP) implements [`Component`] and is spawned as an
//! independent task by [`start`]. All channels share one controller through
//! [`SharedController`]; the lock is only held while a transition runs, never
//! across the remote call, so every channel can observe `busy` while a reply
//! is pending and a second submit is rejected rather than queued.

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::chat::{ChatController, PendingReply};
use crate::config::Config;
use crate::error::AppError;

/// The controller as shared between channels.
pub type SharedController = Arc<Mutex<ChatController>>;

pub fn shared(controller: ChatController) -> SharedController {
    Arc::new(Mutex::new(controller))
}

// ── Submit helpers ────────────────────────────────────────────────────────────

/// Why a submit produced no request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// A reply is already pending.
    Busy,
    /// The text was blank after trimming.
    Blank,
}

/// Run the submit transition. `None` submits the controller's input buffer.
pub async fn begin(controller: &SharedController, text: Option<&str>) -> Result<PendingReply, Rejected> {
    let mut ctl = controller.lock().await;
    if ctl.is_busy() {
        return Err(Rejected::Busy);
    }
    let pending = match text {
        Some(t) => ctl.submit(t),
        None => ctl.submit_input(),
    };
    pending.ok_or(Rejected::Blank)
}

/// Resolve `pending` and settle the controller.
///
/// The call and the settle run in their own task, so a caller that goes away
/// mid-request (an HTTP client disconnecting) cannot leave the controller
/// stuck in `AwaitingReply`.
pub async fn finish(controller: &SharedController, pending: PendingReply) -> Result<(), AppError> {
    let controller = controller.clone();
    let task = tokio::spawn(async move {
        let outcome = pending.resolve().await;
        controller.lock().await.settle(outcome);
    });
    task.await
        .map_err(|e| AppError::Comms(format!("reply task failed: {e}")))
}

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A concurrently-runnable channel.
///
/// Implementors capture the shared controller at construction time;
/// [`Component::run`] runs until `shutdown` is cancelled or the channel's own
/// input ends.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// Which channels to start, after CLI flags have been applied to config.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelSelection {
    pub pty: bool,
    pub http: bool,
}

impl ChannelSelection {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pty: config.comms.pty.enabled,
            http: config.comms.http.enabled,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.pty && !self.http
    }
}

/// Spawn the selected channels. The returned handle resolves when all of them
/// have exited and yields the first error, if any.
pub fn start(
    config: &Config,
    selection: ChannelSelection,
    controller: SharedController,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), AppError>> {
    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if selection.pty {
            info!("loading console channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", controller.clone())));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if selection.http {
            info!(bind = %config.comms.http.bind, "loading http channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                controller.clone(),
            )));
        }
    }

    // Unused when both channel features are compiled out.
    let _ = (config, &selection, &controller);

    if components.is_empty() {
        info!("no channels loaded, waiting for shutdown");
    }

    spawn_components(components, shutdown)
}

/// Spawn each [`Component`] as its own task.
///
/// Any component exiting (cleanly or not) cancels `shutdown`: once the
/// console is closed or the server stops, the process winds down.
fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), AppError>> {
    tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            debug!(component = %component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        if set.is_empty() {
            shutdown.cancelled().await;
            return Ok(());
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            shutdown.cancel();
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}
