//! Background task that turns scheduler ticks into usage fetches.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::machine::{PollMode, PollScheduler, Tick};
use crate::usage::{RefreshOutcome, UsageService};

/// How long to sleep when no deadline is armed
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

/// Message sent from the UI to the poll task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    /// Usage panel became visible
    PopoverOpened,
    /// Usage panel was hidden
    PopoverClosed,
    /// User asked for a refresh
    Refresh,
    /// New credentials were stored
    CredentialsSaved,
    /// Stop the task
    Shutdown,
}

/// Message sent from the poll task to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// No credentials are stored; the setup form should be shown
    SetupRequired,
    /// Polling cadence changed
    ModeChanged(PollMode),
}

/// Owns the scheduler and spawns a refresh for every `Tick::FetchNow`.
///
/// Refreshes run detached so a slow request never delays the next tick;
/// overlapping ticks are collapsed by the service's in-flight guard.
pub struct PollDriver<C: Clock + 'static> {
    scheduler: PollScheduler<C>,
    service: Arc<UsageService>,
}

impl<C: Clock + 'static> PollDriver<C> {
    pub fn new(scheduler: PollScheduler<C>, service: Arc<UsageService>) -> Self {
        Self { scheduler, service }
    }

    /// Start polling in a background task
    pub fn start(self) -> (mpsc::Sender<PollCommand>, mpsc::Receiver<PollEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);

        tokio::spawn(async move {
            self.run(cmd_rx, event_tx).await;
        });

        (cmd_tx, event_rx)
    }

    /// Run the polling loop until `Shutdown` or the command sender is dropped
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<PollCommand>,
        events: mpsc::Sender<PollEvent>,
    ) {
        let has_credentials = self.service.has_credentials();
        match self.scheduler.launch(has_credentials) {
            Tick::FetchNow => self.spawn_refresh(),
            Tick::Wait => {
                let _ = events.send(PollEvent::SetupRequired).await;
            }
        }

        let mut last_mode = self.scheduler.mode();
        let _ = events.send(PollEvent::ModeChanged(last_mode)).await;

        loop {
            let sleep_for = self
                .scheduler
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(self.scheduler.now()))
                .unwrap_or(IDLE_SLEEP);

            let tick = tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    debug!("Poll command: {:?}", cmd);
                    match cmd {
                        PollCommand::PopoverOpened => self.scheduler.popover_opened(),
                        PollCommand::PopoverClosed => {
                            self.scheduler.popover_closed();
                            Tick::Wait
                        }
                        PollCommand::Refresh => {
                            let tick = self.scheduler.manual_refresh();
                            if tick == Tick::Wait && self.scheduler.is_paused() {
                                let _ = events.send(PollEvent::SetupRequired).await;
                            }
                            tick
                        }
                        PollCommand::CredentialsSaved => self.scheduler.credentials_saved(),
                        PollCommand::Shutdown => break,
                    }
                }
                _ = tokio::time::sleep(sleep_for) => self.scheduler.poll(),
            };

            if tick == Tick::FetchNow {
                self.spawn_refresh();
            }

            let mode = self.scheduler.mode();
            if mode != last_mode && events.send(PollEvent::ModeChanged(mode)).await.is_err() {
                break; // Receiver dropped
            }
            last_mode = mode;
        }

        info!("Poll task stopped");
    }

    fn spawn_refresh(&self) {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            match service.refresh().await {
                RefreshOutcome::Updated => {}
                RefreshOutcome::Failed(message) => warn!("Refresh failed: {}", message),
                RefreshOutcome::AlreadyRunning => debug!("Refresh skipped: already running"),
                RefreshOutcome::NoCredentials => debug!("Refresh skipped: no credentials"),
            }
        });
    }
}
