use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use usagebar_core::presentation::panel_view;
use usagebar_core::scheduler::{PollCommand, PollDriver, PollEvent, PollScheduler, SystemClock};
use usagebar_core::usage::{UsageService, UsageSnapshotReceiver};

use crate::config::Settings;
use crate::state::{AppState, SharedState};

use super::components::{
    Footer, HelpPopup, SettingsFormWidget, StatusLine, Theme, UsagePanel, FORM_HEIGHT, FORM_WIDTH,
};
use super::key_handler::{resolve_key, KeyAction};
use super::Layout;

/// Main application
pub struct App {
    state: SharedState,
    settings: Settings,
    service: Arc<UsageService>,
    layout: Layout,
}

impl App {
    /// Create a new application
    pub fn new(settings: Settings, service: Arc<UsageService>) -> Self {
        let state = AppState::shared(settings.ui.show_percentage);

        Self {
            state,
            settings,
            service,
            layout: Layout::new(),
        }
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Start poll task
        let scheduler = PollScheduler::new(SystemClock, self.settings.cadence());
        let (commands, mut events) = PollDriver::new(scheduler, Arc::clone(&self.service)).start();
        let mut snapshots = self.service.subscribe();

        // Main loop
        let result = self
            .main_loop(&mut terminal, &commands, &mut events, &mut snapshots)
            .await;

        let _ = commands.send(PollCommand::Shutdown).await;

        // Restore terminal
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        commands: &mpsc::Sender<PollCommand>,
        events: &mut mpsc::Receiver<PollEvent>,
        snapshots: &mut UsageSnapshotReceiver,
    ) -> Result<()> {
        let theme = Theme::new(self.settings.ui.color);

        loop {
            // Check if we should quit
            {
                let state = self.state.read();
                if !state.running {
                    break;
                }
            }

            // Pick up the latest snapshot
            if snapshots.has_changed().unwrap_or(false) {
                let snapshot = snapshots.borrow_and_update().clone();
                self.state.write().snapshot = snapshot;
            }

            // Draw UI
            terminal.draw(|frame| {
                let state = self.state.read();
                let view = panel_view(&state.snapshot, &chrono::Local::now());
                let panel_height = state.panel_open.then(|| UsagePanel::height(&view));
                let areas = self.layout.calculate(frame.area(), panel_height);

                StatusLine::render(frame, areas.status, &state, theme);
                if let Some(panel_area) = areas.panel {
                    UsagePanel::render(frame, panel_area, &state.snapshot, &view, theme);
                }
                Footer::render(frame, areas.footer, &state, theme);

                // Render popups
                if let Some(form) = &state.form {
                    let popup_area =
                        self.layout
                            .fixed_popup_area(frame.area(), FORM_WIDTH, FORM_HEIGHT);
                    SettingsFormWidget::render(frame, popup_area, form, theme);
                }
                if state.show_help {
                    let popup_area = self.layout.popup_area(frame.area(), 60, 70);
                    HelpPopup::render(frame, popup_area);
                }
            })?;

            // Handle events with timeout
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        let action = {
                            let mut state = self.state.write();
                            resolve_key(&mut state, key.code, key.modifiers)
                        };
                        self.execute(action, commands).await;
                    }
                }
            }

            // Process poll events
            while let Ok(event) = events.try_recv() {
                match event {
                    PollEvent::SetupRequired => self.open_settings(),
                    PollEvent::ModeChanged(mode) => {
                        self.state.write().poll_mode = mode;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run an action decided by the key handler
    async fn execute(&mut self, action: KeyAction, commands: &mpsc::Sender<PollCommand>) {
        match action {
            KeyAction::None => {}
            KeyAction::Poll(command) => {
                if commands.send(command).await.is_err() {
                    warn!("Poll task is not running");
                }
            }
            KeyAction::OpenSettings => self.open_settings(),
            KeyAction::SaveSettings => {
                if self.save_settings()
                    && commands.send(PollCommand::CredentialsSaved).await.is_err()
                {
                    warn!("Poll task is not running");
                }
            }
        }
    }

    /// Open the settings form pre-filled from the credential store
    fn open_settings(&self) {
        let stored = match self.service.store().load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to read stored credentials: {}", e);
                None
            }
        };
        self.state.write().open_settings(stored.as_ref());
    }

    /// Store the form's credentials and preference; returns whether
    /// credentials were saved
    fn save_settings(&mut self) -> bool {
        let Some(form) = self.state.read().form.clone() else {
            return false;
        };

        let credentials = match form.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                self.set_form_error(e.to_string());
                return false;
            }
        };

        if let Err(e) = self.service.store().save(&credentials) {
            warn!("Failed to save credentials: {}", e);
            self.set_form_error(e.to_string());
            return false;
        }

        let mut message = "Settings saved".to_string();
        if form.show_percentage != self.settings.ui.show_percentage {
            if let Err(e) = self.settings.set_show_percentage(form.show_percentage) {
                warn!("Failed to persist show_percentage: {:#}", e);
                message = format!("Saved credentials; could not write config: {}", e);
            }
        }

        let mut state = self.state.write();
        state.show_percentage = form.show_percentage;
        state.close_settings();
        state.set_message(message);
        info!("Credentials saved for org {}", credentials.org_id());
        true
    }

    fn set_form_error(&self, error: String) {
        if let Some(form) = self.state.write().form.as_mut() {
            form.error = Some(error);
        }
    }
}
