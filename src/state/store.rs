use parking_lot::RwLock;
use std::sync::Arc;

use usagebar_core::credentials::{CredentialError, Credentials};
use usagebar_core::scheduler::PollMode;
use usagebar_core::usage::UsageSnapshot;

/// Shared state type alias
pub type SharedState = Arc<RwLock<AppState>>;

/// Focusable field of the settings form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    OrgId,
    SessionKey,
    ShowPercentage,
}

impl FormField {
    /// Get the next field in cycle
    pub fn next(self) -> Self {
        match self {
            FormField::OrgId => FormField::SessionKey,
            FormField::SessionKey => FormField::ShowPercentage,
            FormField::ShowPercentage => FormField::OrgId,
        }
    }

    /// Get the previous field in cycle
    pub fn previous(self) -> Self {
        match self {
            FormField::OrgId => FormField::ShowPercentage,
            FormField::SessionKey => FormField::OrgId,
            FormField::ShowPercentage => FormField::SessionKey,
        }
    }
}

/// Single-line text buffer with a byte-offset cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    /// Create a field holding `value` with the cursor at the end
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Cursor position (byte offset)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert a character at cursor position
    pub fn insert(&mut self, c: char) {
        if c == '\n' || c == '\r' {
            return;
        }
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete character before cursor (backspace)
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.value.remove(prev);
            self.cursor = prev;
        }
    }

    /// Delete character at cursor (delete key)
    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }

    /// Clear the whole field (Ctrl+U)
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn prev_boundary(&self) -> usize {
        self.value[..self.cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Settings form: organization ID, session key and the show-percentage toggle
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub org_id: TextField,
    pub session_key: TextField,
    pub show_percentage: bool,
    pub focus: FormField,
    /// Error from the last save attempt
    pub error: Option<String>,
}

impl SettingsForm {
    /// Pre-fill from stored credentials, if any
    pub fn new(stored: Option<&Credentials>, show_percentage: bool) -> Self {
        let (org_id, session_key) = stored
            .map(|c| (c.org_id(), c.session_key()))
            .unwrap_or_default();
        Self {
            org_id: TextField::with_value(org_id),
            session_key: TextField::with_value(session_key),
            show_percentage,
            focus: FormField::default(),
            error: None,
        }
    }

    /// Save is allowed once both fields are non-blank after trimming
    pub fn can_save(&self) -> bool {
        !self.org_id.value().trim().is_empty() && !self.session_key.value().trim().is_empty()
    }

    /// Trimmed credentials from the form
    pub fn credentials(&self) -> Result<Credentials, CredentialError> {
        Credentials::new(self.session_key.value(), self.org_id.value())
    }

    /// Text field under focus, if focus is on one
    pub fn focused_text_mut(&mut self) -> Option<&mut TextField> {
        match self.focus {
            FormField::OrgId => Some(&mut self.org_id),
            FormField::SessionKey => Some(&mut self.session_key),
            FormField::ShowPercentage => None,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn toggle_show_percentage(&mut self) {
        self.show_percentage = !self.show_percentage;
    }
}

/// Application state
#[derive(Debug)]
pub struct AppState {
    /// Latest usage snapshot
    pub snapshot: UsageSnapshot,
    /// Current poll cadence
    pub poll_mode: PollMode,
    /// Whether the usage panel is shown
    pub panel_open: bool,
    /// Whether help popup is shown
    pub show_help: bool,
    /// Open settings form
    pub form: Option<SettingsForm>,
    /// Show the percentage next to the bar glyph
    pub show_percentage: bool,
    /// Transient message shown in the status strip
    pub message: Option<String>,
    /// Whether the app is running
    pub running: bool,
}

impl AppState {
    /// Create a new application state
    pub fn new(show_percentage: bool) -> Self {
        Self {
            snapshot: UsageSnapshot::default(),
            poll_mode: PollMode::Idle,
            panel_open: false,
            show_help: false,
            form: None,
            show_percentage,
            message: None,
            running: true,
        }
    }

    /// Create a new shared state
    pub fn shared(show_percentage: bool) -> SharedState {
        Arc::new(RwLock::new(Self::new(show_percentage)))
    }

    /// Toggle the usage panel; returns whether it is now open
    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    /// Toggle help popup
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Open the settings form unless it is already open
    pub fn open_settings(&mut self, stored: Option<&Credentials>) {
        if self.form.is_none() {
            self.form = Some(SettingsForm::new(stored, self.show_percentage));
        }
    }

    pub fn close_settings(&mut self) {
        self.form = None;
    }

    pub fn is_settings_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(false)
    }
}
