mod help_popup;
mod settings_form;
mod status_line;
mod theme;
mod usage_panel;

pub use help_popup::HelpPopup;
pub use settings_form::{SettingsFormWidget, FORM_HEIGHT, FORM_WIDTH};
pub use status_line::{Footer, StatusLine};
pub use theme::Theme;
pub use usage_panel::UsagePanel;
