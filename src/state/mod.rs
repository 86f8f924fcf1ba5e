mod store;

pub use store::{AppState, FormField, SettingsForm, SharedState, TextField};
