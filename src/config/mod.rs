mod settings;

pub use settings::{write_show_percentage, Command, Config, PollSettings, Settings, UiSettings};
