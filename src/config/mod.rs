pub mod prompt;
pub mod settings;
