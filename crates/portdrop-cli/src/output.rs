//! Output formatting

use serde::Serialize;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Print `data` as JSON, or `text` for plain output
    pub fn print<T: Serialize>(&self, data: &T, text: impl FnOnce() -> String) {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Text => {
                println!("{}", text());
            }
        }
    }
}
