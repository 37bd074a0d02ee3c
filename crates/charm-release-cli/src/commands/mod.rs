pub mod completions;
pub mod doctor;
pub mod man_pages;
pub mod release;

use charm_release_runtime::ToolConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Load the tool configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<ToolConfig, String> {
    match path {
        Some(p) => ToolConfig::load(p).map_err(|e| format!("{}: {e}", p.display())),
        None => ToolConfig::load_default().map_err(|e| e.to_string()),
    }
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finished_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(finished_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(finished_style());
    pb.finish_with_message(format!("✗ {msg}"));
}
