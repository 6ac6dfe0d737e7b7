use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while HMCs are being scanned for LPAR profiles.
/// Suppressed in debug mode, where protocol logging takes its place.
pub fn scanning() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}").unwrap();
    spinner.set_style(style);
    spinner.set_message("Scanning HMCs for LPAR profiles...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
