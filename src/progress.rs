//! Utilities for creating and styling progress indicators using the `indicatif` crate.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar of a specified length with desired styling.
pub fn progress_bar(len: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(len);
    progress_bar.set_style(ProgressStyle::default_bar().template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {percent}% [{human_pos}/{human_len}] [Remaining: {eta}]",
    ).expect("Invalid progress style."));

    progress_bar
}

/// Create a spinner for work of unknown length.
pub fn spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template(
        "[{elapsed_precise}] {spinner:.cyan} {msg}",
    ).expect("Invalid progress style."));
    spinner.set_message(msg.to_string());

    spinner
}
