//! # CLI Module
//!
//! User-facing commands of the `tunebridge` binary. Each command loads what it
//! needs from [`crate::config::Config`], delegates to the library components,
//! and reports through the console macros (`info!`, `success!`, `warning!`,
//! `error!`).
//!
//! - [`serve`] - run the HTTP server, optionally opening the login page
//! - [`fetch`] - run one proxied streaming API request in-process
//! - [`library`] - print a section of the local library as a table

mod fetch;
mod library;
mod serve;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use fetch::{fetch, parse_query_items};
pub use library::{LibrarySection, library};
pub use serve::serve;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}
