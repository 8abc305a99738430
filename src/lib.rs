//! tunebridge library
//!
//! A caching, self-throttling proxy in front of a rate-limited streaming API
//! (Spotify) and a free metadata API (Deezer), with a small local library
//! store for a single-user music frontend.
//!
//! # Modules
//!
//! - `api` - HTTP handlers and the shared application state
//! - `cache` - In-memory TTL cache and the per-resource TTL policy
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `convert` - Metadata track to streaming URI conversion
//! - `credential` - Client credential with single-flight refresh
//! - `error` - Error taxonomy and its HTTP rendering
//! - `management` - Local library persistence
//! - `metadata` - Metadata API client and artist name resolution
//! - `oauth` - Authorization-code login for end users
//! - `proxy` - Credential routing and caching for the streaming API
//! - `scheduler` - Serialized, spaced request queue with throttling retries
//! - `server` - Router assembly and the HTTP listener
//! - `types` - Data structures and type definitions
//! - `upstream` - Outbound HTTP through the scheduler
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use tunebridge::{api::AppState, config::{self, Config}, server};
//!
//! #[tokio::main]
//! async fn main() -> tunebridge::Res<()> {
//!     config::load_env().await?;
//!     let state = AppState::new(Config::from_env()?)?;
//!     server::start_api_server(state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod credential;
pub mod error;
pub mod management;
pub mod metadata;
pub mod oauth;
pub mod proxy;
pub mod scheduler;
pub mod server;
pub mod types;
pub mod upstream;
pub mod utils;

/// Boxed-error result used by the CLI glue, where errors are only printed.
///
/// ```
/// use tunebridge::Res;
///
/// async fn print_library() -> Res<()> {
///     Ok(())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational console line with a blue bullet.
///
/// Accepts the same arguments as `println!`. Console output only; server
/// logging goes through `tracing`.
///
/// ```
/// info!("Starting server on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success line with a green checkmark.
///
/// ```
/// success!("Fetched {} in {:?}", path, elapsed);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error line with a red exclamation mark and exits with code 1.
///
/// Only for fatal CLI errors; code after the call does not run.
///
/// ```
/// error!("Cannot load configuration: {}", e);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning line with a yellow exclamation mark.
///
/// ```
/// warning!("Library file not found, starting empty");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
