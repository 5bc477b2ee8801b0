//! Installer and launcher for the SuperSurf voice assistant.
//!
//! `surf-install` checks the toolchain, creates the isolated Python
//! environment, installs the pinned dependencies and walks the user through
//! the API keys. `surf-run` re-checks the runtime libraries and hands off to
//! the assistant.

pub mod bootstrap;
pub mod config;
pub mod configure;
pub mod error;
pub mod input;
pub mod install;
pub mod launch;
pub mod logging;
pub mod provision;
pub mod settings;
pub mod shell;
pub mod ui;
pub mod validate;

pub use error::{BootstrapError, Result};
