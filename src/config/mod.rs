//! The assistant's `.env` file: lossless document model, known keys, and
//! first-run seeding from the checked-in example.

mod document;
pub mod keys;

use std::path::Path;

use tracing::info;

pub use document::EnvDocument;
pub use keys::{ConfigView, KNOWN_KEYS, KnownKey, is_placeholder, needs_prompt, parse_bool};

use crate::error::{BootstrapError, Result};
use crate::ui;

/// How the config file came to exist for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// It was already there; nothing was written
    Existing,
    /// Copied from the example template
    FromTemplate,
    /// Template missing too; an empty file was created
    Empty,
}

/// Make sure `config` exists, seeding it from `template` when it doesn't.
///
/// A missing template is not fatal: an empty file is created and a warning
/// shown, so later prompts still have somewhere to write.
pub fn ensure_config_file(config: &Path, template: &Path) -> Result<SeedOutcome> {
    if config.exists() {
        info!(path = %config.display(), "config file present");
        return Ok(SeedOutcome::Existing);
    }

    if template.is_file() {
        std::fs::copy(template, config).map_err(|e| {
            BootstrapError::io(
                format!("copying {} to {}", template.display(), config.display()),
                e,
            )
        })?;
        ui::info(format!(
            "Created {} from {}",
            display_name(config),
            display_name(template)
        ));
        return Ok(SeedOutcome::FromTemplate);
    }

    std::fs::write(config, "")
        .map_err(|e| BootstrapError::io(format!("creating {}", config.display()), e))?;
    ui::warning(format!(
        "{} not found; created an empty {}",
        display_name(template),
        display_name(config)
    ));
    Ok(SeedOutcome::Empty)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
