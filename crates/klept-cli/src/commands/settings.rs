//! Settings command handlers
//!
//! Settings are the user's sync credentials and theme, stored next to the
//! bookmarks. Saving credentials triggers a pull from the gist.

use anyhow::{bail, Result};

use klept_core::{Library, SyncTask, Theme};

use crate::output::{mask_secret, Output, OutputFormat};

/// Show current settings
pub fn show(library: &Library, output: &Output) -> Result<()> {
    let settings = library.settings();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{:#}",
                serde_json::json!({
                    "gist_id": settings.gist_id,
                    "github_token": mask_secret(&settings.github_token),
                    "theme": settings.theme.to_string(),
                    "sync_enabled": settings.sync_enabled()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", settings.gist_id);
        }
        OutputFormat::Human => {
            println!("Settings:");
            println!(
                "  gist_id:      {}",
                if settings.gist_id.is_empty() {
                    "(not set)"
                } else {
                    &settings.gist_id
                }
            );
            println!("  github_token: {}", mask_secret(&settings.github_token));
            println!("  theme:        {}", settings.theme);
            println!();
            println!(
                "Sync: {}",
                if settings.sync_enabled() {
                    "enabled"
                } else {
                    "disabled (set gist_id and github_token)"
                }
            );
        }
    }

    Ok(())
}

/// Set a settings value
pub fn set(library: &Library, key: String, value: String, output: &Output) -> Result<SyncTask> {
    let mut settings = library.settings();
    let value = value.trim().to_string();

    let shown = match key.as_str() {
        "gist_id" => {
            settings.gist_id = value.clone();
            value
        }
        "github_token" => {
            settings.github_token = value.clone();
            mask_secret(&value)
        }
        "theme" => {
            settings.theme = value.parse::<Theme>().map_err(anyhow::Error::msg)?;
            settings.theme.to_string()
        }
        _ => {
            bail!(
                "Unknown setting: '{}'\n\
                 Valid keys: gist_id, github_token, theme",
                key
            );
        }
    };

    let sync_enabled = settings.sync_enabled();
    let sync = library.save_settings(settings);

    output.success(&format!("Set {} = {}", key, shown));
    if sync_enabled {
        output.message("Pulling bookmarks from gist...");
    }
    Ok(sync)
}
