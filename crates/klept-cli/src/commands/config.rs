//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use klept_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "gist_file": config.gist_file,
                    "title_proxy_url": config.title_proxy_url,
                    "status_display_ms": config.status_display_ms,
                    "http_timeout_secs": config.http_timeout_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!("  api_url:           {}", config.api_url);
            println!("  gist_file:         {}", config.gist_file);
            println!("  title_proxy_url:   {}", config.title_proxy_url);
            println!("  status_display_ms: {}", config.status_display_ms);
            println!("  http_timeout_secs: {}", config.http_timeout_secs);
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "api_url" => {
            config.api_url = non_empty(key, value)?;
        }
        "gist_file" => {
            config.gist_file = non_empty(key, value)?;
        }
        "title_proxy_url" => {
            config.title_proxy_url = non_empty(key, value)?;
        }
        "status_display_ms" => {
            config.status_display_ms = value
                .parse()
                .context("Invalid value for status_display_ms. Use a number of milliseconds.")?;
        }
        "http_timeout_secs" => {
            config.http_timeout_secs = value
                .parse()
                .context("Invalid value for http_timeout_secs. Use a number of seconds.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, gist_file, title_proxy_url, \
                 status_display_ms, http_timeout_secs, log_file",
                key
            );
        }
    }
    Ok(())
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        bail!("{} cannot be empty", key);
    }
    Ok(value.trim().to_string())
}
