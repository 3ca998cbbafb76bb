//! Status command handler

use anyhow::Result;

use klept_core::{Library, ViewQuery};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(library: &Library, output: &Output) -> Result<()> {
    let config = library.config();
    let settings = library.settings();
    let bookmarks = library.bookmarks();
    let pinned = bookmarks.iter().filter(|b| b.pinned).count();
    let tags = library.all_tags().len();
    let counts = library.counts(&ViewQuery::default());
    let status = library.status();
    let last_error = library.last_error();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{:#}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "sync": {
                        "enabled": settings.sync_enabled(),
                        "gist_id": settings.gist_id,
                        "gist_file": config.gist_file,
                        "status": status.label(),
                        "last_error": last_error
                    },
                    "counts": {
                        "bookmarks": counts.total,
                        "pinned": pinned,
                        "tags": tags
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", status);
        }
        OutputFormat::Human => {
            println!("Klept Status");
            println!("============");
            println!();
            println!("Sync:");
            if settings.sync_enabled() {
                println!("  Gist:   {} ({})", settings.gist_id, config.gist_file);
                println!("  Status: {}", status);
                if let Some(error) = last_error {
                    println!("  Error:  {}", error);
                }
            } else {
                println!("  Status: disabled");
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Contents:");
            println!("  Bookmarks: {}", counts.total);
            println!("  Pinned:    {}", pinned);
            println!("  Tags:      {}", tags);
        }
    }

    Ok(())
}
