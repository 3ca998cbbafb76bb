//! Deep link and bookmarklet handlers

use anyhow::Result;

use klept_core::{bookmarklet, DeepLink, Library, SyncTask, ViewQuery};

use crate::commands::bookmark;
use crate::output::Output;

/// Act on a deep link: an add request wins over a tag filter
pub async fn handle(library: &Library, link: String, output: &Output) -> Result<Option<SyncTask>> {
    let deep_link = DeepLink::parse(&link);

    if let Some(add) = deep_link.add {
        let sync = bookmark::add(library, add.url, add.title, Vec::new(), output).await?;
        return Ok(Some(sync));
    }

    if deep_link.tag.is_some() {
        let query = ViewQuery::new("", deep_link.tag);
        bookmark::list(library, &query, output)?;
    } else {
        output.message("Link carries no tag or add action.");
    }
    Ok(None)
}

/// Print the bookmarklet for an app URL
pub fn show_bookmarklet(app_url: &str, output: &Output) {
    let script = bookmarklet(app_url);
    if output.is_json() {
        println!("{}", serde_json::json!({ "bookmarklet": script }));
    } else {
        println!("{}", script);
    }
}
