//! Bookmark command handlers

use anyhow::{bail, Context, Result};

use klept_core::{parse_tags, Library, NewBookmark, SyncTask, ViewQuery};

use crate::output::{short_id, Output};
use crate::prompt::{confirm, prompt_with_default};

/// Fields to change on an existing bookmark
#[derive(Debug, Default)]
pub struct BookmarkEdit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<String>,
}

impl BookmarkEdit {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.tags.is_none()
    }
}

/// Add a bookmark
pub async fn add(
    library: &Library,
    url: String,
    title: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<SyncTask> {
    let tags = tags.iter().flat_map(|t| parse_tags(t)).collect();
    let input = NewBookmark {
        url,
        title,
        tags,
    };

    let (bookmark, sync) = library
        .add_bookmark(input)
        .await
        .context("Failed to add bookmark")?;

    output.success(&format!("Added bookmark: {}", short_id(&bookmark.id)));
    output.print_bookmark(&bookmark)?;
    Ok(sync)
}

/// List bookmarks in display order
pub fn list(library: &Library, query: &ViewQuery, output: &Output) -> Result<()> {
    let bookmarks = library.view(query);
    output.print_bookmarks(&bookmarks, library.counts(query), query.is_filtered())
}

/// Edit a bookmark, prompting for each field when none are given
pub fn edit(library: &Library, id: String, edit: BookmarkEdit, output: &Output) -> Result<SyncTask> {
    let mut bookmark = library.find(&id)?;

    let edit = if edit.is_empty() && output.should_prompt() {
        println!("Editing bookmark: {}", bookmark.id);
        println!("Press Enter to keep current value, or type new value.\n");
        BookmarkEdit {
            title: prompt_with_default("Title", &bookmark.title)?,
            url: prompt_with_default("URL", &bookmark.url)?,
            tags: prompt_with_default("Tags (comma-separated)", &bookmark.tags.join(", "))?,
        }
    } else {
        edit
    };

    if let Some(title) = edit.title {
        if title.trim().is_empty() {
            bail!("Title cannot be empty");
        }
        bookmark.set_title(title.trim());
    }
    if let Some(url) = edit.url {
        if url.trim().is_empty() {
            bail!("URL cannot be empty");
        }
        bookmark.set_url(&url);
    }
    if let Some(tags) = edit.tags {
        bookmark.set_tags(parse_tags(&tags));
    }

    let (_, sync) = library.update_bookmark(bookmark.clone());

    output.success("Bookmark updated");
    output.print_bookmark(&bookmark)?;
    Ok(sync)
}

/// Toggle the pinned flag
pub fn pin(library: &Library, id: String, output: &Output) -> Result<SyncTask> {
    let bookmark = library.find(&id)?;
    let (pinned, sync) = library.toggle_pin(&bookmark.id);

    let state = if pinned.unwrap_or(false) { "Pinned" } else { "Unpinned" };
    output.success(&format!("{}: {}", state, bookmark.title));
    Ok(sync)
}

/// Delete a bookmark
pub fn delete(library: &Library, id: String, yes: bool, output: &Output) -> Result<Option<SyncTask>> {
    let bookmark = library.find(&id)?;

    if !yes && output.should_prompt() {
        println!("Delete bookmark: {} - {}", short_id(&bookmark.id), bookmark.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(None);
        }
    }

    let (_, sync) = library.delete_bookmark(&bookmark.id);

    output.success(&format!("Deleted bookmark: {}", short_id(&bookmark.id)));
    Ok(Some(sync))
}

/// Open the top result for a query in the browser
pub fn open(library: &Library, query: &ViewQuery, output: &Output) -> Result<()> {
    let bookmarks = library.bookmarks();
    let Some(bookmark) = query.first_match(&bookmarks) else {
        bail!("No bookmark matches the query");
    };

    open::that(&bookmark.url).with_context(|| format!("Failed to open {}", bookmark.url))?;
    output.message(&format!("Opening {}", bookmark.url));
    Ok(())
}
