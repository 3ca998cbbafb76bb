//! Tag command handlers

use klept_core::Library;

use crate::output::Output;

/// List all tags with usage counts
pub fn list(library: &Library, output: &Output) {
    output.print_tags(&library.tags_with_counts());
}
