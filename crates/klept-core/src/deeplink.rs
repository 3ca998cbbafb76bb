//! Deep links into the app
//!
//! Links carry their intent in the query string:
//! - `?tag=rust` pre-selects a tag filter
//! - `?action=add&url=...&title=...` pre-fills the add form
//!
//! The bookmarklet produces the second form from any page.

use std::borrow::Cow;

use url::form_urlencoded;
use url::Url;

/// Request to add a bookmark, as carried by a deep link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub url: String,
    pub title: Option<String>,
}

/// Parameters understood in a deep link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    pub tag: Option<String>,
    pub add: Option<AddRequest>,
}

impl DeepLink {
    /// Parse a full URL or a bare query string (with or without `?`)
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) => Self::from_pairs(url.query_pairs()),
            Err(_) => {
                let query = input.split_once('?').map_or(input, |(_, q)| q);
                Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
            }
        }
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut tag = None;
        let mut action = None;
        let mut url = None;
        let mut title = None;

        for (key, value) in pairs {
            let value = value.into_owned();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "tag" => tag = Some(value),
                "action" => action = Some(value),
                "url" => url = Some(value),
                "title" => title = Some(value),
                _ => {}
            }
        }

        let add = match (action.as_deref(), url) {
            (Some("add"), Some(url)) => Some(AddRequest { url, title }),
            _ => None,
        };

        Self { tag, add }
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.add.is_none()
    }
}

/// `javascript:` URL that sends the current page to the app's add form
pub fn bookmarklet(app_url: &str) -> String {
    let base = app_url.split(['?', '#']).next().unwrap_or(app_url);
    format!(
        "javascript:(function(){{window.location.href='{}?action=add&url='+encodeURIComponent(window.location.href)+'&title='+encodeURIComponent(document.title)}})()",
        base.replace('\'', "%27")
    )
}
