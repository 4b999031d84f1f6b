//! Link filtering for structured (grouped) search results.
//!
//! Some gateways answer with JSON groups of items instead of the text block format. Only
//! HTML-like links survive; items the gateway tagged with a MIME type (PDFs, office docs)
//! are dropped outright.

use ragctx_core::SearchResultItem;
use serde::{Deserialize, Deserializer};

const HTML_LIKE_EXTENSIONS: [&str; 4] = ["", ".html", ".htm", ".shtml"];

#[derive(Debug, Clone, Deserialize)]
pub struct ResultGroup {
    pub items: Vec<LinkItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    /// Presence matters, not the value: `"mime": null` still marks a non-HTML item.
    #[serde(default, deserialize_with = "present")]
    pub mime: Option<serde_json::Value>,
}

fn present<'de, D>(d: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(d).map(Some)
}

/// Accept either a list of groups or a single group object. Array elements without an
/// `items` key are skipped; the body counts as groups only if at least one element has it.
pub fn parse_groups(body: &str) -> Option<Vec<ResultGroup>> {
    match serde_json::from_str::<serde_json::Value>(body).ok()? {
        serde_json::Value::Array(elems) => {
            let groups: Vec<ResultGroup> = elems
                .into_iter()
                .filter(|v| v.get("items").is_some())
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect();
            (!groups.is_empty()).then_some(groups)
        }
        v @ serde_json::Value::Object(_) => serde_json::from_value::<ResultGroup>(v)
            .ok()
            .map(|g| vec![g]),
        _ => None,
    }
}

/// File extension of the last path segment, case preserved. `""` when there is none.
fn link_extension(link: &str) -> String {
    let path = match url::Url::parse(link) {
        Ok(u) => u.path().to_string(),
        Err(_) => link.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rfind('.') {
        // A leading dot (".profile") is a hidden name, not an extension.
        Some(i) if i > 0 => last[i..].to_string(),
        _ => String::new(),
    }
}

fn keep(item: &LinkItem) -> Option<&str> {
    if item.mime.is_some() {
        return None;
    }
    let link = item.link.as_deref()?;
    let ext = link_extension(link);
    HTML_LIKE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(link)
}

/// Links that point at HTML-like pages, in group/item order.
pub fn filter_links(groups: &[ResultGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|g| g.items.iter())
        .filter_map(keep)
        .map(|s| s.to_string())
        .collect()
}

/// Same filter as [`filter_links`], keeping the whole item for the pipeline.
pub fn filter_items(groups: &[ResultGroup]) -> Vec<SearchResultItem> {
    groups
        .iter()
        .flat_map(|g| g.items.iter())
        .filter(|it| keep(it).is_some())
        .map(|it| SearchResultItem {
            title: it.title.clone(),
            link: it.link.clone(),
            snippet: it.snippet.clone(),
        })
        .collect()
}
