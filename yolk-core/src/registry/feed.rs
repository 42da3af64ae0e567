//! Recent-updates RSS feed parsing

use super::types::FeedEntry;
use super::xml;
use crate::error::{Result, YolkError};

/// Items of an RSS 2.0 document, in document order
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>> {
    let root = xml::parse(body, "RSS feed")?;
    let channel = root
        .child("channel")
        .ok_or_else(|| YolkError::registry("RSS feed has no channel"))?;

    Ok(channel
        .children_named("item")
        .map(|item| FeedEntry {
            name: item.child_text("title"),
            summary: item.child_text("description"),
        })
        .collect())
}
