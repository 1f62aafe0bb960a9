//! Strategy 2: structured parse of the core fields only.
//!
//! A streaming `quick-xml` pass that reads `<item>` (RSS) and `<entry>`
//! (Atom) elements and keeps title, link, description/summary/content and the
//! publish date. Namespaced elements are ignored entirely and end-tag
//! mismatches are tolerated, which lets this succeed on feeds whose custom
//! namespaces trip up the extended parser.

use super::{FeedStrategy, fetch_feed_body, non_blank};
use crate::fetch::Fetcher;
use crate::models::RawFeedItem;
use crate::utils::truncate_for_log;
use futures::future::BoxFuture;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct BasicXmlStrategy {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl BasicXmlStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    async fn fetch_and_parse(&self, url: &str) -> Option<Vec<RawFeedItem>> {
        let body = fetch_feed_body(self.fetcher.as_ref(), url, self.timeout).await?;
        match parse_items(&body) {
            Ok(items) => Some(items),
            Err(e) => {
                debug!(
                    %url,
                    error = %e,
                    preview = %truncate_for_log(&body, 200),
                    "Basic XML parse failed"
                );
                None
            }
        }
    }
}

impl FeedStrategy for BasicXmlStrategy {
    fn name(&self) -> &'static str {
        "xml-basic"
    }

    fn items<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<Vec<RawFeedItem>>> {
        Box::pin(self.fetch_and_parse(url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    Content,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"content" => Some(Field::Content),
            b"pubDate" | b"published" | b"updated" => Some(Field::PubDate),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: String,
    link: String,
    description: String,
    summary: String,
    content: String,
    pub_date: String,
}

impl ItemBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::PubDate => &mut self.pub_date,
        };
        target.push_str(text);
    }

    /// Atom links live in attributes; prefer `rel="alternate"` or no `rel`.
    fn take_link_attr(&mut self, element: &BytesStart<'_>) {
        let mut href = None;
        let mut rel = None;
        for attr in element.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).replace("&amp;", "&");
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                _ => {}
            }
        }
        let is_alternate = rel.as_deref().is_none_or(|r| r == "alternate");
        if let Some(href) = href {
            if is_alternate && self.link.trim().is_empty() {
                self.link = href;
            }
        }
    }

    fn build(self) -> Option<RawFeedItem> {
        let item = RawFeedItem {
            title: non_blank(Some(self.title.as_str())),
            link: non_blank(Some(self.link.as_str())),
            description: non_blank(Some(self.description.as_str())),
            summary: non_blank(Some(self.summary.as_str())),
            content: non_blank(Some(self.content.as_str())),
            pub_date: non_blank(Some(self.pub_date.as_str())),
            ..Default::default()
        };
        (item.title.is_some() || item.link.is_some()).then_some(item)
    }
}

/// Parse `<item>`/`<entry>` elements from an RSS or Atom document.
pub fn parse_items(xml: &str) -> Result<Vec<RawFeedItem>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    // Text is not trimmed here: references split text into several events
    // and the whitespace around them is significant.
    reader.config_mut().check_end_names = false;

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    // Depth relative to the open item: 1 means a direct child.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if current.is_none() {
                    if matches!(name.as_ref(), b"item" | b"entry") {
                        current = Some(ItemBuilder::default());
                        depth = 0;
                    }
                    continue;
                }
                depth += 1;
                if depth == 1 {
                    field = Field::from_name(name.as_ref());
                    if field == Some(Field::Link) {
                        if let Some(builder) = current.as_mut() {
                            builder.take_link_attr(&e);
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if depth == 0 && e.name().as_ref() == b"link" {
                    if let Some(builder) = current.as_mut() {
                        builder.take_link_attr(&e);
                    }
                }
            }
            Event::End(e) => {
                if current.is_none() {
                    continue;
                }
                if depth == 0 {
                    if matches!(e.name().as_ref(), b"item" | b"entry") {
                        if let Some(item) = current.take().and_then(ItemBuilder::build) {
                            items.push(item);
                        }
                    }
                    continue;
                }
                depth -= 1;
                if depth == 0 {
                    field = None;
                }
            }
            Event::Text(e) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    builder.push(f, &String::from_utf8_lossy(&e));
                }
            }
            Event::CData(e) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    builder.push(f, &String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let (Some(builder), Some(f)) = (current.as_mut(), field) {
                    builder.push(f, &resolve_reference(&String::from_utf8_lossy(&e)));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Resolve `&name;` as it appears between text events.
///
/// Predefined and numeric references are decoded; anything else is passed
/// through so later HTML cleaning can deal with it.
fn resolve_reference(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return parsed.and_then(char::from_u32).map(String::from).unwrap_or_default();
    }
    resolve_predefined_entity(name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{name};"))
}
