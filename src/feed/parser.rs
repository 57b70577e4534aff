use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

const CONTENT_NS: &[u8] = b"http://purl.org/rss/1.0/modules/content/";
const MEDIA_NS: &[u8] = b"http://search.yahoo.com/mrss/";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";
const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

/// Depth of `<channel>` under the document root.
const CHANNEL_DEPTH: usize = 2;
/// Depth of `<item>` elements.
const ITEM_DEPTH: usize = 3;
/// Depth of the fields read from an item.
const FIELD_DEPTH: usize = 4;

/// Errors that make a feed document unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML is not well-formed (mismatched tags, bad escapes, bad encoding).
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The input contained no element at all.
    #[error("document has no root element")]
    NoRootElement,
    /// Input ended while elements were still open.
    #[error("unexpected end of document: {0} element(s) left unclosed")]
    UnclosedElements(usize),
}

/// Fields of one `<item>`, exactly as found in the document.
///
/// Everything is optional; the extractor decides on defaults. Empty
/// elements are recorded as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub dc_date: Option<String>,
    pub atom_updated: Option<String>,
    pub description: Option<String>,
    pub content_encoded: Option<String>,
    /// Outer `Some` when a `<media:content>` element was present; the
    /// inner value is its `url` attribute.
    pub media_url: Option<Option<String>>,
}

/// Items collected from a feed plus the count of items past the limit.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub items: Vec<RawItem>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
    ContentEncoded,
    DcDate,
    AtomUpdated,
}

impl Field {
    fn slot(self, item: &mut RawItem) -> &mut Option<String> {
        match self {
            Field::Title => &mut item.title,
            Field::Link => &mut item.link,
            Field::PubDate => &mut item.pub_date,
            Field::Description => &mut item.description,
            Field::ContentEncoded => &mut item.content_encoded,
            Field::DcDate => &mut item.dc_date,
            Field::AtomUpdated => &mut item.atom_updated,
        }
    }
}

/// What an element means to us, resolved by namespace URI rather than
/// prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Channel,
    Item,
    Text(Field),
    Media,
    Other,
}

fn classify(resolved: &ResolveResult<'_>, local: &[u8]) -> Element {
    match resolved {
        ResolveResult::Unbound => match local {
            b"channel" => Element::Channel,
            b"item" => Element::Item,
            b"title" => Element::Text(Field::Title),
            b"link" => Element::Text(Field::Link),
            b"pubDate" => Element::Text(Field::PubDate),
            b"description" => Element::Text(Field::Description),
            _ => Element::Other,
        },
        ResolveResult::Bound(Namespace(ns)) => match (*ns, local) {
            (CONTENT_NS, b"encoded") => Element::Text(Field::ContentEncoded),
            (DC_NS, b"date") => Element::Text(Field::DcDate),
            (ATOM_NS, b"updated") => Element::Text(Field::AtomUpdated),
            (MEDIA_NS, b"content") => Element::Media,
            _ => Element::Other,
        },
        _ => Element::Other,
    }
}

/// Parses an RSS document and returns the first `max_items` items of its
/// channel, in document order.
///
/// Only the first `<channel>` directly under the root is read, and only its
/// direct `<item>` children. A document without a channel is valid and
/// yields no items. Items past the limit are counted in
/// [`ParseResult::skipped`] but not decoded; the rest of the document is
/// still read so a malformed tail is reported.
///
/// # Errors
///
/// Returns [`ParseError`] if the bytes are not a single well-formed XML
/// element tree. Elements or non-whitespace text after the root element
/// closes are rejected.
pub fn parse_feed(bytes: &[u8], max_items: usize) -> Result<ParseResult, ParseError> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut result = ParseResult::default();
    let mut depth: usize = 0;
    let mut root_seen = false;
    let mut root_closed = false;
    let mut channel_seen = false;
    let mut in_channel = false;
    let mut current: Option<RawItem> = None;
    let mut capturing: Option<Field> = None;
    let mut text = String::new();

    loop {
        let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(pair) => pair,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        };

        let element = match &event {
            Event::Start(e) | Event::Empty(e) => classify(&resolved, e.local_name().as_ref()),
            _ => Element::Other,
        };

        match event {
            Event::Start(e) => {
                if root_closed {
                    return Err(trailing_content("element"));
                }
                depth += 1;

                if depth == 1 {
                    root_seen = true;
                } else if depth == CHANNEL_DEPTH && !channel_seen {
                    if element == Element::Channel {
                        channel_seen = true;
                        in_channel = true;
                    }
                } else if depth == ITEM_DEPTH && in_channel {
                    if element == Element::Item {
                        if result.items.len() < max_items {
                            current = Some(RawItem::default());
                        } else {
                            result.skipped += 1;
                        }
                    }
                } else if depth == FIELD_DEPTH {
                    if let Some(item) = current.as_mut() {
                        match element {
                            Element::Text(field) => {
                                capturing = Some(field);
                                text.clear();
                            }
                            Element::Media => record_media(item, &e, &reader)?,
                            _ => {}
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if root_closed {
                    return Err(trailing_content("element"));
                }
                if depth == 0 {
                    root_seen = true;
                    root_closed = true;
                } else if depth + 1 == ITEM_DEPTH && in_channel {
                    if element == Element::Item {
                        if result.items.len() < max_items {
                            result.items.push(RawItem::default());
                        } else {
                            result.skipped += 1;
                        }
                    }
                } else if depth + 1 == FIELD_DEPTH && element == Element::Media {
                    if let Some(item) = current.as_mut() {
                        record_media(item, &e, &reader)?;
                    }
                }
            }
            Event::Text(e) => {
                if root_closed && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(trailing_content("text"));
                }
                if capturing.is_some() && depth == FIELD_DEPTH {
                    let unescaped = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if root_closed {
                    return Err(trailing_content("CDATA"));
                }
                if capturing.is_some() && depth == FIELD_DEPTH {
                    let decoded = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|e| ParseError::Xml(e.to_string()))?;
                    text.push_str(&decoded);
                }
            }
            Event::End(_) => {
                if depth == FIELD_DEPTH {
                    if let (Some(field), Some(item)) = (capturing.take(), current.as_mut()) {
                        let slot = field.slot(item);
                        if slot.is_none() && !text.is_empty() {
                            *slot = Some(std::mem::take(&mut text));
                        }
                    }
                } else if depth == ITEM_DEPTH {
                    if let Some(item) = current.take() {
                        result.items.push(item);
                    }
                } else if depth == CHANNEL_DEPTH {
                    in_channel = false;
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    root_closed = true;
                }
            }
            Event::Eof => {
                if depth > 0 {
                    return Err(ParseError::UnclosedElements(depth));
                }
                if !root_seen {
                    return Err(ParseError::NoRootElement);
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if !channel_seen {
        tracing::warn!("Feed has no <channel> element under its root");
    }

    Ok(result)
}

fn trailing_content(kind: &str) -> ParseError {
    ParseError::Xml(format!("unexpected {kind} after the root element"))
}

/// Records the `url` of the first `<media:content>` in an item.
fn record_media(
    item: &mut RawItem,
    e: &BytesStart<'_>,
    reader: &NsReader<&[u8]>,
) -> Result<(), ParseError> {
    if item.media_url.is_some() {
        return Ok(());
    }

    let mut url = None;
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed media:content attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() == b"url" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| ParseError::Xml(e.to_string()))?;
            url = Some(value.into_owned());
            break;
        }
    }

    item.media_url = Some(url);
    Ok(())
}
