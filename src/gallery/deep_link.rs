//! Shareable links of the form `#category=<id>&index=<n>`.
//!
//! A link names an image by its category and its position inside that
//! category, which survives reordering of other categories. Parsing follows
//! `application/x-www-form-urlencoded` rules: `+` is a space, percent escapes
//! are decoded (malformed ones stay literal) and the first occurrence of a key
//! wins.

use std::time::Duration;

use super::index::ImageIndex;
use super::render::RenderedGallery;
use crate::models::RenderedImageRecord;

const CATEGORY_KEY: &str = "category";
const INDEX_KEY: &str = "index";
/// Characters `encodeURIComponent` leaves untouched besides the RFC 3986
/// unreserved set.
const KEPT_SUB_DELIMS: &str = "!*'()";

/// What a link activates: the section to scroll to and, when the category
/// holds images of its own, the image to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub section: String,
    pub image: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub category: String,
    pub index: usize,
}

impl DeepLink {
    pub fn new(category: impl Into<String>, index: usize) -> Self {
        Self {
            category: category.into(),
            index,
        }
    }

    pub fn for_record(record: &RenderedImageRecord) -> Self {
        Self::new(record.category_id.clone(), record.index_in_category)
    }

    /// Fragment without the leading `#`.
    pub fn to_fragment(&self) -> String {
        let category = glib::Uri::escape_string(&self.category, Some(KEPT_SUB_DELIMS), false);
        format!("{CATEGORY_KEY}={category}&{INDEX_KEY}={}", self.index)
    }

    pub fn to_hash(&self) -> String {
        format!("#{}", self.to_fragment())
    }

    /// Parses a full URL, a `#hash` or a bare fragment.
    ///
    /// A missing or empty `index` means 0, a negative one means 0 as well.
    /// A missing category or a non-numeric index make the link invalid.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let fragment = match input.split_once('#') {
            Some((_, fragment)) => fragment,
            None if input.contains("://") => return None,
            None => input,
        };

        let mut category: Option<String> = None;
        let mut raw_index: Option<String> = None;
        for pair in fragment.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match form_decode(key).as_str() {
                CATEGORY_KEY if category.is_none() => category = Some(form_decode(value)),
                INDEX_KEY if raw_index.is_none() => raw_index = Some(form_decode(value)),
                _ => {}
            }
        }

        let category = category.filter(|category| !category.is_empty())?;
        let index = match raw_index.as_deref() {
            None | Some("") => 0,
            Some(raw) => parse_int_prefix(raw)?,
        };
        Some(Self { category, index })
    }

    /// Global index of the linked image, see [`ImageIndex::global_index_of`].
    pub fn resolve(&self, index: &ImageIndex) -> Option<usize> {
        index.global_index_of(&self.category, self.index)
    }

    /// Section and image the link points at. `None` only when no section
    /// carries the category id.
    pub fn target(&self, gallery: &RenderedGallery) -> Option<LinkTarget> {
        let section = gallery.section(&self.category)?;
        Some(LinkTarget {
            section: section.id.clone(),
            image: self.resolve(&gallery.index),
        })
    }
}

fn form_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match glib::Uri::unescape_string(&spaced, None) {
        Some(decoded) => decoded.to_string(),
        None => lenient_percent_decode(&spaced),
    }
}

/// Decodes well-formed `%XX` escapes and keeps malformed ones as written.
/// Invalid UTF-8 becomes U+FFFD.
fn lenient_percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

/// Leading-integer parse in the manner of `parseInt(value, 10)`.
fn parse_int_prefix(raw: &str) -> Option<usize> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(rest[..digits_len].parse::<usize>().unwrap_or(usize::MAX))
}

/// Full shareable URL for a link, replacing any fragment already on `base`.
pub fn share_url(base: &str, link: &DeepLink) -> String {
    let bare = base.split('#').next().unwrap_or(base);
    format!("{bare}#{}", link.to_fragment())
}

/// The page address and its fragment.
///
/// Fragment changes replace the current entry; there is no history stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    page_url: String,
    hash: Option<String>,
}

impl PageLocation {
    pub fn new(page_url: &str) -> Self {
        let bare = page_url.split('#').next().unwrap_or(page_url);
        Self {
            page_url: bare.to_string(),
            hash: None,
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn replace_hash(&mut self, hash: &str) {
        let hash = hash.trim_start_matches('#');
        self.hash = (!hash.is_empty()).then(|| format!("#{hash}"));
    }

    pub fn clear_hash(&mut self) {
        self.hash = None;
    }

    pub fn href(&self) -> String {
        match &self.hash {
            Some(hash) => format!("{}{hash}", self.page_url),
            None => self.page_url.clone(),
        }
    }
}

/// Wait before scrolling to a deep-linked image so layout can settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub narrow_viewport_px: i32,
    pub delay: Duration,
    pub narrow_delay: Duration,
}

impl SettlePolicy {
    pub fn delay_for(&self, viewport_width: i32) -> Duration {
        if viewport_width <= self.narrow_viewport_px {
            self.narrow_delay
        } else {
            self.delay
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            narrow_viewport_px: 600,
            delay: Duration::from_millis(100),
            narrow_delay: Duration::from_millis(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::render::render_gallery;
    use crate::models::{Category, ImageEntry, Manifest};

    fn two_image_gallery() -> ImageIndex {
        let mut manifest = Manifest {
            categories: vec![Category {
                id: "fanart".into(),
                title: "Fan Art".into(),
                images: vec![
                    ImageEntry {
                        file: "b.png".into(),
                        title: None,
                    },
                    ImageEntry {
                        file: "a.png".into(),
                        title: None,
                    },
                ],
                subcategories: vec![],
            }],
        };
        render_gallery(&mut manifest).index
    }

    #[test]
    fn test_hash_format() {
        assert_eq!(
            DeepLink::new("fanart", 3).to_hash(),
            "#category=fanart&index=3"
        );
    }

    #[test]
    fn test_nested_category_is_escaped_and_decoded() {
        let link = DeepLink::new("sketches::ink drawings", 1);
        let hash = link.to_hash();
        assert!(!hash.contains("::"));
        assert!(!hash.contains(' '));
        assert_eq!(DeepLink::parse(&hash), Some(link));
    }

    #[test]
    fn test_parse_accepts_urls_hashes_and_fragments() {
        let expected = Some(DeepLink::new("fanart", 2));
        assert_eq!(
            DeepLink::parse("file:///srv/gallery/index.html#category=fanart&index=2"),
            expected
        );
        assert_eq!(DeepLink::parse("#category=fanart&index=2"), expected);
        assert_eq!(DeepLink::parse("index=2&category=fanart"), expected);
        assert_eq!(DeepLink::parse("https://example.org/gallery/"), None);
    }

    #[test]
    fn test_parse_form_rules() {
        assert_eq!(
            DeepLink::parse("#category=fan+art&index=1"),
            Some(DeepLink::new("fan art", 1))
        );
        assert_eq!(
            DeepLink::parse("#category=fanart&category=other&index=1&index=9"),
            Some(DeepLink::new("fanart", 1))
        );
        assert_eq!(
            DeepLink::parse("#category=fanart"),
            Some(DeepLink::new("fanart", 0))
        );
        assert_eq!(
            DeepLink::parse("#category=fanart&index=4px"),
            Some(DeepLink::new("fanart", 4))
        );
        assert_eq!(
            DeepLink::parse("#category=fanart&index=-2"),
            Some(DeepLink::new("fanart", 0))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(DeepLink::parse(""), None);
        assert_eq!(DeepLink::parse("#"), None);
        assert_eq!(DeepLink::parse("#index=2"), None);
        assert_eq!(DeepLink::parse("#category=&index=2"), None);
        assert_eq!(DeepLink::parse("#category=fanart&index=abc"), None);
    }

    #[test]
    fn test_bad_percent_escape_kept_literally() {
        assert_eq!(
            DeepLink::parse("#category=fan%zzart&index=1"),
            Some(DeepLink::new("fan%zzart", 1))
        );
        assert_eq!(
            DeepLink::parse("#category=fan%20art%&index=2"),
            Some(DeepLink::new("fan art%", 2))
        );
        assert_eq!(
            DeepLink::parse("#category=fanart&index=1%zz"),
            Some(DeepLink::new("fanart", 1))
        );
    }

    #[test]
    fn test_target_of_category_without_own_images() {
        let mut manifest = Manifest {
            categories: vec![Category {
                id: "sketches".into(),
                title: "Sketches".into(),
                images: vec![],
                subcategories: vec![Category {
                    id: "sketches::ink".into(),
                    title: "Ink".into(),
                    images: vec![
                        ImageEntry {
                            file: "a.png".into(),
                            title: None,
                        },
                        ImageEntry {
                            file: "b.png".into(),
                            title: None,
                        },
                    ],
                    subcategories: vec![],
                }],
            }],
        };
        let gallery = render_gallery(&mut manifest);

        let parent = DeepLink::parse("#category=sketches&index=0").unwrap();
        assert_eq!(
            parent.target(&gallery),
            Some(LinkTarget {
                section: "sketches".into(),
                image: None,
            })
        );

        let child = DeepLink::new("sketches::ink", 1);
        assert_eq!(child.target(&gallery).unwrap().image, Some(1));
        assert_eq!(DeepLink::new("missing", 0).target(&gallery), None);
    }

    #[test]
    fn test_out_of_range_link_falls_back_to_first_image() {
        let index = two_image_gallery();
        let link = DeepLink::parse("#category=fanart&index=5").unwrap();
        assert_eq!(link.resolve(&index), Some(0));
        assert_eq!(DeepLink::new("unknown", 0).resolve(&index), None);
    }

    #[test]
    fn test_record_link_round_trip() {
        let index = two_image_gallery();
        for record in index.records() {
            let hash = DeepLink::for_record(record).to_hash();
            let parsed = DeepLink::parse(&hash).unwrap();
            assert_eq!(parsed.resolve(&index), Some(record.global_index));
        }
    }

    #[test]
    fn test_share_url_replaces_fragment() {
        let link = DeepLink::new("fanart", 1);
        assert_eq!(
            share_url("https://example.org/gallery/#category=old&index=0", &link),
            "https://example.org/gallery/#category=fanart&index=1"
        );
    }

    #[test]
    fn test_page_location() {
        let mut location = PageLocation::new("file:///srv/gallery/index.html#stale");
        assert_eq!(location.href(), "file:///srv/gallery/index.html");

        location.replace_hash("#category=fanart&index=1");
        assert_eq!(location.hash(), Some("#category=fanart&index=1"));
        assert_eq!(
            location.href(),
            "file:///srv/gallery/index.html#category=fanart&index=1"
        );

        location.clear_hash();
        assert_eq!(location.hash(), None);
        assert_eq!(location.href(), location.page_url());
    }

    #[test]
    fn test_settle_delay() {
        let policy = SettlePolicy::default();
        assert_eq!(policy.delay_for(600), Duration::from_millis(300));
        assert_eq!(policy.delay_for(1280), Duration::from_millis(100));
    }
}
