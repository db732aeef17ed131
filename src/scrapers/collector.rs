use crate::error::{Result, ScrapeError};
use crate::scrapers::types::UrlSet;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Words that appear in the slug of a property detail link
pub const PROPERTY_KEYWORDS: [&str; 5] = ["bhk", "bedroom", "independent", "flat", "apartment"];

/// Token carried by every detail link, followed by the listing identifier
pub const ID_MARKER: &str = "spid-";

/// Path segment of search result pages
pub const LISTING_SEGMENT: &str = "/search/";

/// Picks property detail links out of a rendered listing page.
///
/// The rule is a heuristic: a link qualifies when it names a property type,
/// carries the identifier marker, and does not point back into search results.
/// Both misses and false hits are possible; the extractor tolerates the latter.
pub struct UrlCollector {
    anchors: Selector,
    keywords: Vec<String>,
    marker: String,
    excluded_segment: String,
}

impl UrlCollector {
    pub fn new() -> Result<Self> {
        Self::with_rules(&PROPERTY_KEYWORDS, ID_MARKER, LISTING_SEGMENT)
    }

    pub fn with_rules(keywords: &[&str], marker: &str, excluded_segment: &str) -> Result<Self> {
        let anchors = Selector::parse("a[href]").map_err(|e| ScrapeError::Selector(e.to_string()))?;

        Ok(Self {
            anchors,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            marker: marker.to_lowercase(),
            excluded_segment: excluded_segment.to_string(),
        })
    }

    /// Does a raw href look like a property detail link?
    pub fn is_property_href(&self, href: &str) -> bool {
        let lower = href.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str())) && lower.contains(&self.marker)
    }

    /// Collect every qualifying link in `markup`, resolved against `base`
    pub fn collect(&self, markup: &str, base: &Url) -> UrlSet {
        let document = Html::parse_document(markup);
        let mut urls = UrlSet::new();
        let mut total = 0usize;

        for anchor in document.select(&self.anchors) {
            total += 1;
            let href = match anchor.value().attr("href") {
                Some(href) => href.trim(),
                None => continue,
            };
            if href.is_empty() || !self.is_property_href(href) {
                continue;
            }

            let resolved = match base.join(href) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping unresolvable href {}: {}", href, e);
                    continue;
                }
            };
            if resolved.path().contains(&self.excluded_segment) {
                continue;
            }

            urls.insert(resolved.to_string());
        }

        debug!("{} of {} links look like property pages", urls.len(), total);
        urls
    }
}
