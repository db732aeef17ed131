use crate::config::RenderBudget;
use crate::error::{Result, ScrapeError};
use crate::models::PropertyRecord;
use crate::scrapers::renderer;
use crate::scrapers::rules::{self, FieldRule, PageText};
use crate::scrapers::traits::BrowserSession;
use chrono::Local;
use scraper::{Html, Node, Selector};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

impl PageText {
    /// Flatten rendered markup into matchable text
    pub fn from_markup(markup: &str) -> Result<Self> {
        let document = Html::parse_document(markup);
        let h1 = Selector::parse("h1").map_err(|e| ScrapeError::Selector(e.to_string()))?;

        let headline = document.select(&h1).next().map(|element| {
            element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });

        let mut lines = Vec::new();
        for node in document.root_element().descendants() {
            let text = match node.value() {
                Node::Text(text) => text.trim(),
                _ => continue,
            };
            if text.is_empty() {
                continue;
            }
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .map(|element| SKIPPED_ELEMENTS.contains(&element.name()))
                .unwrap_or(false);
            if !hidden {
                lines.push(text);
            }
        }

        Ok(Self {
            headline,
            body: lines.join("\n"),
        })
    }
}

/// Builds property records from detail pages using a table of field rules
pub struct DetailExtractor {
    rules: Vec<FieldRule>,
}

impl DetailExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self::with_rules(rules::standard_rules()?))
    }

    pub fn with_rules(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Render `url` and extract a record. Fails only when the page cannot be rendered.
    pub fn extract<S: BrowserSession + ?Sized>(
        &self,
        session: &mut S,
        url: &str,
        budget: &RenderBudget,
    ) -> Result<PropertyRecord> {
        let markup = renderer::render(session, url, budget)?;
        Ok(self.extract_from_markup(url, &markup))
    }

    /// Apply every rule to already rendered markup.
    /// A rule that errors or panics leaves its field at the sentinel.
    pub fn extract_from_markup(&self, url: &str, markup: &str) -> PropertyRecord {
        let mut record = PropertyRecord::new(url, Local::now());

        let page = match PageText::from_markup(markup) {
            Ok(page) => page,
            Err(e) => {
                warn!("Could not flatten {}: {}", url, e);
                return record;
            }
        };

        for rule in &self.rules {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.matcher.evaluate(&page)));
            match outcome {
                Ok(Ok(Some(value))) => record.set(rule.field, value),
                Ok(Ok(None)) => debug!("{}: no match for {}", url, rule.field),
                Ok(Err(e)) => warn!("{}: rule for {} failed: {}", url, rule.field, e),
                Err(_) => warn!("{}: rule for {} panicked", url, rule.field),
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, SENTINEL};
    use crate::scrapers::rules::Matcher;
    use crate::scrapers::testing::ScriptedSession;
    use std::time::Duration;

    const DETAIL_PAGE: &str = r#"
        <html>
        <head><title>99acres</title><style>.price { color: red }</style></head>
        <body>
            <h1>3 BHK Apartment for rent in <b>Paschim Vihar</b></h1>
            <div class="price">₹ 32,000 /month</div>
            <div>Security Deposit: ₹ 64,000</div>
            <ul>
                <li>3 Bedrooms</li>
                <li>2 Bathrooms</li>
                <li>1 Balcony</li>
            </ul>
            <div>Carpet Area</div><div>1,150 sq.ft</div>
            <div>Semi-Furnished</div>
            <div>Furnished with wardrobes</div>
            <div>Block A-4, Paschim Vihar</div>
            <div>Posted on 12 Mar, by Dealer</div>
            <div>Available For: Family</div>
            <script>var price = "₹ 1 /month";</script>
        </body>
        </html>
    "#;

    fn instant() -> RenderBudget {
        RenderBudget {
            post_load_wait: Duration::ZERO,
            scroll_passes: 1,
            scroll_step: 400,
            scroll_pause: Duration::ZERO,
        }
    }

    #[test]
    fn test_page_text_skips_scripts_and_styles() {
        let page = PageText::from_markup(DETAIL_PAGE).unwrap();

        assert_eq!(
            page.headline.as_deref(),
            Some("3 BHK Apartment for rent in Paschim Vihar")
        );
        assert!(page.body.contains("₹ 32,000 /month"));
        assert!(!page.body.contains("var price"));
        assert!(!page.body.contains("color: red"));
    }

    #[test]
    fn test_extracts_detail_page() {
        let extractor = DetailExtractor::new().unwrap();
        let record = extractor.extract_from_markup("https://example.com/3-bhk-spid-1", DETAIL_PAGE);

        assert_eq!(record.get(Field::Title), "3 BHK Apartment for rent in Paschim Vihar");
        assert_eq!(record.get(Field::Url), "https://example.com/3-bhk-spid-1");
        assert_eq!(record.get(Field::Price), "₹ 32,000 /month");
        assert_eq!(record.get(Field::Deposit), "₹ 64,000");
        assert_eq!(record.get(Field::Bedrooms), "3");
        assert_eq!(record.get(Field::Bathrooms), "2");
        assert_eq!(record.get(Field::Balconies), "1");
        assert_eq!(record.get(Field::CarpetArea), "1,150 sq.ft");
        assert_eq!(record.get(Field::Furnishing), "Semi-Furnished");
        assert_eq!(record.get(Field::PostedBy), "Dealer");
        assert_eq!(record.get(Field::PostedDate), "12 Mar, by Dealer");
        assert_eq!(record.get(Field::AvailableFor), "Family");
        assert_eq!(record.get(Field::PropertyType), "Apartment/Flat");
        assert_eq!(record.get(Field::RoomType), SENTINEL);
        assert_eq!(record.get(Field::NearbyPlaces), SENTINEL);
    }

    #[test]
    fn test_every_field_present_on_non_property_page() {
        let extractor = DetailExtractor::new().unwrap();
        let record = extractor.extract_from_markup(
            "https://example.com/about-us",
            "<html><body><p>About us</p></body></html>",
        );

        for field in Field::ALL {
            let value = record.get(field);
            assert!(!value.is_empty(), "{} is empty", field);
            if field != Field::Url {
                assert_eq!(value, SENTINEL, "{} should be the sentinel", field);
            }
        }
    }

    #[test]
    fn test_missing_price_does_not_affect_other_fields() {
        let extractor = DetailExtractor::new().unwrap();
        let markup = DETAIL_PAGE
            .replace("₹ 32,000 /month", "Price on request")
            .replace("Security Deposit: ₹ 64,000", "")
            .replace(r#"var price = "₹ 1 /month";"#, "");

        let record = extractor.extract_from_markup("u", &markup);

        assert_eq!(record.get(Field::Price), SENTINEL);
        assert_eq!(record.get(Field::Bedrooms), "3");
        assert_eq!(record.get(Field::Furnishing), "Semi-Furnished");
        assert_eq!(record.get(Field::CarpetArea), "1,150 sq.ft");
    }

    #[test]
    fn test_failing_and_panicking_rules_are_isolated() {
        let extractor = DetailExtractor::with_rules(vec![
            FieldRule::new(
                Field::Price,
                Matcher::custom(|_| Err(ScrapeError::Rule("broken matcher".into()))),
            ),
            FieldRule::new(Field::Deposit, Matcher::custom(|_| panic!("matcher bug"))),
            FieldRule::new(Field::Title, Matcher::Headline),
            FieldRule::new(
                Field::Bedrooms,
                Matcher::pattern(r"(?i)(\d+)\s*Bedroom", 1).unwrap(),
            ),
        ]);

        let record = extractor.extract_from_markup("u", DETAIL_PAGE);

        assert_eq!(record.get(Field::Price), SENTINEL);
        assert_eq!(record.get(Field::Deposit), SENTINEL);
        assert_eq!(record.get(Field::Title), "3 BHK Apartment for rent in Paschim Vihar");
        assert_eq!(record.get(Field::Bedrooms), "3");
    }

    #[test]
    fn test_extract_renders_with_detail_budget() {
        let extractor = DetailExtractor::new().unwrap();
        let mut session = ScriptedSession::new().page("https://example.com/p-spid-1", DETAIL_PAGE);

        let record = extractor
            .extract(&mut session, "https://example.com/p-spid-1", &instant())
            .unwrap();

        assert_eq!(record.get(Field::Bedrooms), "3");
        assert_eq!(session.scrolls.len(), 1);
    }

    #[test]
    fn test_extract_fails_when_page_unreachable() {
        let extractor = DetailExtractor::new().unwrap();
        let mut session = ScriptedSession::new();

        let result = extractor.extract(&mut session, "https://example.com/gone-spid-1", &instant());
        assert!(matches!(result, Err(ScrapeError::Navigation { .. })));
    }
}
