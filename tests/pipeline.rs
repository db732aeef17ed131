use listing_scout::config::{PacingRange, RenderBudget, ScrapeConfig};
use listing_scout::scrapers::BrowserSession;
use listing_scout::{Field, Interrupt, Orchestrator, RunOutcome, ScrapeError, SENTINEL};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;

const SEARCH: &str = "https://example.com/search/property/rent/delhi?city=1075722";

/// Serves fixed markup per URL; anything else times out
struct FixtureBrowser {
    pages: HashMap<String, String>,
    current: Option<String>,
}

impl FixtureBrowser {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            current: None,
        }
    }
}

impl BrowserSession for FixtureBrowser {
    fn navigate(&mut self, url: &str) -> listing_scout::Result<()> {
        if self.pages.contains_key(url) {
            self.current = Some(url.to_string());
            Ok(())
        } else {
            Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "timeout".to_string(),
            })
        }
    }

    fn scroll_by(&mut self, _pixels: u32) -> listing_scout::Result<()> {
        Ok(())
    }

    fn markup(&mut self) -> listing_scout::Result<String> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .ok_or_else(|| ScrapeError::Browser("blank tab".to_string()))
    }

    fn screenshot(&mut self) -> listing_scout::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn config(output: &std::path::Path) -> ScrapeConfig {
    let instant = RenderBudget {
        post_load_wait: Duration::ZERO,
        scroll_passes: 2,
        scroll_step: 400,
        scroll_pause: Duration::ZERO,
    };
    let mut config = ScrapeConfig::new(SEARCH).unwrap();
    config.pages = 1;
    config.listing = instant;
    config.detail = instant;
    config.page_pacing = PacingRange::fixed(Duration::ZERO);
    config.property_pacing = PacingRange::fixed(Duration::ZERO);
    config.retry_delay = Duration::ZERO;
    config.output.dir = output.to_path_buf();
    config.output.debug_dir = None;
    config.output.json = true;
    config
}

const LISTING: &str = r#"
<html><body>
  <a href="/3-bhk-apartment-for-rent-r2-spid-W1">3 BHK</a>
  <a href="/search/property/rent/delhi">More results</a>
  <a href="/about-us">About</a>
  <a href="/independent-house-for-sale-r1-spid-A2">House</a>
  <a href="/independent-house-for-sale-r1-spid-A2">House (again)</a>
</body></html>
"#;

const APARTMENT: &str = r#"
<html><body>
  <h1>3 BHK Apartment for rent in Paschim Vihar</h1>
  <span>₹ 45,000 /month</span>
  <span>1,450 sq.ft</span>
  <span>Semi-Furnished</span>
</body></html>
"#;

#[test]
fn test_run_exports_reachable_properties() {
    let dir = tempdir().unwrap();
    // the house page is listed but never loads
    let browser = FixtureBrowser::new(&[
        (SEARCH, LISTING),
        ("https://example.com/3-bhk-apartment-for-rent-r2-spid-W1", APARTMENT),
    ]);

    let summary = Orchestrator::new(browser, config(dir.path()), Interrupt::new())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.stats.urls_collected, 2);
    assert_eq!(summary.stats.properties_failed, 1);
    assert_eq!(summary.records, 1);

    let mut reader = csv::Reader::from_path(&summary.export_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);

    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(&rows[0][column("Property_Title")], "3 BHK Apartment for rent in Paschim Vihar");
    assert_eq!(&rows[0][column("Price")], "₹ 45,000 /month");
    assert_eq!(&rows[0][column("Carpet_Area")], "1,450 sq.ft");
    assert_eq!(&rows[0][column("Furnishing")], "Semi-Furnished");
    assert_eq!(&rows[0][column("Deposit")], SENTINEL);

    let json_path = summary.json_path.expect("json copy requested");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json[0]["fields"][Field::Bedrooms.column()], "3");
}

#[test]
fn test_unreachable_search_page_still_exports() {
    let dir = tempdir().unwrap();
    let browser = FixtureBrowser::new(&[]);

    let summary = Orchestrator::new(browser, config(dir.path()), Interrupt::new())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.stats.pages_failed, 1);
    assert_eq!(summary.records, 0);
    assert!(summary.export_path.exists());
}

#[test]
fn test_interrupt_before_start_exports_empty_dataset() {
    let dir = tempdir().unwrap();
    let interrupt = Interrupt::new();
    interrupt.raise();

    let browser = FixtureBrowser::new(&[(SEARCH, LISTING)]);

    let summary = Orchestrator::new(browser, config(dir.path()), interrupt)
        .unwrap()
        .run()
        .unwrap();

    assert!(matches!(summary.outcome, RunOutcome::Interrupted { .. }));
    assert_eq!(summary.records, 0);
    assert!(summary.export_path.exists());
}
