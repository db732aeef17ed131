use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};
use crate::scrapers::traits::BrowserSession;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chrome keeps the process alive this long between commands; pacing sleeps must fit inside it
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Browser session backed by headless Chrome
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch Chrome with automation markers suppressed
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        info!(
            "Launching Chrome (headless: {}, window: {}x{})...",
            config.headless, config.window_size.0, config.window_size.1
        );

        let user_agent = format!("--user-agent={}", config.user_agent);
        let args: Vec<&OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--disable-gpu"),
            OsStr::new(user_agent.as_str()),
        ];

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(args)
            .build()
            .map_err(|e| ScrapeError::Launch(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Launch(format!("could not open tab: {}", e)))?;
        tab.set_default_timeout(config.page_load_timeout);

        info!("Chrome ready");
        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    fn evaluate(&self, expression: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        Ok(result.value)
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn scroll_by(&mut self, pixels: u32) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {});", pixels))?;
        Ok(())
    }

    fn markup(&mut self) -> Result<String> {
        match self.evaluate("document.documentElement.outerHTML")? {
            Some(serde_json::Value::String(html)) => Ok(html),
            Some(other) => Err(ScrapeError::Browser(format!(
                "unexpected markup value: {}",
                other
            ))),
            None => Err(ScrapeError::Browser("page returned no markup".into())),
        }
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    fn close(&mut self) {
        if let Err(e) = self.tab.close(false) {
            warn!("Could not close tab cleanly: {}", e);
        }
        // Dropping the handle terminates the Chrome process
        if self.browser.take().is_some() {
            info!("Browser closed");
        }
    }
}
