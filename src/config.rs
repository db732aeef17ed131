use crate::error::{Result, ScrapeError};
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SEARCH_URL: &str = "https://www.99acres.com/search/property/rent/delhi?city=1075722&preference=R&area_unit=1&res_com=R&isPreLeased=N";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Search results URL; page 1 is loaded verbatim, later pages add `page=<n>`
    #[arg(long, default_value = DEFAULT_SEARCH_URL)]
    pub search_url: String,

    /// Number of listing pages to visit (-p, --pages)
    #[arg(short = 'p', long, default_value_t = 2)]
    pub pages: u32,

    /// First listing page to visit (-s, --start-page)
    #[arg(short = 's', long, default_value_t = 1)]
    pub start_page: u32,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub visible: bool,

    /// Seconds a page may take to load before navigation fails
    #[arg(long, default_value_t = 60)]
    pub page_load_timeout: u64,

    /// Seconds to wait after a listing page loads
    #[arg(long, default_value_t = 6.0)]
    pub listing_wait: f64,

    /// Scroll passes on listing pages
    #[arg(long, default_value_t = 10)]
    pub listing_scrolls: u32,

    /// Seconds to wait after a property page loads
    #[arg(long, default_value_t = 3.0)]
    pub detail_wait: f64,

    /// Scroll passes on property pages
    #[arg(long, default_value_t = 5)]
    pub detail_scrolls: u32,

    /// Pixels per scroll pass
    #[arg(long, default_value_t = 400)]
    pub scroll_step: u32,

    /// Seconds to pause after each scroll pass
    #[arg(long, default_value_t = 0.5)]
    pub scroll_pause: f64,

    /// Minimum seconds between listing pages
    #[arg(long, default_value_t = 2.0)]
    pub page_delay_min: f64,

    /// Maximum seconds between listing pages
    #[arg(long, default_value_t = 4.0)]
    pub page_delay_max: f64,

    /// Minimum seconds between property pages
    #[arg(long, default_value_t = 1.0)]
    pub property_delay_min: f64,

    /// Maximum seconds between property pages
    #[arg(long, default_value_t = 2.0)]
    pub property_delay_max: f64,

    /// Attempts per listing page before giving up on it
    #[arg(long, default_value_t = 2)]
    pub listing_attempts: u32,

    /// Seconds to wait before retrying a listing page
    #[arg(long, default_value_t = 10.0)]
    pub retry_delay: f64,

    /// Consecutive failures that halt the run (0 never halts)
    #[arg(long, default_value_t = 5)]
    pub max_consecutive_failures: u32,

    /// Browser user agent
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Browser window width
    #[arg(long, default_value_t = 1920)]
    pub window_width: u32,

    /// Browser window height
    #[arg(long, default_value_t = 1080)]
    pub window_height: u32,

    /// Directory for the dataset export (-o, --output-dir)
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write a JSON copy of the dataset
    #[arg(long)]
    pub json: bool,

    /// Directory for rendered listing markup and screenshots
    #[arg(long, default_value = "debug")]
    pub debug_dir: PathBuf,

    /// Do not write debug artifacts
    #[arg(long)]
    pub no_debug: bool,

    /// Directory for the run log file
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,
}

/// Settings for acquiring the browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub page_load_timeout: Duration,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_size: (1920, 1080),
        }
    }
}

/// Wait and scroll budget for rendering one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBudget {
    pub post_load_wait: Duration,
    pub scroll_passes: u32,
    pub scroll_step: u32,
    pub scroll_pause: Duration,
}

impl RenderBudget {
    pub fn listing() -> Self {
        Self {
            post_load_wait: Duration::from_secs(6),
            scroll_passes: 10,
            scroll_step: 400,
            scroll_pause: Duration::from_millis(500),
        }
    }

    pub fn detail() -> Self {
        Self {
            post_load_wait: Duration::from_secs(3),
            scroll_passes: 5,
            scroll_step: 400,
            scroll_pause: Duration::from_millis(500),
        }
    }
}

/// Randomized wait between sequential requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingRange {
    pub min: Duration,
    pub max: Duration,
}

impl PacingRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(ScrapeError::Config(format!(
                "pacing minimum {:?} exceeds maximum {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn fixed(duration: Duration) -> Self {
        Self {
            min: duration,
            max: duration,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub json: bool,
    pub debug_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            json: false,
            debug_dir: Some(PathBuf::from("debug")),
        }
    }
}

/// Validated settings for one scrape run
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: Url,
    pub start_page: u32,
    pub pages: u32,
    pub listing: RenderBudget,
    pub detail: RenderBudget,
    pub page_pacing: PacingRange,
    pub property_pacing: PacingRange,
    pub listing_attempts: u32,
    pub retry_delay: Duration,
    pub max_consecutive_failures: u32,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

impl ScrapeConfig {
    pub fn new(search_url: &str) -> Result<Self> {
        Ok(Self {
            search_url: Url::parse(search_url)?,
            start_page: 1,
            pages: 2,
            listing: RenderBudget::listing(),
            detail: RenderBudget::detail(),
            page_pacing: PacingRange::new(Duration::from_secs(2), Duration::from_secs(4))?,
            property_pacing: PacingRange::new(Duration::from_secs(1), Duration::from_secs(2))?,
            listing_attempts: 2,
            retry_delay: Duration::from_secs(10),
            max_consecutive_failures: 5,
            browser: BrowserConfig::default(),
            output: OutputConfig::default(),
        })
    }

    /// Origin of the search URL, used to resolve relative links
    pub fn site_base(&self) -> Result<Url> {
        Ok(self.search_url.join("/")?)
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u32> {
        let first = self.start_page;
        first..first.saturating_add(self.pages)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.search_url.scheme(), "http" | "https") {
            return Err(ScrapeError::Config(format!(
                "search URL must be http(s), got {}",
                self.search_url
            )));
        }
        if self.pages == 0 {
            return Err(ScrapeError::Config("at least one page is required".into()));
        }
        if self.start_page == 0 {
            return Err(ScrapeError::Config("pages are numbered from 1".into()));
        }
        if self.listing_attempts == 0 {
            return Err(ScrapeError::Config(
                "at least one listing attempt is required".into(),
            ));
        }
        Ok(())
    }
}

fn seconds(value: f64, name: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| ScrapeError::Config(format!("{} must be a non-negative number of seconds", name)))
}

impl TryFrom<&Cli> for ScrapeConfig {
    type Error = ScrapeError;

    fn try_from(cli: &Cli) -> Result<Self> {
        let scroll_pause = seconds(cli.scroll_pause, "scroll-pause")?;

        let config = Self {
            search_url: Url::parse(&cli.search_url)?,
            start_page: cli.start_page,
            pages: cli.pages,
            listing: RenderBudget {
                post_load_wait: seconds(cli.listing_wait, "listing-wait")?,
                scroll_passes: cli.listing_scrolls,
                scroll_step: cli.scroll_step,
                scroll_pause,
            },
            detail: RenderBudget {
                post_load_wait: seconds(cli.detail_wait, "detail-wait")?,
                scroll_passes: cli.detail_scrolls,
                scroll_step: cli.scroll_step,
                scroll_pause,
            },
            page_pacing: PacingRange::new(
                seconds(cli.page_delay_min, "page-delay-min")?,
                seconds(cli.page_delay_max, "page-delay-max")?,
            )?,
            property_pacing: PacingRange::new(
                seconds(cli.property_delay_min, "property-delay-min")?,
                seconds(cli.property_delay_max, "property-delay-max")?,
            )?,
            listing_attempts: cli.listing_attempts,
            retry_delay: seconds(cli.retry_delay, "retry-delay")?,
            max_consecutive_failures: cli.max_consecutive_failures,
            browser: BrowserConfig {
                headless: !cli.visible,
                page_load_timeout: Duration::from_secs(cli.page_load_timeout),
                user_agent: cli.user_agent.clone(),
                window_size: (cli.window_width, cli.window_height),
            },
            output: OutputConfig {
                dir: cli.output_dir.clone(),
                json: cli.json,
                debug_dir: (!cli.no_debug).then(|| cli.debug_dir.clone()),
            },
        };

        config.validate()?;
        Ok(config)
    }
}
