use crate::config::{PacingRange, ScrapeConfig};
use crate::error::Result;
use crate::export::{self, DebugArtifacts};
use crate::models::{Field, PropertyRecord};
use crate::scrapers::renderer;
use crate::scrapers::traits::BrowserSession;
use crate::scrapers::types::{ListingPage, UrlSet};
use crate::scrapers::{DetailExtractor, UrlCollector};
use chrono::Local;
use rand::rngs::ThreadRng;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use url::Url;

/// Granularity of interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Process-level stop request shared between the signal handler and the run
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless interrupted first. Returns false if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Collecting,
    Extracting,
    Finalizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Collecting => "collecting",
            Phase::Extracting => "extracting",
            Phase::Finalizing => "finalizing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// How the run ended. Every variant has been through finalizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Interrupted { phase: Phase },
    Halted { phase: Phase, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub urls_collected: usize,
    pub properties_failed: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub stats: RunStats,
    pub records: usize,
    pub export_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

/// Counts consecutive failures against the configured ceiling (0 = no ceiling)
struct FailureStreak {
    limit: u32,
    current: u32,
}

impl FailureStreak {
    fn new(limit: u32) -> Self {
        Self { limit, current: 0 }
    }

    fn success(&mut self) {
        self.current = 0;
    }

    /// Record a failure; true once the ceiling is reached
    fn failure(&mut self) -> bool {
        self.current += 1;
        self.limit > 0 && self.current >= self.limit
    }
}

/// Owns one scrape run: the browser, the URL set and the records.
pub struct Orchestrator<S: BrowserSession> {
    session: S,
    config: ScrapeConfig,
    collector: UrlCollector,
    extractor: DetailExtractor,
    artifacts: DebugArtifacts,
    interrupt: Interrupt,
    site_base: Url,
    phase: Phase,
    urls: UrlSet,
    records: Vec<PropertyRecord>,
    stats: RunStats,
    rng: ThreadRng,
}

impl<S: BrowserSession> Orchestrator<S> {
    /// `session` is an already acquired browser; launch failures never reach here
    pub fn new(session: S, config: ScrapeConfig, interrupt: Interrupt) -> Result<Self> {
        config.validate()?;
        let site_base = config.site_base()?;
        let artifacts = DebugArtifacts::new(config.output.debug_dir.clone());

        Ok(Self {
            session,
            collector: UrlCollector::new()?,
            extractor: DetailExtractor::new()?,
            artifacts,
            interrupt,
            site_base,
            config,
            phase: Phase::Init,
            urls: UrlSet::new(),
            records: Vec::new(),
            stats: RunStats::default(),
            rng: rand::thread_rng(),
        })
    }

    /// Run to completion. Finalizing always runs, whatever happens in the
    /// collecting and extracting phases; only an export failure is returned as
    /// an error, after the browser has been released.
    pub fn run(mut self) -> Result<RunSummary> {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.drive())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Run aborted by panic during {}: {}", self.phase, reason);
                RunOutcome::Halted {
                    phase: self.phase,
                    reason,
                }
            }
        };
        self.finalize(outcome)
    }

    fn enter(&mut self, phase: Phase) {
        info!("Phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn drive(&mut self) -> RunOutcome {
        self.enter(Phase::Collecting);
        if let Some(outcome) = self.collect_listings() {
            return outcome;
        }
        if let Some(outcome) = self.interrupted() {
            return outcome;
        }

        self.enter(Phase::Extracting);
        if let Some(outcome) = self.extract_properties() {
            return outcome;
        }

        RunOutcome::Completed
    }

    fn interrupted(&self) -> Option<RunOutcome> {
        if self.interrupt.is_raised() {
            warn!("Interrupted during {}", self.phase);
            Some(RunOutcome::Interrupted { phase: self.phase })
        } else {
            None
        }
    }

    fn pace(&mut self, range: PacingRange) -> Option<RunOutcome> {
        let delay = range.sample(&mut self.rng);
        if delay > Duration::ZERO {
            info!("Waiting {:.1}s before next request...", delay.as_secs_f64());
        }
        if self.interrupt.sleep(delay) {
            None
        } else {
            self.interrupted()
        }
    }

    fn collect_listings(&mut self) -> Option<RunOutcome> {
        let pages: Vec<u32> = self.config.page_numbers().collect();
        let last = pages.last().copied();
        let mut streak = FailureStreak::new(self.config.max_consecutive_failures);

        for number in pages {
            if let Some(outcome) = self.interrupted() {
                return Some(outcome);
            }

            let page = ListingPage::new(&self.config.search_url, number);
            info!("{}", "=".repeat(70));
            info!("Listing page {}: {}", page.number, page.url);

            self.stats.pages_visited += 1;
            match self.collect_page(&page) {
                Ok(urls) => {
                    streak.success();
                    let found = urls.len();
                    let added = self.urls.merge(urls);
                    info!(
                        "✓ Page {}: {} property URLs ({} new, {} total)",
                        page.number,
                        found,
                        added,
                        self.urls.len()
                    );
                }
                Err(e) => {
                    self.stats.pages_failed += 1;
                    error!("✗ Page {} failed: {}", page.number, e);
                    if streak.failure() {
                        return Some(self.halt(format!(
                            "{} consecutive listing pages failed",
                            streak.current
                        )));
                    }
                }
            }

            if Some(number) != last {
                if let Some(outcome) = self.pace(self.config.page_pacing) {
                    return Some(outcome);
                }
            }
        }

        self.stats.urls_collected = self.urls.len();
        info!("✓ Total unique property URLs: {}", self.urls.len());
        None
    }

    /// Render and collect one listing page, retrying on failure or an empty result.
    /// An empty result on the final attempt is not an error.
    fn collect_page(&mut self, page: &ListingPage) -> Result<UrlSet> {
        let attempts = self.config.listing_attempts;
        let mut attempt = 1;

        loop {
            info!("Attempt {}/{} for page {}", attempt, attempts, page.number);
            let result = renderer::render(
                &mut self.session,
                page.url.as_str(),
                &self.config.listing,
            );

            let failure = match result {
                Ok(markup) => {
                    self.artifacts.save_markup(page.number, &markup);
                    let urls = self.collector.collect(&markup, &self.site_base);
                    if !urls.is_empty() || attempt >= attempts {
                        if urls.is_empty() {
                            warn!("No property URLs on page {}", page.number);
                            self.capture_screenshot(page.number, attempt);
                        }
                        return Ok(urls);
                    }
                    warn!("No property URLs on page {}, will retry", page.number);
                    None
                }
                Err(e) if attempt >= attempts => {
                    self.capture_screenshot(page.number, attempt);
                    return Err(e);
                }
                Err(e) => Some(e),
            };

            if let Some(e) = failure {
                warn!("Page {} attempt {} failed: {}", page.number, attempt, e);
            }
            self.capture_screenshot(page.number, attempt);

            info!("Retrying in {:.1}s...", self.config.retry_delay.as_secs_f64());
            if !self.interrupt.sleep(self.config.retry_delay) {
                return Ok(UrlSet::new());
            }
            attempt += 1;
        }
    }

    fn capture_screenshot(&mut self, page: u32, attempt: u32) {
        if self.config.output.debug_dir.is_none() {
            return;
        }
        match self.session.screenshot() {
            Ok(png) => self.artifacts.save_screenshot(page, attempt, &png),
            Err(e) => warn!("Could not capture screenshot for page {}: {}", page, e),
        }
    }

    fn extract_properties(&mut self) -> Option<RunOutcome> {
        let urls: Vec<String> = self.urls.iter().map(str::to_string).collect();
        let total = urls.len();
        let mut streak = FailureStreak::new(self.config.max_consecutive_failures);

        for (idx, url) in urls.iter().enumerate() {
            if let Some(outcome) = self.interrupted() {
                return Some(outcome);
            }

            info!("[{}/{}] {}", idx + 1, total, url);
            match self
                .extractor
                .extract(&mut self.session, url, &self.config.detail)
            {
                Ok(record) => {
                    streak.success();
                    info!("    ✓ {}", record.get(Field::Title));
                    self.records.push(record);
                }
                Err(e) => {
                    self.stats.properties_failed += 1;
                    warn!("    ✗ Skipping {}: {}", url, e);
                    if streak.failure() {
                        return Some(self.halt(format!(
                            "{} consecutive property pages failed",
                            streak.current
                        )));
                    }
                }
            }

            if idx + 1 < total {
                if let Some(outcome) = self.pace(self.config.property_pacing) {
                    return Some(outcome);
                }
            }
        }

        info!("✓ Extraction complete: {} properties", self.records.len());
        None
    }

    fn halt(&self, reason: String) -> RunOutcome {
        error!("Halting run during {}: {}", self.phase, reason);
        RunOutcome::Halted {
            phase: self.phase,
            reason,
        }
    }

    fn finalize(mut self, outcome: RunOutcome) -> Result<RunSummary> {
        self.enter(Phase::Finalizing);
        self.stats.urls_collected = self.urls.len();

        let finished_at = Local::now();
        let output_dir = self.config.output.dir.clone();
        let written = export::write_csv(&output_dir, &self.records, &finished_at);
        let json = if self.config.output.json {
            match export::write_json(&output_dir, &self.records, &finished_at) {
                Ok(path) => Some(path),
                Err(e) => {
                    error!("Could not write JSON copy: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!("Closing browser...");
        self.session.close();
        self.enter(Phase::Done);

        let export_path = written?;
        let summary = RunSummary {
            outcome,
            stats: self.stats.clone(),
            records: self.records.len(),
            export_path,
            json_path: json,
        };
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &RunSummary) {
    info!("{}", "=".repeat(70));
    match &summary.outcome {
        RunOutcome::Completed => info!("✓ Run completed"),
        RunOutcome::Interrupted { phase } => warn!("Run interrupted during {}", phase),
        RunOutcome::Halted { phase, reason } => error!("Run halted during {}: {}", phase, reason),
    }
    info!(
        "Listing pages: {} visited, {} failed",
        summary.stats.pages_visited, summary.stats.pages_failed
    );
    info!("Property URLs: {}", summary.stats.urls_collected);
    info!(
        "Properties: {} extracted, {} failed",
        summary.records, summary.stats.properties_failed
    );
    info!("File saved: {}", summary.export_path.display());
    info!("{}", "=".repeat(70));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
