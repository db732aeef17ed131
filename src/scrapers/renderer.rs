use crate::config::RenderBudget;
use crate::error::Result;
use crate::scrapers::traits::BrowserSession;
use std::thread;
use tracing::{debug, warn};

/// Load `url`, let client-side rendering settle, scroll to force lazy content,
/// and return the rendered markup.
pub fn render<S: BrowserSession + ?Sized>(
    session: &mut S,
    url: &str,
    budget: &RenderBudget,
) -> Result<String> {
    session.navigate(url)?;

    debug!("Waiting {:?} for {} to render", budget.post_load_wait, url);
    thread::sleep(budget.post_load_wait);

    for pass in 0..budget.scroll_passes {
        if let Err(e) = session.scroll_by(budget.scroll_step) {
            warn!("Scroll pass {} on {} failed: {}", pass + 1, url, e);
            break;
        }
        thread::sleep(budget.scroll_pause);
    }

    session.markup()
}
