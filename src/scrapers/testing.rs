//! In-memory browser used by unit tests.

use crate::error::{Result, ScrapeError};
use crate::scrapers::traits::BrowserSession;
use crate::session::Interrupt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct ScriptedSession {
    pages: HashMap<String, Vec<String>>,
    current: Option<(String, usize)>,
    fail_scrolls: bool,
    panic_on: Option<String>,
    interrupt_after: Option<(usize, Interrupt)>,
    pub visited: Vec<String>,
    pub scrolls: Vec<u32>,
    pub closed: Rc<Cell<bool>>,
    /// Navigations per URL, shared so tests can read it after the session is moved
    pub navigations: Rc<RefCell<HashMap<String, usize>>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `markup` for `url`; unknown URLs fail to navigate
    pub fn page(self, url: &str, markup: &str) -> Self {
        self.responses(url, &[markup])
    }

    /// Serve `responses` on successive visits to `url`, repeating the last one
    pub fn responses(mut self, url: &str, responses: &[&str]) -> Self {
        let markups = responses.iter().map(|m| m.to_string()).collect();
        self.pages.insert(url.to_string(), markups);
        self
    }

    pub fn failing_scrolls(mut self) -> Self {
        self.fail_scrolls = true;
        self
    }

    pub fn panic_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    /// Raise `interrupt` once `navigations` pages have been visited
    pub fn interrupt_after(mut self, navigations: usize, interrupt: Interrupt) -> Self {
        self.interrupt_after = Some((navigations, interrupt));
        self
    }
}

impl BrowserSession for ScriptedSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        if self.panic_on.as_deref() == Some(url) {
            panic!("scripted browser crash on {}", url);
        }
        self.visited.push(url.to_string());
        let visit = {
            let mut navigations = self.navigations.borrow_mut();
            let count = navigations.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        if let Some((after, interrupt)) = &self.interrupt_after {
            if self.visited.len() >= *after {
                interrupt.raise();
            }
        }
        if !self.pages.contains_key(url) {
            self.current = None;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "timed out".into(),
            });
        }
        self.current = Some((url.to_string(), visit));
        Ok(())
    }

    fn scroll_by(&mut self, pixels: u32) -> Result<()> {
        if self.fail_scrolls {
            return Err(ScrapeError::Browser("scroll rejected".into()));
        }
        self.scrolls.push(pixels);
        Ok(())
    }

    fn markup(&mut self) -> Result<String> {
        self.current
            .as_ref()
            .and_then(|(url, visit)| {
                let markups = self.pages.get(url)?;
                markups.get(*visit).or_else(|| markups.last())
            })
            .cloned()
            .ok_or_else(|| ScrapeError::Browser("no page loaded".into()))
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}
