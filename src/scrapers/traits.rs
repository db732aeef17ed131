use crate::error::Result;

/// Capabilities the pipeline needs from a browser.
/// Exactly one session exists per run; it is owned by the orchestrator.
pub trait BrowserSession {
    /// Load `url`, failing once the page-load timeout elapses
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Scroll the viewport down by `pixels`
    fn scroll_by(&mut self, pixels: u32) -> Result<()>;

    /// Current rendered markup
    fn markup(&mut self) -> Result<String>;

    /// PNG of the current viewport
    fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Release the browser. Called once, on the finalizing path.
    fn close(&mut self) {}
}

impl<S: BrowserSession + ?Sized> BrowserSession for Box<S> {
    fn navigate(&mut self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn scroll_by(&mut self, pixels: u32) -> Result<()> {
        (**self).scroll_by(pixels)
    }

    fn markup(&mut self) -> Result<String> {
        (**self).markup()
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        (**self).screenshot()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
