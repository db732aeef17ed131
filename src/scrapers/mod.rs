pub mod browser;
pub mod collector;
pub mod extractor;
pub mod renderer;
pub mod rules;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use browser::ChromeSession;
pub use collector::UrlCollector;
pub use extractor::DetailExtractor;
pub use traits::BrowserSession;
