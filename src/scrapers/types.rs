use std::collections::HashSet;
use url::Url;

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub number: u32,
    pub url: Url,
}

impl ListingPage {
    /// Page 1 is the search URL itself, later pages carry a single `page` query pair
    pub fn new(search_url: &Url, number: u32) -> Self {
        let mut url = search_url.clone();
        if number > 1 {
            let kept: Vec<(String, String)> = search_url
                .query_pairs()
                .filter(|(key, _)| key != "page")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("page", &number.to_string());
        }
        Self { number, url }
    }
}

/// Property URLs deduplicated by exact string, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the URL was already present
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    /// Merge another set, returning how many URLs were new
    pub fn merge(&mut self, other: UrlSet) -> usize {
        other
            .order
            .into_iter()
            .filter(|url| self.insert(url.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl FromIterator<String> for UrlSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = UrlSet::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}
