//! LinkedIn profile link detection.

use once_cell::sync::Lazy;
use regex::Regex;

static PROFILE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?linkedin\.com/in/[A-Za-z0-9\-_/]+").unwrap()
});

/// Returns every LinkedIn profile URL in `text`, in order of appearance.
/// Duplicates are kept; callers accumulate into a [`LinkSet`].
pub fn find_profile_links(text: &str) -> Vec<String> {
    PROFILE_LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Insertion-ordered set of profile links. The first occurrence of a link fixes its position.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    links: Vec<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, link: String) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, links: I) {
        for link in links {
            self.insert(link);
        }
    }

    /// Scans `text` and records every profile link found in it.
    pub fn scan(&mut self, text: &str) {
        self.extend(find_profile_links(text));
    }

    pub fn into_vec(self) -> Vec<String> {
        self.links
    }
}
