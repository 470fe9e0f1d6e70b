//! Page-number recovery from a clipping's location string.
//!
//! Firmware versions encode the page differently, so extraction is an
//! ordered chain of independent rules. The first rule that yields a number
//! wins; later rules are never consulted.

use std::sync::LazyLock;

use regex::Regex;

static LOCALIZED_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*(\d+)\s*页").expect("valid page regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRule {
    /// `第 12 页`
    LocalizedPage,
    /// `#180-181的标注`: the number after the last `#`, or after its last `-`.
    AfterHash,
    /// `Loc. 1234`: everything past the last `.` and the character after it.
    AfterDot,
    /// `Your Highlight on page 12`
    HighlightOnPage,
}

impl PageRule {
    pub const CHAIN: [PageRule; 4] = [
        PageRule::LocalizedPage,
        PageRule::AfterHash,
        PageRule::AfterDot,
        PageRule::HighlightOnPage,
    ];

    pub fn extract(self, location: &str) -> Option<i64> {
        match self {
            PageRule::LocalizedPage => LOCALIZED_PAGE
                .captures(location)
                .and_then(|caps| caps[1].parse().ok()),
            PageRule::AfterHash => {
                let (_, tail) = location.rsplit_once('#')?;
                let tail = tail.replace("的标注", "").replace("的笔记", "");
                let tail = tail.trim();
                let number = match tail.rsplit_once('-') {
                    Some((_, end)) => end,
                    None => tail,
                };
                number.trim().parse().ok()
            }
            PageRule::AfterDot => {
                let (_, tail) = location.rsplit_once('.')?;
                let rest: String = tail.chars().skip(1).collect();
                rest.trim().parse().ok()
            }
            PageRule::HighlightOnPage => location
                .replace("Your Highlight on page", "")
                .trim()
                .parse()
                .ok(),
        }
    }
}

/// First matching rule and its page, if any rule matches.
pub fn resolve(location: &str) -> Option<(PageRule, i64)> {
    PageRule::CHAIN
        .iter()
        .find_map(|rule| rule.extract(location).map(|page| (*rule, page)))
}

/// Best-effort page number, 0 when nothing matches.
pub fn page_number(location: &str) -> i64 {
    resolve(location).map(|(_, page)| page).unwrap_or(0)
}
