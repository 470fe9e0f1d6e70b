//! Locale-branched timestamp parsing for the clippings metadata line.

use chrono::NaiveDateTime;

use crate::keys::TIMESTAMP_FORMAT;

const ENGLISH_PATTERNS: [&str; 2] = ["%B %d, %Y %I:%M:%S %p", "%B %d, %Y, %I:%M:%S %p"];
const CHINESE_12H_PATTERN: &str = "%Y年%m月%d日 %I:%M:%S %p";
const CHINESE_24H_PATTERN: &str = "%Y年%m月%d日%H:%M:%S";

/// The two date layouts the device writes, told apart by how many `|`
/// segments the metadata line has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `- Your Highlight on page 12 | Location 180-181 | Added on Tuesday, July 4, 2023 10:30:15 AM`
    English,
    /// `- 您在位置 #180-181的标注 | 添加于 2023年7月4日星期二 上午10:30:15`
    Chinese,
}

impl DateFormat {
    pub fn for_segments(count: usize) -> Option<DateFormat> {
        match count {
            0 | 1 => None,
            2 => Some(DateFormat::Chinese),
            _ => Some(DateFormat::English),
        }
    }

    /// Index of the segment holding the date.
    pub fn segment_index(self) -> usize {
        match self {
            DateFormat::English => 2,
            DateFormat::Chinese => 1,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            DateFormat::English => "Added on",
            DateFormat::Chinese => "添加于",
        }
    }

    pub fn parse(self, raw: &str) -> Option<NaiveDateTime> {
        let text = raw.replace(self.prefix(), "");
        let text = text.trim();
        match self {
            DateFormat::English => parse_english(text),
            DateFormat::Chinese => parse_chinese(text),
        }
    }
}

fn parse_english(text: &str) -> Option<NaiveDateTime> {
    // The weekday sits before the first comma; try without it first.
    let after_weekday = text.split_once(',').map(|(_, rest)| rest.trim());
    after_weekday
        .into_iter()
        .chain(std::iter::once(text))
        .find_map(|candidate| {
            ENGLISH_PATTERNS
                .iter()
                .find_map(|pattern| NaiveDateTime::parse_from_str(candidate, pattern).ok())
        })
}

fn parse_chinese(text: &str) -> Option<NaiveDateTime> {
    let mut text = text.to_string();
    if let Some(idx) = text.find("星期") {
        let end = text[idx..]
            .char_indices()
            .nth(3)
            .map(|(offset, _)| idx + offset)
            .unwrap_or(text.len());
        text.replace_range(idx..end, "");
    }
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    for (marker, meridiem) in [("上午", "AM"), ("下午", "PM")] {
        if let Some((date, time)) = compact.split_once(marker) {
            let normalized = format!("{} {} {}", date, time, meridiem);
            return NaiveDateTime::parse_from_str(&normalized, CHINESE_12H_PATTERN).ok();
        }
    }
    NaiveDateTime::parse_from_str(&compact, CHINESE_24H_PATTERN).ok()
}

/// Normalized timestamp for a split metadata line, empty when it cannot be
/// parsed.
pub fn extract_timestamp(segments: &[&str]) -> String {
    DateFormat::for_segments(segments.len())
        .and_then(|format| {
            segments
                .get(format.segment_index())
                .and_then(|raw| format.parse(raw))
        })
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(format: DateFormat, raw: &str) -> Option<String> {
        format
            .parse(raw)
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
    }

    #[test]
    fn test_for_segments() {
        assert_eq!(DateFormat::for_segments(1), None);
        assert_eq!(DateFormat::for_segments(2), Some(DateFormat::Chinese));
        assert_eq!(DateFormat::for_segments(3), Some(DateFormat::English));
        assert_eq!(DateFormat::for_segments(4), Some(DateFormat::English));
    }

    #[test]
    fn test_english_device_line() {
        assert_eq!(
            normalized(DateFormat::English, " Added on Tuesday, July 4, 2023 10:30:15 AM"),
            Some("2023-07-04 10:30:15".into())
        );
    }

    #[test]
    fn test_english_with_comma_before_time() {
        assert_eq!(
            normalized(DateFormat::English, "July 4, 2023, 10:30:15 AM"),
            Some("2023-07-04 10:30:15".into())
        );
    }

    #[test]
    fn test_english_pm_and_midnight() {
        assert_eq!(
            normalized(DateFormat::English, "Added on Sunday, December 31, 2023 11:59:59 PM"),
            Some("2023-12-31 23:59:59".into())
        );
        assert_eq!(
            normalized(DateFormat::English, "Added on Monday, January 1, 2024 12:00:00 AM"),
            Some("2024-01-01 00:00:00".into())
        );
    }

    #[test]
    fn test_chinese_with_spaced_weekday() {
        assert_eq!(
            normalized(DateFormat::Chinese, "2023年7月4日 星期二 上午10:30:15"),
            Some("2023-07-04 10:30:15".into())
        );
    }

    #[test]
    fn test_chinese_device_line() {
        assert_eq!(
            normalized(DateFormat::Chinese, " 添加于 2023年7月4日星期二 上午10:30:15"),
            Some("2023-07-04 10:30:15".into())
        );
    }

    #[test]
    fn test_chinese_afternoon() {
        assert_eq!(
            normalized(DateFormat::Chinese, "添加于 2021年11月20日星期六 下午3:05:09"),
            Some("2021-11-20 15:05:09".into())
        );
    }

    #[test]
    fn test_chinese_24_hour() {
        assert_eq!(
            normalized(DateFormat::Chinese, "添加于 2021年11月20日星期六 15:05:09"),
            Some("2021-11-20 15:05:09".into())
        );
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(DateFormat::English.parse("Added on sometime last week"), None);
        assert_eq!(DateFormat::Chinese.parse("添加于 昨天"), None);
    }

    #[test]
    fn test_extract_timestamp_branches_on_segment_count() {
        let english = ["- Your Highlight on page 1 ", " Location 5-6 ", " Added on Tuesday, July 4, 2023 10:30:15 AM"];
        assert_eq!(extract_timestamp(&english), "2023-07-04 10:30:15");

        let chinese = ["- 您在位置 #5-6的标注 ", " 添加于 2023年7月4日星期二 上午10:30:15"];
        assert_eq!(extract_timestamp(&chinese), "2023-07-04 10:30:15");

        assert_eq!(extract_timestamp(&["- no date at all"]), "");
    }
}
