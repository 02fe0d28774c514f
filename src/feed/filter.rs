//! Content filters for comment feeds.

use std::fmt;

use super::types::{FeedConfig, FeedMeta, NormalizedItem, Platform, AUTOMOD_AUTHOR};

/// Why an item was held back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRejection {
    /// Body shorter than `min_length` characters.
    TooShort { length: usize, min_length: usize },
    /// Written by AutoModerator.
    AutoModerator,
    /// Body contains none of the keywords.
    NoKeyword,
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRejection::TooShort { length, min_length } => {
                write!(f, "body too short ({length} < {min_length})")
            }
            FilterRejection::AutoModerator => f.write_str("authored by AutoModerator"),
            FilterRejection::NoKeyword => f.write_str("no keyword matched"),
        }
    }
}

/// Apply the feed's filters to an item.
///
/// Filters only exist for `reddit_comments` feeds with `meta` set; every
/// other item passes.
pub fn apply_filters(feed: &FeedConfig, item: &NormalizedItem) -> Result<(), FilterRejection> {
    match (&feed.platform, &feed.meta) {
        (Platform::RedditComments, Some(meta)) => check(meta, item),
        _ => Ok(()),
    }
}

/// Run the predicates in order; the first failure wins.
fn check(meta: &FeedMeta, item: &NormalizedItem) -> Result<(), FilterRejection> {
    let body = item.body.as_deref().unwrap_or("");

    if let Some(min_length) = meta.min_length {
        let length = body.chars().count();
        if length < min_length {
            return Err(FilterRejection::TooShort { length, min_length });
        }
    }

    if meta.ignore_automod && item.author.as_deref() == Some(AUTOMOD_AUTHOR) {
        return Err(FilterRejection::AutoModerator);
    }

    let keywords = meta.keyword_list();
    if !keywords.is_empty() {
        let body = body.to_lowercase();
        if !keywords.iter().any(|k| body.contains(k.as_str())) {
            return Err(FilterRejection::NoKeyword);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comments_feed(meta: Option<FeedMeta>) -> FeedConfig {
        FeedConfig {
            id: 7,
            platform: Platform::RedditComments,
            source: "post1".to_string(),
            channel_id: "1".to_string(),
            message_template: None,
            check_interval_minutes: Some(15),
            last_posted_id: None,
            is_enabled: true,
            meta,
        }
    }

    fn comment(author: &str, body: &str) -> NormalizedItem {
        NormalizedItem::new("c1").with_author(author).with_body(body)
    }

    #[test]
    fn test_no_meta_passes() {
        let feed = comments_feed(None);
        assert!(apply_filters(&feed, &comment("AutoModerator", "")).is_ok());
    }

    #[test]
    fn test_other_platforms_ignore_meta() {
        let mut feed = comments_feed(Some(FeedMeta {
            min_length: Some(100),
            ..Default::default()
        }));
        feed.platform = Platform::Reddit;
        assert!(apply_filters(&feed, &comment("goat", "short")).is_ok());
    }

    #[test]
    fn test_min_length() {
        let feed = comments_feed(Some(FeedMeta {
            min_length: Some(10),
            ..Default::default()
        }));

        assert_eq!(
            apply_filters(&feed, &comment("goat", "too short")),
            Err(FilterRejection::TooShort {
                length: 9,
                min_length: 10
            })
        );
        assert!(apply_filters(&feed, &comment("goat", "long enough")).is_ok());
        // Characters, not bytes.
        assert!(apply_filters(&feed, &comment("goat", "ééééééééé")).is_err());
        assert!(apply_filters(&feed, &comment("goat", "éééééééééé")).is_ok());
    }

    #[test]
    fn test_min_length_missing_body() {
        let feed = comments_feed(Some(FeedMeta {
            min_length: Some(1),
            ..Default::default()
        }));
        assert!(apply_filters(&feed, &NormalizedItem::new("c1")).is_err());
    }

    #[test]
    fn test_ignore_automod() {
        let feed = comments_feed(Some(FeedMeta {
            ignore_automod: true,
            ..Default::default()
        }));
        assert_eq!(
            apply_filters(&feed, &comment("AutoModerator", "rules")),
            Err(FilterRejection::AutoModerator)
        );
        assert!(apply_filters(&feed, &comment("goat", "rules")).is_ok());

        let feed = comments_feed(Some(FeedMeta::default()));
        assert!(apply_filters(&feed, &comment("AutoModerator", "rules")).is_ok());
    }

    #[test]
    fn test_keywords() {
        let feed = comments_feed(Some(FeedMeta {
            keywords: Some("help, Bug".to_string()),
            ..Default::default()
        }));

        assert_eq!(
            apply_filters(&feed, &comment("goat", "just saying hi")),
            Err(FilterRejection::NoKeyword)
        );
        assert!(apply_filters(&feed, &comment("goat", "Found a BUG in the bot")).is_ok());
        assert!(apply_filters(&feed, &comment("goat", "can someone helpme")).is_ok());
    }

    #[test]
    fn test_blank_keywords_pass() {
        let feed = comments_feed(Some(FeedMeta {
            keywords: Some(" , ".to_string()),
            ..Default::default()
        }));
        assert!(apply_filters(&feed, &comment("goat", "anything")).is_ok());
    }

    #[test]
    fn test_first_failing_predicate_wins() {
        let feed = comments_feed(Some(FeedMeta {
            min_length: Some(50),
            ignore_automod: true,
            keywords: Some("rules".to_string()),
        }));
        assert!(matches!(
            apply_filters(&feed, &comment("AutoModerator", "short")),
            Err(FilterRejection::TooShort { .. })
        ));
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(
            FilterRejection::TooShort {
                length: 3,
                min_length: 10
            }
            .to_string(),
            "body too short (3 < 10)"
        );
        assert_eq!(FilterRejection::NoKeyword.to_string(), "no keyword matched");
    }
}
