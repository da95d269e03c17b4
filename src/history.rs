//! Most-recently-used history lists
//!
//! Every history kept in the settings document is an ordered list with the
//! most recent entry first and at most one entry per key. Re-inserting an
//! existing key moves it to the front. No length bound is applied.

use serde::{Deserialize, Serialize};

/// Insert `entry` at the front of `list`, dropping any entry with the same key
pub fn upsert_most_recent<T, K, F>(list: &mut Vec<T>, entry: T, key_of: F)
where
    F: Fn(&T) -> K,
    K: PartialEq,
{
    let key = key_of(&entry);
    list.retain(|existing| key_of(existing) != key);
    list.insert(0, entry);
}

/// Upsert for histories whose entries are their own key
pub fn upsert_string(list: &mut Vec<String>, entry: &str) {
    upsert_most_recent(list, entry.to_string(), |item| item.clone());
}

/// A previously entered video URL
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct UrlHistoryEntry {
    pub url: String,
    pub title: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_remote_uri: String,
    #[serde(rename = "thumbnail_local")]
    pub thumbnail_local_uri: String,
}

/// A download that completed successfully
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DownloadRecord {
    pub url: String,
    pub title: String,
    pub format: String,
    pub location: String,
    pub output_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<String>,
    pub downloaded_at: String,
}

impl DownloadRecord {
    /// Two downloads are the same when they resolve to the same output template
    pub fn key(&self) -> &str {
        &self.output_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_unique_keys(list: &[String]) -> bool {
        let mut seen = std::collections::HashSet::new();
        list.iter().all(|item| seen.insert(item.clone()))
    }

    #[test]
    fn repeated_keys_move_to_front() {
        let mut locations = Vec::new();
        for loc in ["A", "B", "A", "C"] {
            upsert_string(&mut locations, loc);
        }
        assert_eq!(locations, vec!["C", "A", "B"]);
    }

    #[test]
    fn upserts_never_duplicate() {
        let mut list = Vec::new();
        let sequence = ["x", "y", "x", "x", "z", "y", "x", "w", "z"];
        for item in sequence {
            upsert_string(&mut list, item);
            assert!(has_unique_keys(&list));
            assert_eq!(list[0], item);
        }
        assert_eq!(list, vec!["z", "w", "x", "y"]);
    }

    #[test]
    fn url_entries_are_keyed_by_url_only() {
        let mut history = vec![
            UrlHistoryEntry { url: "u1".into(), title: "Old title".into(), ..Default::default() },
            UrlHistoryEntry { url: "u2".into(), title: "Other".into(), ..Default::default() },
        ];
        let refreshed = UrlHistoryEntry { url: "u2".into(), title: "Renamed".into(), ..Default::default() };
        upsert_most_recent(&mut history, refreshed.clone(), |e| e.url.clone());

        assert_eq!(history.len(), 2);
        assert_eq!(history[0], refreshed);
        assert_eq!(history[1].url, "u1");
    }

    #[test]
    fn download_records_are_keyed_by_output_template() {
        let record = |template: &str, at: &str| DownloadRecord {
            url: "u".into(),
            output_template: template.into(),
            downloaded_at: at.into(),
            ..Default::default()
        };
        let mut downloads = Vec::new();
        upsert_most_recent(&mut downloads, record("a.%(ext)s", "1"), |r| r.key().to_string());
        upsert_most_recent(&mut downloads, record("b.%(ext)s", "2"), |r| r.key().to_string());
        upsert_most_recent(&mut downloads, record("a.%(ext)s", "3"), |r| r.key().to_string());

        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].downloaded_at, "3");
        assert_eq!(downloads[1].output_template, "b.%(ext)s");
    }

    #[test]
    fn url_entry_uses_persisted_field_names() {
        let entry = UrlHistoryEntry {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            title: "T".into(),
            thumbnail_remote_uri: "https://i.ytimg.com/x.jpg".into(),
            thumbnail_local_uri: "file:///data/x.jpg".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["thumbnail"], "https://i.ytimg.com/x.jpg");
        assert_eq!(json["thumbnail_local"], "file:///data/x.jpg");
    }
}
