//! Instapaper response items.
//!
//! Every JSON endpoint returns an array of objects tagged by `type`. Decoding
//! dispatches on the tag; kinds this crate does not model are skipped so new
//! upstream item types never break existing calls.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ErrorCode;

/// One element of an API response array.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Meta(Meta),
    User(User),
    Bookmark(Bookmark),
    Folder(Folder),
    Highlight(Highlight),
    Error(ApiErrorItem),
    #[serde(other)]
    Unknown,
}

/// Response metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "flag")]
    pub subscription_is_active: bool,
}

/// A saved article or note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub bookmark_id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Only present when the caller knows it (e.g. after a move)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub progress_timestamp: i64,
    /// Unix time the bookmark was saved
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "flag")]
    pub starred: bool,
    #[serde(default)]
    pub private_source: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub folder_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub sync_to_mobile: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub highlight_id: i64,
    pub text: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub bookmark_id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub position: i64,
}

/// `{"type": "error", "error_code": 1241, "message": "..."}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorItem {
    pub error_code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

/// Actions applicable to a single bookmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookmarkAction {
    Archive,
    Unarchive,
    Star,
    Unstar,
    Delete,
}

impl BookmarkAction {
    pub fn endpoint(&self) -> &'static str {
        match self {
            BookmarkAction::Archive => "bookmarks/archive",
            BookmarkAction::Unarchive => "bookmarks/unarchive",
            BookmarkAction::Star => "bookmarks/star",
            BookmarkAction::Unstar => "bookmarks/unstar",
            BookmarkAction::Delete => "bookmarks/delete",
        }
    }
}

/// Decode a response array, dropping item kinds this crate does not model.
pub fn decode_items(body: &str) -> Result<Vec<Item>, serde_json::Error> {
    let items: Vec<Item> = serde_json::from_str(body)?;
    Ok(items
        .into_iter()
        .filter(|item| !matches!(item, Item::Unknown))
        .collect())
}

/// Bookmarks in response order.
pub fn bookmarks(items: Vec<Item>) -> Vec<Bookmark> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Bookmark(b) => Some(b),
            _ => None,
        })
        .collect()
}

/// Folders in response order.
pub fn folders(items: Vec<Item>) -> Vec<Folder> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Folder(f) => Some(f),
            _ => None,
        })
        .collect()
}

/// Accepts `true`, `1`, `"1"` and `"true"` (the API mixes all of them).
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mixed_items() {
        let json = r#"[
            {"type": "meta"},
            {"type": "user", "user_id": 7, "username": "alice@example.com", "subscription_is_active": "1"},
            {"type": "bookmark", "bookmark_id": 1, "url": "https://a.example", "title": "A",
             "description": "", "hash": "h1", "progress": 0.5, "progress_timestamp": 0,
             "time": 1700000000, "starred": "0", "private_source": "",
             "tags": [{"id": 3, "name": "rust"}]},
            {"type": "folder", "folder_id": 10, "title": "Reading", "position": 2, "sync_to_mobile": 1},
            {"type": "highlight", "highlight_id": 5, "text": "quote", "bookmark_id": 1, "time": 0, "position": 0}
        ]"#;

        let items = decode_items(json).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], Item::Meta(Meta {}));

        match &items[1] {
            Item::User(user) => {
                assert_eq!(user.user_id, 7);
                assert!(user.subscription_is_active);
            }
            other => panic!("expected user, got {:?}", other),
        }

        let bookmarks = bookmarks(items.clone());
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].bookmark_id, 1);
        assert_eq!(bookmarks[0].progress, 0.5);
        assert!(!bookmarks[0].starred);
        assert_eq!(bookmarks[0].tags[0].name, "rust");
        assert_eq!(bookmarks[0].folder_id, None);

        let folders = folders(items);
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].title, "Reading");
        assert_eq!(folders[0].position, Some(2));
        assert!(folders[0].sync_to_mobile);
    }

    #[test]
    fn test_unknown_item_types_are_skipped() {
        let json = r#"[
            {"type": "bookmark", "bookmark_id": 1, "title": "A"},
            {"type": "tag_cloud", "weights": [1, 2, 3]},
            {"type": "bookmark", "bookmark_id": 2, "title": "B"}
        ]"#;

        let items = decode_items(json).unwrap();
        assert_eq!(items.len(), 2);
        let ids: Vec<i64> = bookmarks(items).iter().map(|b| b.bookmark_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_error_item() {
        let json = r#"[{"type": "error", "error_code": 1241, "message": "Bookmark not found"}]"#;
        let items = decode_items(json).unwrap();
        assert_eq!(
            items[0],
            Item::Error(ApiErrorItem {
                error_code: ErrorCode::BookmarkNotFound,
                message: "Bookmark not found".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_type_is_an_error() {
        assert!(decode_items(r#"[{"bookmark_id": 1}]"#).is_err());
        assert!(decode_items("").is_err());
        assert!(decode_items("not json").is_err());
    }

    #[test]
    fn test_flag_variants() {
        for (raw, expected) in [
            ("true", true),
            ("false", false),
            ("1", true),
            ("0", false),
            (r#""1""#, true),
            (r#""true""#, true),
            (r#""0""#, false),
            ("null", false),
        ] {
            let json = format!(r#"{{"user_id": 1, "username": "u", "subscription_is_active": {}}}"#, raw);
            let user: User = serde_json::from_str(&json).unwrap();
            assert_eq!(user.subscription_is_active, expected, "input {}", raw);
        }
    }

    #[test]
    fn test_action_endpoints() {
        assert_eq!(BookmarkAction::Archive.endpoint(), "bookmarks/archive");
        assert_eq!(BookmarkAction::Unarchive.endpoint(), "bookmarks/unarchive");
        assert_eq!(BookmarkAction::Star.endpoint(), "bookmarks/star");
        assert_eq!(BookmarkAction::Unstar.endpoint(), "bookmarks/unstar");
        assert_eq!(BookmarkAction::Delete.endpoint(), "bookmarks/delete");
    }

    #[test]
    fn test_bookmark_serializes_without_tag() {
        let bookmark = Bookmark {
            bookmark_id: 9,
            url: "https://x.example".to_string(),
            title: "X".to_string(),
            description: String::new(),
            folder_id: Some(4),
            hash: String::new(),
            progress: 0.0,
            progress_timestamp: 0,
            time: 0,
            starred: true,
            private_source: String::new(),
            tags: vec![],
        };
        let value = serde_json::to_value(&bookmark).unwrap();
        assert_eq!(value["bookmark_id"], 9);
        assert_eq!(value["folder_id"], 4);
        assert_eq!(value["starred"], true);
        assert!(value.get("type").is_none());
    }
}
