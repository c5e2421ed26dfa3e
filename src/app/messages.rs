use serde::{Deserialize, Serialize};

/// Requests sent by the popup and options screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    IndexBookmarks { bookmarks: Vec<BookmarkRef> },
    DeleteBookmarks { urls: Vec<String> },
    UpdateKeywords { url: String, keywords: Vec<String> },
}

/// The options screen sends whole rows; only the url is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkRef {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Totals of an `indexBookmarks` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub failed: usize,
    /// Requested urls with no record in the index.
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum EventOutcome {
    /// Arrived before the first full sync.
    Ignored,
    Indexed { urls: Vec<String> },
    Removed { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let msg: Message = serde_json::from_str(
            r#"{"type": "indexBookmarks", "bookmarks": [{"url": "http://a.com", "title": "A", "status": "Not Indexed"}]}"#,
        )
        .unwrap();
        assert!(matches!(msg, Message::IndexBookmarks { ref bookmarks } if bookmarks[0].url == "http://a.com"));

        let msg: Message = serde_json::from_str(
            r#"{"type": "updateKeywords", "url": "http://a.com", "keywords": ["x"]}"#,
        )
        .unwrap();
        assert!(matches!(msg, Message::UpdateKeywords { .. }));

        assert!(serde_json::from_str::<Message>(r#"{"type": "retry"}"#).is_err());
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply = Reply {
            deleted_count: Some(2),
            ..Reply::ok()
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"success":true,"deletedCount":2}"#
        );
        assert_eq!(
            serde_json::to_string(&Reply::err("Bookmark not found")).unwrap(),
            r#"{"success":false,"error":"Bookmark not found"}"#
        );
    }
}
