use serde::{Deserialize, Serialize};

use super::user::User;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Media {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub filename: Option<String>,
    pub size: Option<i64>,
}

impl Media {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.media_type.is_none()
            && self.filename.is_none()
            && self.size.is_none()
    }
}

/// Media attached by the client; same shape as [`Media`]
pub type MediaInput = Media;

/// A file carried inline in a request frame
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileUpload {
    pub filename: String,
    pub mimetype: String,
    /// Base64 (standard alphabet) file contents
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: User,
    pub receiver: User,
    pub message: Option<String>,
    pub media: Option<Media>,
    pub seen: bool,
    /// Epoch milliseconds, rendered as a string
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_field_is_renamed() {
        let media = Media {
            url: Some("/uploads/a.png".to_string()),
            media_type: Some("image".to_string()),
            filename: Some("a.png".to_string()),
            size: Some(42),
        };

        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "image");
        assert!(json.get("media_type").is_none());
    }

    #[test]
    fn test_partial_media_input_parses() {
        let media: MediaInput = serde_json::from_str(r#"{"url":"https://g.example/x.gif"}"#).unwrap();
        assert_eq!(media.url.as_deref(), Some("https://g.example/x.gif"));
        assert!(media.media_type.is_none());
        assert!(!media.is_empty());
        assert!(Media::default().is_empty());
    }
}
