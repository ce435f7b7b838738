use serde::{Deserialize, Serialize};

/// Credentials handed to a client joining a video call room
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ZegoTokenResponse {
    pub token: String,
    #[serde(rename = "roomID")]
    pub room_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
    #[serde(rename = "appID")]
    pub app_id: u32,
    #[serde(rename = "serverSecret")]
    pub server_secret: String,
}
