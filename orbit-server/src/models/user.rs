use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub profile_image: Option<String>,
}

impl User {
    /// Display name used for users that never supplied one
    pub fn default_name(user_id: &str) -> String {
        let prefix: String = user_id.chars().take(8).collect();
        format!("User {}", prefix)
    }
}
