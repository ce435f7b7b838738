//! Room tokens for the hosted video-call service.
//!
//! Token layout: `"04"` followed by standard base64 of
//! `expire (i64 BE) | nonce (12 bytes) | AES-256-GCM(payload JSON)`,
//! keyed by SHA-256 of the server secret.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::models::{User, ZegoTokenResponse};

const TOKEN_VERSION: &str = "04";
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallTokenPayload {
    pub app_id: u32,
    pub user_id: String,
    pub room_id: String,
    pub nonce: i32,
    pub ctime: i64,
    pub expire: i64,
}

pub struct CallTokenIssuer {
    app_id: u32,
    server_secret: String,
    ttl: Duration,
}

impl CallTokenIssuer {
    pub fn new(app_id: u32, server_secret: impl Into<String>, ttl: Duration) -> ApiResult<Self> {
        let server_secret = server_secret.into();
        if server_secret.is_empty() {
            return Err(ApiError::Token("Server secret is empty".to_string()));
        }
        Ok(Self {
            app_id,
            server_secret,
            ttl,
        })
    }

    fn cipher(&self) -> ApiResult<Aes256Gcm> {
        let key = Sha256::digest(self.server_secret.as_bytes());
        Aes256Gcm::new_from_slice(&key).map_err(|_| ApiError::Token("Failed to create cipher".to_string()))
    }

    /// Issue a token for `user_id` in `room_id`, valid from `now` (unix seconds)
    pub fn issue(&self, user_id: &str, room_id: &str, now: i64) -> ApiResult<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expire = now.saturating_add(ttl);
        let payload = CallTokenPayload {
            app_id: self.app_id,
            user_id: user_id.to_string(),
            room_id: room_id.to_string(),
            nonce: rand::random::<i32>(),
            ctime: now,
            expire,
        };
        let plaintext =
            serde_json::to_vec(&payload).map_err(|e| ApiError::Internal(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| ApiError::Token("Encryption failed".to_string()))?;

        let mut packed = Vec::with_capacity(8 + NONCE_LEN + ciphertext.len());
        packed.extend_from_slice(&expire.to_be_bytes());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", TOKEN_VERSION, BASE64.encode(packed)))
    }

    /// Decode a token, rejecting foreign, tampered and expired ones
    pub fn verify(&self, token: &str, now: i64) -> ApiResult<CallTokenPayload> {
        let encoded = token
            .strip_prefix(TOKEN_VERSION)
            .ok_or_else(|| ApiError::Token("Unsupported token version".to_string()))?;
        let packed = BASE64
            .decode(encoded)
            .map_err(|_| ApiError::Token("Malformed token".to_string()))?;
        if packed.len() <= 8 + NONCE_LEN {
            return Err(ApiError::Token("Malformed token".to_string()));
        }

        let (expire_bytes, rest) = packed.split_at(8);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let mut expire_buf = [0u8; 8];
        expire_buf.copy_from_slice(expire_bytes);
        let expire = i64::from_be_bytes(expire_buf);

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ApiError::Token("Token signature mismatch".to_string()))?;
        let payload: CallTokenPayload = serde_json::from_slice(&plaintext)
            .map_err(|_| ApiError::Token("Malformed token payload".to_string()))?;

        if payload.expire != expire || payload.app_id != self.app_id {
            return Err(ApiError::Token("Token does not belong to this app".to_string()));
        }
        if now >= expire {
            return Err(ApiError::Token("Token expired".to_string()));
        }
        Ok(payload)
    }
}

/// Build the `joinvideocall` response for the authenticated `user`
pub fn join_video_call(
    issuer: Option<&CallTokenIssuer>,
    user: &User,
    room_id: &str,
) -> ApiResult<ZegoTokenResponse> {
    let issuer = issuer.ok_or_else(|| ApiError::Token("Video calls are not configured".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    let token = issuer.issue(&user.id, room_id, now)?;

    Ok(ZegoTokenResponse {
        token,
        room_id: room_id.to_string(),
        user_id: user.id.clone(),
        username: user.username.clone().unwrap_or_else(|| user.name.clone()),
        app_id: issuer.app_id,
        server_secret: issuer.server_secret.clone(),
    })
}
