use orbit_server::ErrorBody;

/// Errors surfaced by the client API layer
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not connected to server")]
    Disconnected,

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Server error ({code}): {message}")]
    Server { code: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        ClientError::Server {
            code: body.code,
            message: body.message,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
