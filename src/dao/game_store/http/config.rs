/// Runtime configuration describing how to reach a remote scorekeeper API.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Instance root, without the `/api` suffix.
    pub base_url: String,
    /// Sent as `Authorization: Bearer` when set.
    pub bearer_token: Option<String>,
}

impl HttpStoreConfig {
    /// Configuration for the API rooted at `base_url` (without the `/api` suffix).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}
