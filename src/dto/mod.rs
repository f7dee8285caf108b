/// Player fact payloads.
pub mod facts;
/// Health check payloads.
pub mod health;
/// History views and search.
pub mod history;
/// Phase exposed to clients.
pub mod phase;
/// Running game payloads.
pub mod session;
/// Model selection payloads.
pub mod settings;
/// Server-sent event payloads.
pub mod sse;
/// Custom validators.
pub mod validation;
