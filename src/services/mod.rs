/// `/api` storage surface.
pub mod api_service;
/// Chat-completion client.
pub mod completion;
/// Periodic connectivity probing.
pub mod connectivity;
/// OpenAPI documentation generation.
pub mod documentation;
/// Player facts through the reconciler.
pub mod facts_service;
/// Health check service.
pub mod health_service;
/// Recorded games through the reconciler.
pub mod history_service;
/// Completion prompts.
pub mod prompts;
/// Remote-first persistence with a local fallback.
pub mod reconciler;
/// Running game lifecycle.
pub mod session_service;
/// Runtime model selection.
pub mod settings_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Transcript parsing through the completion API.
pub mod transcript_parser;
/// Voice capture and transcript handling.
pub mod voice_service;
