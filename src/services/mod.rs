/// Read-only shot catalog access.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Live match operations driving the scoring engines.
pub mod match_service;
/// Background eviction of idle matches.
pub mod match_sweeper;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
