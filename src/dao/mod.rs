/// Database model definitions.
pub mod models;
/// Persistence gateways for matches, sets and points.
pub mod score_gateway;
/// Storage abstraction layer for database operations.
pub mod storage;
