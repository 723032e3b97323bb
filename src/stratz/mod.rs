//! Remote stats API access
//!
//! - `client` - rate-limited request execution over a pluggable transport
//! - `retry` - per-call backoff state machine with a wait budget
//! - `queries` - GraphQL documents and typed response rows
//! - `error` - failure taxonomy for one logical call

pub mod client;
pub mod error;
pub mod queries;
pub mod retry;

pub use client::{
    GraphqlRequest, GraphqlTransport, RateLimitedClient, ReqwestTransport, Sleeper, TokioSleeper,
    TransportError, TransportResponse,
};
pub use error::ApiError;
pub use queries::HeroId;
pub use retry::{RetryBudget, RetryPolicy, RetryState};
