pub mod config;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod stratz;
