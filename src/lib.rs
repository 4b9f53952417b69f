pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod message;
pub mod observability;
pub mod pattern;
pub mod pipeline;
