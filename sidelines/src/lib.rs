// Library interface for sidelines modules
// This allows tests and the binary to import modules

pub mod aggregate;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod server;
pub mod service;
pub mod stats;
pub mod store;
