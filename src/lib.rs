pub mod admission;
pub mod channel_parser;
pub mod config;
pub mod context_shaper;
pub mod engine;
pub mod error;
pub mod io_struct;
pub mod logging;
pub mod orchestrator;
pub mod server;
pub mod template;
