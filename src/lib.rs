pub mod config;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod loader;
pub mod model;
pub mod replay;
pub mod session;
pub mod sink;
pub mod stats;
pub mod view;
