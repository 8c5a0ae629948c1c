pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
