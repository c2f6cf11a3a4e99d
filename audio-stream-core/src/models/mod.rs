pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pcm;
pub mod segment;
pub mod state;
pub mod summary;
