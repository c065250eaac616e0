pub mod categorize;
pub mod config;
pub mod error;
pub mod extract;
pub mod implement;
pub mod io;
pub mod ledger;
pub mod markdown;
pub mod migrations;
pub mod paths;
pub mod plan;
pub mod synthesize;
pub mod task_file;
pub mod types;
pub mod verify;

pub use error::{ClavixError, Result};
