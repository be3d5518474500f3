//! File-backed task tracker: users, tasks and overview reports kept in
//! plain text files next to the binary.

pub mod codec;
pub mod config;
pub mod error;
pub mod menu;
pub mod operations;
pub mod report;
pub mod store;
pub mod task;
pub mod ui;

pub use config::Config;
pub use error::{Result, TaskError};
pub use store::{Store, StorePaths};
pub use task::{Task, User};
