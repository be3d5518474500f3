//! File locations and the admin account name.
//!
//! Read from an optional JSON file; any field left out keeps its default.
//! Relative paths are resolved against the data directory, taken from
//! `--data-dir`, then `TASKLEDGER_DATA_DIR`, then the working directory.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Result, TaskError};
use crate::operations;
use crate::report::ReportPaths;
use crate::store::StorePaths;

pub const DATA_DIR_ENV: &str = "TASKLEDGER_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub users_file: PathBuf,
    pub tasks_file: PathBuf,
    pub task_overview_file: PathBuf,
    pub user_overview_file: PathBuf,
    pub admin_username: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("user.txt"),
            tasks_file: PathBuf::from("tasks.txt"),
            task_overview_file: PathBuf::from("task_overview.txt"),
            user_overview_file: PathBuf::from("user_overview.txt"),
            admin_username: "admin".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|err| TaskError::io(path, err))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|err| TaskError::Config(format!("{}: {err}", path.display())))?;
        operations::validate_username(&config.admin_username)
            .map_err(|err| TaskError::Config(format!("admin_username: {err}")))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Config file if given, defaults otherwise, with paths anchored at the data directory.
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let data_dir = data_dir.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from));
        Ok(match data_dir {
            Some(dir) => config.rooted_at(&dir),
            None => config,
        })
    }

    pub fn rooted_at(self, dir: &Path) -> Self {
        Self {
            users_file: dir.join(self.users_file),
            tasks_file: dir.join(self.tasks_file),
            task_overview_file: dir.join(self.task_overview_file),
            user_overview_file: dir.join(self.user_overview_file),
            admin_username: self.admin_username,
        }
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths {
            users: self.users_file.clone(),
            tasks: self.tasks_file.clone(),
        }
    }

    pub fn report_paths(&self) -> ReportPaths {
        ReportPaths {
            task_overview: self.task_overview_file.clone(),
            user_overview: self.user_overview_file.clone(),
        }
    }
}
