//! Task and user overview reports.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::error::{Result, TaskError};
use crate::store::Store;
use crate::task::{Task, User};

/// Where the generated reports are written.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub task_overview: PathBuf,
    pub user_overview: PathBuf,
}

/// Counts shared by the global overview and each per-user section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub overdue: usize,
}

impl TaskCounts {
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        tasks.into_iter().fold(Self::default(), |mut counts, task| {
            counts.total += 1;
            if task.completed {
                counts.completed += 1;
            } else {
                counts.incomplete += 1;
                if task.due_date < today {
                    counts.overdue += 1;
                }
            }
            counts
        })
    }
}

/// A ratio rendered as a two-decimal percentage; `0.00%` when the whole is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percent(pub f64);

impl Percent {
    pub fn of(part: usize, whole: usize) -> Self {
        if whole == 0 {
            Self(0.0)
        } else {
            Self(part as f64 / whole as f64 * 100.0)
        }
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOverview {
    pub counts: TaskCounts,
}

impl TaskOverview {
    pub fn compute<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        Self {
            counts: TaskCounts::tally(tasks, today),
        }
    }
}

impl fmt::Display for TaskOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        writeln!(f, "Task Overview Report")?;
        writeln!(f, "====================")?;
        writeln!(f, "Total tasks: {}", c.total)?;
        writeln!(f, "Completed tasks: {}", c.completed)?;
        writeln!(f, "Uncompleted tasks: {}", c.incomplete)?;
        writeln!(f, "Overdue tasks: {}", c.overdue)?;
        writeln!(f, "Percentage completed: {}", Percent::of(c.completed, c.total))?;
        writeln!(f, "Percentage incomplete: {}", Percent::of(c.incomplete, c.total))?;
        writeln!(f, "Percentage overdue: {}", Percent::of(c.overdue, c.total))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub username: String,
    pub counts: TaskCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub total_users: usize,
    pub total_tasks: usize,
    pub users: Vec<UserStats>,
}

impl UserOverview {
    pub fn compute<'a>(
        users: impl IntoIterator<Item = &'a User>,
        tasks: &[&Task],
        today: NaiveDate,
    ) -> Self {
        let users: Vec<UserStats> = users
            .into_iter()
            .map(|user| UserStats {
                username: user.username.clone(),
                counts: TaskCounts::tally(
                    tasks.iter().copied().filter(|t| t.assigned_user == user.username),
                    today,
                ),
            })
            .collect();
        Self {
            total_users: users.len(),
            total_tasks: tasks.len(),
            users,
        }
    }
}

impl fmt::Display for UserOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User Overview Report")?;
        writeln!(f, "====================")?;
        writeln!(f, "Total users: {}", self.total_users)?;
        writeln!(f, "Total tasks: {}", self.total_tasks)?;
        for user in &self.users {
            let c = &user.counts;
            writeln!(f)?;
            writeln!(f, "User: {}", user.username)?;
            writeln!(f, "- Tasks assigned: {}", c.total)?;
            writeln!(f, "- % of total tasks: {}", Percent::of(c.total, self.total_tasks))?;
            writeln!(f, "- % completed: {}", Percent::of(c.completed, c.total))?;
            writeln!(f, "- % uncompleted: {}", Percent::of(c.incomplete, c.total))?;
            writeln!(f, "- % overdue: {}", Percent::of(c.overdue, c.total))?;
        }
        Ok(())
    }
}

pub fn task_overview(store: &Store, today: NaiveDate) -> TaskOverview {
    TaskOverview::compute(store.all_tasks(), today)
}

pub fn user_overview(store: &Store, today: NaiveDate) -> UserOverview {
    let tasks: Vec<&Task> = store.all_tasks().collect();
    UserOverview::compute(store.users(), &tasks, today)
}

/// Writes both reports, overwriting earlier ones.
pub fn generate_reports(store: &Store, paths: &ReportPaths, today: NaiveDate) -> Result<()> {
    write_report(&paths.task_overview, &task_overview(store, today).to_string())?;
    write_report(&paths.user_overview, &user_overview(store, today).to_string())?;
    tracing::info!(
        "generated reports {} and {}",
        paths.task_overview.display(),
        paths.user_overview.display()
    );
    Ok(())
}

/// Returns the text of both reports, generating them first if either file is missing.
pub fn read_reports(
    store: &Store,
    paths: &ReportPaths,
    today: NaiveDate,
) -> Result<(String, String)> {
    if !paths.task_overview.exists() || !paths.user_overview.exists() {
        tracing::info!("report files not found, generating");
        generate_reports(store, paths, today)?;
    }
    Ok((read_report(&paths.task_overview)?, read_report(&paths.user_overview)?))
}

fn write_report(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|err| TaskError::io(path, err))
}

fn read_report(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err: io::Error| TaskError::io(path, err))
}
