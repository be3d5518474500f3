//! Business rules for users and tasks, applied on top of the [`Store`].
//!
//! Each operation validates first and only then touches the store, so a
//! rejected call leaves both the in-memory records and the backing files
//! unchanged.

use chrono::NaiveDate;

use crate::codec;
use crate::error::{Result, TaskError};
use crate::store::Store;
use crate::task::{Task, User};

/// The authenticated user driving the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assigned_user: String,
    pub due_date: NaiveDate,
}

/// Fields an edit may change; `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub assigned_user: Option<String>,
    pub due_date: Option<NaiveDate>,
}

pub fn authenticate(
    store: &Store,
    username: &str,
    password: &str,
    admin_username: &str,
) -> Result<Session> {
    match store.find_user(username) {
        Some(user) if user.password == password => {
            tracing::info!(user = username, "logged in");
            Ok(Session {
                username: user.username.clone(),
                is_admin: user.username == admin_username,
            })
        }
        _ => {
            tracing::debug!(user = username, "login rejected");
            Err(TaskError::Authentication)
        }
    }
}

/// Seeds the admin account when the users file is empty, so a fresh install can log in.
pub fn bootstrap_admin(store: &mut Store, admin_username: &str, password: &str) -> Result<bool> {
    if store.users().next().is_some() {
        return Ok(false);
    }
    validate_username(admin_username)?;
    validate_password(password)?;
    store.add_user(User::new(admin_username, password))?;
    tracing::warn!(user = admin_username, "no users found, created the admin account");
    Ok(true)
}

pub fn register_user(
    store: &mut Store,
    username: &str,
    password: &str,
    current_user_is_admin: bool,
) -> Result<()> {
    if !current_user_is_admin {
        return Err(TaskError::Permission("only the admin can register users".to_string()));
    }
    validate_username(username)?;
    validate_password(password)?;

    store.add_user(User::new(username, password))?;
    tracing::info!(user = username, "registered user");
    Ok(())
}

/// Usernames are non-empty and letters only.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(TaskError::validation("username cannot be blank"));
    }
    if !username.chars().all(|c| c.is_alphabetic()) {
        return Err(TaskError::validation("username must only contain letters"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(TaskError::validation("password cannot be blank"));
    }
    if codec::breaks_record(password) {
        return Err(TaskError::validation(format!(
            "password cannot contain '{}' or line breaks",
            codec::DELIMITER
        )));
    }
    Ok(())
}

/// Adds an incomplete task assigned today.
pub fn add_task(store: &mut Store, new: NewTask, today: NaiveDate) -> Result<()> {
    if !store.user_exists(&new.assigned_user) {
        return Err(TaskError::validation(format!(
            "user '{}' does not exist",
            new.assigned_user
        )));
    }
    require_text("title", &new.title)?;
    require_text("description", &new.description)?;
    if new.due_date < today {
        return Err(TaskError::validation(format!(
            "due date {} is before the assigned date {}",
            codec::format_date(new.due_date),
            codec::format_date(today)
        )));
    }

    let task = Task {
        title: new.title,
        description: new.description,
        assigned_user: new.assigned_user,
        assigned_date: today,
        due_date: new.due_date,
        completed: false,
    };
    tracing::info!(title = %task.title, user = %task.assigned_user, "adding task");
    store.add_task(task)
}

/// Position of the task named `title` assigned to `assigned_user`.
///
/// Titles are not unique, so the first incomplete match wins, then the first match.
pub fn find_task(store: &Store, title: &str, assigned_user: &str) -> Result<usize> {
    let mut first = None;
    for (index, task) in store.positioned_tasks() {
        if !task.matches(title, assigned_user) {
            continue;
        }
        if !task.completed {
            return Ok(index);
        }
        first.get_or_insert(index);
    }
    first.ok_or_else(|| not_found(title, assigned_user))
}

/// Marks the task at `index` complete. Completing an already completed task is a no-op.
pub fn complete_task_at(store: &mut Store, index: usize) -> Result<()> {
    let task = store.task_at(index).ok_or(TaskError::UnknownTask(index))?;
    if task.completed {
        tracing::debug!(title = %task.title, index, "task already completed");
        return Ok(());
    }
    store.update_task_at(index, |t| t.completed = true)?;
    tracing::info!(index, "completed task");
    Ok(())
}

pub fn complete_task(store: &mut Store, title: &str, assigned_user: &str) -> Result<()> {
    let index = find_task(store, title, assigned_user)?;
    complete_task_at(store, index)
}

pub fn edit_task_at(store: &mut Store, index: usize, edit: TaskEdit) -> Result<()> {
    let task = store.task_at(index).ok_or(TaskError::UnknownTask(index))?;
    if task.completed {
        return Err(TaskError::ImmutableState {
            title: task.title.clone(),
        });
    }
    if edit.assigned_user.is_none() && edit.due_date.is_none() {
        return Err(TaskError::validation("nothing to change"));
    }
    if let Some(new_user) = &edit.assigned_user {
        if !store.user_exists(new_user) {
            return Err(TaskError::validation(format!("user '{new_user}' does not exist")));
        }
    }
    if let Some(due) = edit.due_date {
        if due < task.assigned_date {
            return Err(TaskError::validation(format!(
                "due date {} is before the assigned date {}",
                codec::format_date(due),
                codec::format_date(task.assigned_date)
            )));
        }
    }

    store.update_task_at(index, |t| {
        if let Some(new_user) = edit.assigned_user {
            t.assigned_user = new_user;
        }
        if let Some(due) = edit.due_date {
            t.due_date = due;
        }
    })?;
    tracing::info!(index, "edited task");
    Ok(())
}

pub fn edit_task(
    store: &mut Store,
    title: &str,
    assigned_user: &str,
    edit: TaskEdit,
) -> Result<()> {
    let index = find_task(store, title, assigned_user)?;
    edit_task_at(store, index, edit)
}

/// Removes the task at `index` and returns it.
pub fn delete_task_at(
    store: &mut Store,
    index: usize,
    current_user_is_admin: bool,
) -> Result<Task> {
    if !current_user_is_admin {
        return Err(TaskError::Permission("only the admin can delete tasks".to_string()));
    }
    let removed = store.remove_task_at(index)?;
    tracing::info!(title = %removed.title, user = %removed.assigned_user, "deleted task");
    Ok(removed)
}

pub fn delete_task(
    store: &mut Store,
    title: &str,
    assigned_user: &str,
    current_user_is_admin: bool,
) -> Result<()> {
    if !current_user_is_admin {
        return Err(TaskError::Permission("only the admin can delete tasks".to_string()));
    }
    let index = find_task(store, title, assigned_user)?;
    delete_task_at(store, index, current_user_is_admin).map(drop)
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TaskError::validation(format!("{field} cannot be blank")));
    }
    if codec::breaks_record(value) {
        return Err(TaskError::validation(format!(
            "{field} cannot contain '{}' or line breaks",
            codec::DELIMITER
        )));
    }
    Ok(())
}

fn not_found(title: &str, assigned_user: &str) -> TaskError {
    TaskError::NotFound {
        title: title.to_string(),
        assigned_user: assigned_user.to_string(),
    }
}
