//! Line codec for the `user.txt` and `tasks.txt` backing files.
//!
//! One record per line, fields joined by `", "`:
//!
//! ```text
//! bob, secret
//! bob, Report, Write the quarterly report, 01 Jan 2024, 10 Jan 2024, No
//! ```

use chrono::NaiveDate;

use crate::task::{Task, User};

pub const DELIMITER: &str = ", ";
pub const DATE_FORMAT: &str = "%d %b %Y";

const USER_FIELDS: usize = 2;
const TASK_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid date '{0}', expected DD MMM YYYY")]
    Date(String),

    #[error("invalid completion flag '{0}', expected Yes or No")]
    Flag(String),
}

pub fn decode_user(line: &str) -> Result<User, FormatError> {
    let fields = split(line, USER_FIELDS)?;
    Ok(User::new(fields[0], fields[1]))
}

pub fn decode_task(line: &str) -> Result<Task, FormatError> {
    let fields = split(line, TASK_FIELDS)?;
    Ok(Task {
        assigned_user: fields[0].to_string(),
        title: fields[1].to_string(),
        description: fields[2].to_string(),
        assigned_date: parse_date(fields[3])?,
        due_date: parse_date(fields[4])?,
        completed: parse_flag(fields[5])?,
    })
}

pub fn encode_user(user: &User) -> String {
    [user.username.as_str(), user.password.as_str()].join(DELIMITER)
}

pub fn encode_task(task: &Task) -> String {
    let assigned_date = format_date(task.assigned_date);
    let due_date = format_date(task.due_date);
    [
        task.assigned_user.as_str(),
        task.title.as_str(),
        task.description.as_str(),
        assigned_date.as_str(),
        due_date.as_str(),
        if task.completed { "Yes" } else { "No" },
    ]
    .join(DELIMITER)
}

pub fn parse_date(text: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| FormatError::Date(text.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// True when `value` could not survive a round trip through a record line.
pub fn breaks_record(value: &str) -> bool {
    value.contains(DELIMITER) || value.contains('\n') || value.contains('\r')
}

fn split(line: &str, expected: usize) -> Result<Vec<&str>, FormatError> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(DELIMITER).collect();
    if fields.len() != expected {
        return Err(FormatError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_flag(text: &str) -> Result<bool, FormatError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(FormatError::Flag(text.to_string())),
    }
}
