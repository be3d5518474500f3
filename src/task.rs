use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub title: String,
    pub description: String,
    pub assigned_user: String,
    pub assigned_date: NaiveDate,
    pub due_date: NaiveDate,
    pub completed: bool,
}

impl Task {
    /// Incomplete and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date < today
    }

    /// Title + assignee is how the operations look a task up by name.
    pub fn matches(&self, title: &str, assigned_user: &str) -> bool {
        self.title == title && self.assigned_user == assigned_user
    }
}
