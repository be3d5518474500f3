//! Line-oriented login and menu loop.
//!
//! Reads from any `BufRead` and writes to any `Write`, so the whole menu can
//! be driven from a script in tests. Core errors are printed and the menu
//! carries on; only console I/O failures escape.

use std::{
    fmt,
    io::{self, BufRead, Write},
};

use chrono::NaiveDate;

use crate::codec;
use crate::config::Config;
use crate::error::TaskError;
use crate::operations::{self, NewTask, Session, TaskEdit};
use crate::report;
use crate::store::Store;
use crate::task::Task;

const RULE_WIDTH: usize = 60;

/// A task copied out of the store with its position, as listed to the user.
type Listed = (usize, Task);

/// What the caller should do after a menu step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Board,
    Exit,
}

#[derive(Debug, thiserror::Error)]
enum Interrupt {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Console(#[from] io::Error),
}

type Step<T = ()> = std::result::Result<T, Interrupt>;

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// One line of input without its line ending; `None` at end of input.
    pub fn ask(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Like [`Console::ask`], but typing `x` cancels the current operation.
    pub fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        match self.ask(message)? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("x") => {
                self.say("Operation cancelled.")?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub fn say(&mut self, text: impl fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }
}

pub struct Menu<'a, R, W> {
    console: Console<R, W>,
    config: &'a Config,
    session: Session,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    /// Prompts until a login succeeds. `None` if input runs out first.
    pub fn login(
        store: &Store,
        config: &'a Config,
        mut console: Console<R, W>,
    ) -> io::Result<Option<Self>> {
        loop {
            let Some(username) = console.ask("Enter user name: ")? else {
                return Ok(None);
            };
            let Some(password) = console.ask("Enter your password: ")? else {
                return Ok(None);
            };
            let admin = config.admin_username.as_str();
            match operations::authenticate(store, username.trim(), &password, admin) {
                Ok(session) => {
                    console.say(format!("Welcome {}!", session.username))?;
                    return Ok(Some(Self {
                        console,
                        config,
                        session,
                    }));
                }
                Err(err) => console.say(format!("{err}. Please try again."))?,
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Shows the menu, reads one choice and runs it.
    pub fn step(&mut self, store: &mut Store, today: NaiveDate) -> io::Result<Flow> {
        let text = self.menu_text();
        let Some(choice) = self.console.ask(text)? else {
            return Ok(Flow::Exit);
        };
        match self.dispatch(choice.trim().to_lowercase().as_str(), store, today) {
            Ok(flow) => Ok(flow),
            Err(Interrupt::Task(err)) => {
                tracing::debug!(error = %err, "operation rejected");
                self.console.say(format!("Error: {err}"))?;
                Ok(Flow::Continue)
            }
            Err(Interrupt::Console(err)) => Err(err),
        }
    }

    fn menu_text(&self) -> &'static str {
        if self.session.is_admin {
            "\nSelect one of the following options:\n\
             r - register a user\n\
             a - add task\n\
             va - view all tasks\n\
             vm - view my tasks\n\
             vc - view completed tasks\n\
             vb - view task board\n\
             del - delete tasks\n\
             ds - display statistics\n\
             gr - generate reports\n\
             e - exit\n: "
        } else {
            "\nSelect one of the following options:\n\
             a - add task\n\
             va - view all tasks\n\
             vm - view my tasks\n\
             vb - view task board\n\
             e - exit\n: "
        }
    }

    fn dispatch(&mut self, choice: &str, store: &mut Store, today: NaiveDate) -> Step<Flow> {
        let admin = self.session.is_admin;
        match choice {
            "" => self.console.say("No option selected")?,
            "a" => self.add_task(store, today)?,
            "va" => self.view_all(store)?,
            "vm" => self.view_mine(store)?,
            "vb" => return Ok(Flow::Board),
            "r" if admin => self.register_user(store)?,
            "vc" if admin => self.view_completed(store)?,
            "del" if admin => self.delete_task(store)?,
            "ds" if admin => self.display_statistics(store, today)?,
            "gr" if admin => {
                report::generate_reports(store, &self.config.report_paths(), today)?;
                self.console.say("Report generated successfully.")?;
            }
            "e" => {
                self.console.say("Goodbye!!!")?;
                return Ok(Flow::Exit);
            }
            _ => self
                .console
                .say("You have entered an invalid input. Please try again")?,
        }
        Ok(Flow::Continue)
    }

    fn register_user(&mut self, store: &mut Store) -> Step {
        self.console.say("Please type 'x' at any time to cancel.")?;
        let Some(username) = self.console.prompt("Enter new username: ")? else {
            return Ok(());
        };
        let Some(password) = self.console.prompt("Enter a password: ")? else {
            return Ok(());
        };
        let Some(confirm) = self.console.prompt("Confirm password: ")? else {
            return Ok(());
        };
        if password != confirm {
            self.console
                .say("Password confirmation does not match. Registration failed.")?;
            return Ok(());
        }
        let username = username.trim();
        operations::register_user(store, username, &password, self.session.is_admin)?;
        self.console.say(format!("User '{username}' registered successfully."))?;
        Ok(())
    }

    fn add_task(&mut self, store: &mut Store, today: NaiveDate) -> Step {
        self.console.say("Please type 'x' at any time to cancel.")?;
        let Some(assigned_user) = self
            .console
            .prompt("Enter the username of the person the task is assigned to: ")?
        else {
            return Ok(());
        };
        let Some(title) = self.console.prompt("Enter the title of the task: ")? else {
            return Ok(());
        };
        let Some(description) = self.console.prompt("Enter a description of the task: ")? else {
            return Ok(());
        };
        let Some(due_date) =
            self.prompt_date("Enter the due date of the task (e.g., 06 Oct 2025): ")?
        else {
            return Ok(());
        };

        let new = NewTask {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            assigned_user: assigned_user.trim().to_string(),
            due_date,
        };
        operations::add_task(store, new, today)?;
        self.console.say("Task added successfully.")?;
        Ok(())
    }

    fn view_all(&mut self, store: &Store) -> Step {
        if store.all_tasks().next().is_none() {
            self.console.say("There are no tasks yet.")?;
        }
        for task in store.all_tasks() {
            self.display_task(task)?;
        }
        Ok(())
    }

    fn view_completed(&mut self, store: &Store) -> Step {
        let mut found = false;
        for task in store.all_tasks().filter(|t| t.completed) {
            self.display_task(task)?;
            found = true;
        }
        if !found {
            self.console.say("No completed tasks found.")?;
        }
        Ok(())
    }

    /// Lists the user's tasks by number and lets them complete or edit one.
    fn view_mine(&mut self, store: &mut Store) -> Step {
        loop {
            let mine: Vec<Listed> = store
                .positioned_tasks()
                .filter(|(_, t)| t.assigned_user == self.session.username)
                .map(|(index, t)| (index, t.clone()))
                .collect();
            if mine.is_empty() {
                self.console.say("You have no tasks assigned.")?;
                return Ok(());
            }
            self.list_tasks(&mine)?;

            let Some(choice) = self.console.prompt(
                "\nSelect what you would like to do:\n\
                 1 - Mark a task as complete\n\
                 2 - Edit a task\n\
                 x - Exit\n: ",
            )?
            else {
                return Ok(());
            };
            let result = match choice.trim() {
                "1" => self.complete_from(store, &mine),
                "2" => self.edit_from(store, &mine),
                _ => {
                    self.console.say("Invalid option. Please choose 1, 2, or x.")?;
                    Ok(())
                }
            };
            match result {
                Err(Interrupt::Task(err)) => self.console.say(format!("Error: {err}"))?,
                other => other?,
            }
        }
    }

    fn complete_from(&mut self, store: &mut Store, tasks: &[Listed]) -> Step {
        let Some((index, task)) = self.pick_task(tasks)? else {
            return Ok(());
        };
        if task.completed {
            self.console.say("This task is already marked as complete.")?;
            return Ok(());
        }
        operations::complete_task_at(store, index)?;
        self.console.say("Task marked as complete.")?;
        Ok(())
    }

    fn edit_from(&mut self, store: &mut Store, tasks: &[Listed]) -> Step {
        let Some((index, task)) = self.pick_task(tasks)? else {
            return Ok(());
        };
        if task.completed {
            return Err(TaskError::ImmutableState {
                title: task.title.clone(),
            }
            .into());
        }

        let Some(choice) = self.console.prompt(
            "\nWhat would you like to edit?\n\
             1 - Username assigned to task\n\
             2 - Due date\n\
             x - Cancel\n: ",
        )?
        else {
            return Ok(());
        };
        let edit = match choice.trim() {
            "1" => {
                let Some(new_user) = self.console.prompt("Enter the new username: ")? else {
                    return Ok(());
                };
                let new_user = new_user.trim().to_string();
                if new_user == task.assigned_user {
                    self.console.say(format!(
                        "The task is already assigned to '{new_user}'. No changes made."
                    ))?;
                    return Ok(());
                }
                TaskEdit {
                    assigned_user: Some(new_user),
                    due_date: None,
                }
            }
            "2" => {
                let Some(due) = self.prompt_date("Enter the new due date (DD MMM YYYY): ")? else {
                    return Ok(());
                };
                TaskEdit {
                    assigned_user: None,
                    due_date: Some(due),
                }
            }
            _ => {
                self.console.say("Invalid option. Please enter 1, 2, or x.")?;
                return Ok(());
            }
        };

        let changed_user = edit.assigned_user.is_some();
        operations::edit_task_at(store, index, edit)?;
        self.console.say(if changed_user {
            "Username updated."
        } else {
            "Due date updated."
        })?;
        Ok(())
    }

    fn delete_task(&mut self, store: &mut Store) -> Step {
        let tasks: Vec<Listed> = store
            .positioned_tasks()
            .map(|(index, t)| (index, t.clone()))
            .collect();
        if tasks.is_empty() {
            self.console.say("No tasks available to delete.")?;
            return Ok(());
        }
        self.console.say("\nAll Tasks:")?;
        self.list_tasks(&tasks)?;
        let Some((index, task)) = self.pick_task(&tasks)? else {
            return Ok(());
        };

        self.console.say("\nYou are about to delete the following task:")?;
        self.display_task(&task)?;
        loop {
            let Some(answer) = self
                .console
                .ask("Are you sure you want to delete this task? (yes/no): ")?
            else {
                return Ok(());
            };
            match answer.trim().to_lowercase().as_str() {
                "yes" => {
                    operations::delete_task_at(store, index, self.session.is_admin)?;
                    self.console.say("Task deleted successfully.")?;
                    return Ok(());
                }
                "no" => {
                    self.console.say("Task deletion cancelled.")?;
                    return Ok(());
                }
                _ => self.console.say("Invalid input. Please type 'yes' or 'no'")?,
            }
        }
    }

    fn display_statistics(&mut self, store: &Store, today: NaiveDate) -> Step {
        let (task_overview, user_overview) =
            report::read_reports(store, &self.config.report_paths(), today)?;
        self.console.say("\n====== Task Overview ======\n")?;
        self.console.say(task_overview)?;
        self.console.say("\n====== User Overview ======\n")?;
        self.console.say(user_overview)?;
        Ok(())
    }

    fn list_tasks(&mut self, tasks: &[Listed]) -> io::Result<()> {
        for (number, (_, task)) in tasks.iter().enumerate() {
            self.console.say(format!("\nTask Number: {}", number + 1))?;
            self.display_task(task)?;
        }
        Ok(())
    }

    /// Asks for a 1-based task number until it is valid.
    fn pick_task(&mut self, tasks: &[Listed]) -> Step<Option<Listed>> {
        loop {
            let Some(answer) = self
                .console
                .prompt("Enter the task number (or 'x' to cancel): ")?
            else {
                return Ok(None);
            };
            match answer.trim().parse::<usize>() {
                Ok(number) if number >= 1 && number <= tasks.len() => {
                    return Ok(Some(tasks[number - 1].clone()));
                }
                Ok(_) => self.console.say("Invalid task number. Please try again.")?,
                Err(_) => self.console.say("Invalid input. Please enter a number.")?,
            }
        }
    }

    fn prompt_date(&mut self, message: &str) -> Step<Option<NaiveDate>> {
        loop {
            let Some(answer) = self.console.prompt(message)? else {
                return Ok(None);
            };
            match codec::parse_date(&answer) {
                Ok(date) => return Ok(Some(date)),
                Err(_) => self
                    .console
                    .say("Invalid date format. Please enter the date in DD MMM YYYY format.")?,
            }
        }
    }

    fn display_task(&mut self, task: &Task) -> io::Result<()> {
        let rule = "─".repeat(RULE_WIDTH);
        self.console.say(&rule)?;
        self.console.say(format!("Task:\t\t  {}", task.title))?;
        self.console.say(format!("Assigned to:\t  {}", task.assigned_user))?;
        self.console
            .say(format!("Date assigned:\t  {}", codec::format_date(task.assigned_date)))?;
        self.console.say(format!("Due date:\t  {}", codec::format_date(task.due_date)))?;
        self.console.say(format!(
            "Task Complete?\t  {}",
            if task.completed { "Yes" } else { "No" }
        ))?;
        self.console.say("Task description:")?;
        self.console.say(format!("  {}", task.description))?;
        self.console.say(&rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorePaths;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        config: Config,
        store: Store,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().expect("tempdir");
        let config = Config::default().rooted_at(tmp.path());
        std::fs::write(&config.users_file, "admin, admin\nbob, pw\n").unwrap();
        std::fs::write(
            &config.tasks_file,
            "bob, Report, desc, 01 Jan 2024, 10 Jan 2024, No\n",
        )
        .unwrap();
        let store = Store::load(StorePaths {
            users: config.users_file.clone(),
            tasks: config.tasks_file.clone(),
        })
        .unwrap();
        Fixture {
            _tmp: tmp,
            config,
            store,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    /// Logs in with the first two script lines, then runs menu steps until exit.
    fn run_script(fx: &mut Fixture, script: &str) -> String {
        let console = Console::new(script.as_bytes(), Vec::new());
        let Some(mut menu) = Menu::login(&fx.store, &fx.config, console).unwrap() else {
            panic!("login did not succeed");
        };
        while menu.step(&mut fx.store, today()).unwrap() != Flow::Exit {}
        String::from_utf8(menu.into_console().into_output()).unwrap()
    }

    #[test]
    fn login_retries_until_credentials_match() {
        let fx = fixture();
        let console = Console::new("bob\nwrong\nbob\npw\n".as_bytes(), Vec::new());
        let menu = Menu::login(&fx.store, &fx.config, console).unwrap().unwrap();
        assert_eq!(menu.session().username, "bob");
        assert!(!menu.session().is_admin);
        let out = String::from_utf8(menu.into_console().into_output()).unwrap();
        assert!(out.contains("incorrect username or password. Please try again."));
        assert!(out.contains("Welcome bob!"));
    }

    #[test]
    fn login_gives_up_at_end_of_input() {
        let fx = fixture();
        let console = Console::new("bob\n".as_bytes(), Vec::new());
        assert!(Menu::login(&fx.store, &fx.config, console).unwrap().is_none());
    }

    #[test]
    fn admin_registers_and_adds_task() {
        let mut fx = fixture();
        let out = run_script(
            &mut fx,
            "admin\nadmin\n\
             r\ncarol\nsecret\nsecret\n\
             a\ncarol\nPlan\nPlan the sprint\nnot a date\n20 Jan 2024\n\
             e\n",
        );
        assert!(out.contains("User 'carol' registered successfully."));
        assert!(out.contains("Invalid date format."));
        assert!(out.contains("Task added successfully."));
        let task = fx.store.tasks_for_user("carol").next().unwrap();
        assert_eq!(task.title, "Plan");
        assert_eq!(task.assigned_date, today());
    }

    #[test]
    fn errors_are_shown_and_menu_continues() {
        let mut fx = fixture();
        let out = run_script(
            &mut fx,
            "admin\nadmin\n\
             a\ncharlie\nPlan\ndesc\n20 Jan 2024\n\
             a\nbob\nPlan\ndesc\n01 Jan 2024\n\
             e\n",
        );
        assert!(out.contains("Error: user 'charlie' does not exist"));
        assert!(out.contains(
            "Error: due date 01 Jan 2024 is before the assigned date 05 Jan 2024"
        ));
        assert_eq!(fx.store.all_tasks().count(), 1);
    }

    #[test]
    fn regular_user_cannot_reach_admin_options() {
        let mut fx = fixture();
        let out = run_script(&mut fx, "bob\npw\nr\ndel\ngr\ne\n");
        assert_eq!(out.matches("You have entered an invalid input").count(), 3);
        assert!(!out.contains("r - register a user"));
        assert!(!fx.config.task_overview_file.exists());
    }

    #[test]
    fn view_mine_completes_then_refuses_edit() {
        let mut fx = fixture();
        let out = run_script(
            &mut fx,
            "bob\npw\n\
             vm\n1\n1\n2\n1\nx\n\
             e\n",
        );
        assert!(out.contains("Task Number: 1"));
        assert!(out.contains("Task marked as complete."));
        assert!(out.contains("Error: task 'Report' is already completed and cannot be edited"));
        assert!(fx.store.all_tasks().all(|t| t.completed));
    }

    #[test]
    fn view_mine_reassigns_task() {
        let mut fx = fixture();
        let out = run_script(&mut fx, "bob\npw\nvm\n2\n1\n1\nadmin\ne\n");
        assert!(out.contains("Username updated."));
        assert!(out.contains("You have no tasks assigned."));
        assert_eq!(fx.store.tasks_for_user("admin").count(), 1);
    }

    #[test]
    fn cancel_leaves_store_untouched() {
        let mut fx = fixture();
        let out = run_script(&mut fx, "admin\nadmin\na\nbob\nx\ne\n");
        assert!(out.contains("Operation cancelled."));
        assert_eq!(fx.store.all_tasks().count(), 1);
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let mut fx = fixture();
        let out = run_script(&mut fx, "admin\nadmin\ndel\n3\n1\nmaybe\nno\ndel\n1\nyes\ne\n");
        assert!(out.contains("Invalid task number."));
        assert!(out.contains("Task deletion cancelled."));
        assert!(out.contains("Task deleted successfully."));
        assert_eq!(fx.store.all_tasks().count(), 0);
    }

    #[test]
    fn statistics_generate_missing_reports() {
        let mut fx = fixture();
        let out = run_script(&mut fx, "admin\nadmin\nds\ne\n");
        assert!(out.contains("====== Task Overview ======"));
        assert!(out.contains("Total tasks: 1"));
        assert!(out.contains("User: bob"));
        assert!(fx.config.user_overview_file.exists());
    }

    #[test]
    fn board_choice_is_handed_back() {
        let mut fx = fixture();
        let console = Console::new("bob\npw\nvb\n".as_bytes(), Vec::new());
        let mut menu = Menu::login(&fx.store, &fx.config, console).unwrap().unwrap();
        assert_eq!(menu.step(&mut fx.store, today()).unwrap(), Flow::Board);
        assert_eq!(menu.step(&mut fx.store, today()).unwrap(), Flow::Exit);
    }

    /// Two tasks share a title and assignee; only the chosen one may change.
    fn namesake_fixture() -> Fixture {
        let fx = fixture();
        std::fs::write(
            &fx.config.tasks_file,
            "bob, Weekly, sync, 01 Jan 2024, 10 Jan 2024, Yes\n\
             bob, Weekly, sync, 01 Jan 2024, 10 Jan 2024, No\n",
        )
        .unwrap();
        let store = Store::load(fx.config.store_paths()).unwrap();
        Fixture { store, ..fx }
    }

    #[test]
    fn delete_by_number_removes_one_namesake() {
        let mut fx = namesake_fixture();
        let out = run_script(&mut fx, "admin\nadmin\ndel\n1\nyes\ne\n");
        assert!(out.contains("Task deleted successfully."));
        let left: Vec<_> = fx.store.all_tasks().collect();
        assert_eq!(left.len(), 1);
        assert!(!left[0].completed);
    }

    #[test]
    fn edit_by_number_ignores_completed_namesake() {
        let mut fx = namesake_fixture();
        let out = run_script(&mut fx, "bob\npw\nvm\n2\n2\n1\nadmin\nx\ne\n");
        assert!(out.contains("Username updated."));
        let owners: Vec<_> = fx.store.all_tasks().map(|t| t.assigned_user.as_str()).collect();
        assert_eq!(owners, ["bob", "admin"]);
    }

    #[test]
    fn completing_by_number_touches_only_that_task() {
        let mut fx = fixture();
        std::fs::write(
            &fx.config.tasks_file,
            "bob, Weekly, sync, 01 Jan 2024, 10 Jan 2024, No\n\
             bob, Weekly, sync, 01 Jan 2024, 10 Jan 2024, No\n",
        )
        .unwrap();
        fx.store = Store::load(fx.config.store_paths()).unwrap();

        let out = run_script(&mut fx, "bob\npw\nvm\n1\n2\nx\ne\n");
        assert!(out.contains("Task marked as complete."));
        let flags: Vec<_> = fx.store.all_tasks().map(|t| t.completed).collect();
        assert_eq!(flags, [false, true]);
    }
}
