use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::codec::{self, FormatError};
use crate::error::{Result, TaskError};
use crate::task::{Task, User};

/// Where the store reads and flushes its records.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub users: PathBuf,
    pub tasks: PathBuf,
}

/// In-memory users and tasks for one session, flushed to disk on every change.
///
/// A task's position is its line in the tasks file, starting at 0. If a flush
/// fails the change is undone, so memory never runs ahead of disk.
#[derive(Debug)]
pub struct Store {
    paths: StorePaths,
    users: Vec<User>,
    tasks: Vec<Task>,
}

impl Store {
    /// Loads both backing files. A missing file means "no data yet".
    pub fn load(paths: StorePaths) -> Result<Self> {
        let users = read_records(&paths.users, codec::decode_user)?;
        let tasks = read_records(&paths.tasks, codec::decode_task)?;
        tracing::debug!(
            users = users.len(),
            tasks = tasks.len(),
            "loaded store from {} and {}",
            paths.users.display(),
            paths.tasks.display()
        );
        Ok(Self { paths, users, tasks })
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn user_exists(&self, username: &str) -> bool {
        self.find_user(username).is_some()
    }

    pub fn add_user(&mut self, user: User) -> Result<()> {
        if self.user_exists(&user.username) {
            return Err(TaskError::DuplicateUser(user.username));
        }
        self.users.push(user);
        self.commit(|store| {
            store.users.pop();
        })
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Tasks paired with their positions, in file order.
    pub fn positioned_tasks(&self) -> impl Iterator<Item = (usize, &Task)> {
        self.tasks.iter().enumerate()
    }

    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn tasks_for_user<'a>(
        &'a self,
        username: &'a str,
    ) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.assigned_user == username)
    }

    pub fn add_task(&mut self, task: Task) -> Result<()> {
        self.tasks.push(task);
        self.commit(|store| {
            store.tasks.pop();
        })
    }

    /// Applies `mutator` to every task matching `predicate` and returns how many it touched.
    pub fn update_tasks<P, M>(&mut self, predicate: P, mut mutator: M) -> Result<usize>
    where
        P: Fn(&Task) -> bool,
        M: FnMut(&mut Task),
    {
        let before = self.tasks.clone();
        let mut count = 0;
        for task in self.tasks.iter_mut().filter(|t| predicate(t)) {
            mutator(task);
            count += 1;
        }
        if count > 0 {
            self.commit(move |store| store.tasks = before)?;
        }
        Ok(count)
    }

    pub fn update_task_at<M>(&mut self, index: usize, mutator: M) -> Result<()>
    where
        M: FnOnce(&mut Task),
    {
        let Some(task) = self.tasks.get_mut(index) else {
            return Err(TaskError::UnknownTask(index));
        };
        let before = task.clone();
        mutator(task);
        self.commit(move |store| {
            if let Some(slot) = store.tasks.get_mut(index) {
                *slot = before;
            }
        })
    }

    pub fn remove_task_at(&mut self, index: usize) -> Result<Task> {
        if index >= self.tasks.len() {
            return Err(TaskError::UnknownTask(index));
        }
        let removed = self.tasks.remove(index);
        let restore = removed.clone();
        self.commit(move |store| store.tasks.insert(index, restore))?;
        Ok(removed)
    }

    /// Rewrites both backing files from memory.
    pub fn flush(&self) -> Result<()> {
        write_records(&self.paths.users, self.users.iter().map(codec::encode_user))?;
        write_records(&self.paths.tasks, self.tasks.iter().map(codec::encode_task))?;
        tracing::debug!(
            users = self.users.len(),
            tasks = self.tasks.len(),
            "flushed store"
        );
        Ok(())
    }

    /// Flushes a change already applied in memory, running `undo` if the write fails.
    fn commit(&mut self, undo: impl FnOnce(&mut Self)) -> Result<()> {
        if let Err(err) = self.flush() {
            undo(self);
            tracing::warn!(error = %err, "flush failed, change rolled back");
            return Err(err);
        }
        Ok(())
    }
}

fn read_records<T>(
    path: &Path,
    decode: fn(&str) -> std::result::Result<T, FormatError>,
) -> Result<Vec<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::info!("{} does not exist yet, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(TaskError::io(path, err)),
    };

    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            decode(line).map_err(|source| TaskError::Format {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

fn write_records(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
    let mut data = String::new();
    for line in lines {
        data.push_str(&line);
        data.push('\n');
    }
    fs::write(path, data).map_err(|err| TaskError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn temp_paths() -> (TempDir, StorePaths) {
        let tmp = TempDir::new().expect("tempdir");
        let paths = StorePaths {
            users: tmp.path().join("user.txt"),
            tasks: tmp.path().join("tasks.txt"),
        };
        (tmp, paths)
    }

    /// Paths inside a subdirectory the test can delete to make flushes fail.
    fn removable_paths() -> (TempDir, PathBuf, StorePaths) {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("data");
        fs::create_dir(&dir).unwrap();
        let paths = StorePaths {
            users: dir.join("user.txt"),
            tasks: dir.join("tasks.txt"),
        };
        (tmp, dir, paths)
    }

    fn task(title: &str, user: &str) -> Task {
        Task {
            title: title.to_string(),
            description: "desc".to_string(),
            assigned_user: user.to_string(),
            assigned_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            completed: false,
        }
    }

    #[test]
    fn missing_files_load_empty() {
        let (_tmp, paths) = temp_paths();
        let store = Store::load(paths).unwrap();
        assert_eq!(store.users().count(), 0);
        assert_eq!(store.all_tasks().count(), 0);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (_tmp, paths) = temp_paths();
        fs::write(&paths.users, "admin, adm1n\n\nbob, pw\n").unwrap();
        let store = Store::load(paths).unwrap();
        let names: Vec<_> = store.users().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["admin", "bob"]);
    }

    #[test]
    fn malformed_line_reports_position() {
        let (_tmp, paths) = temp_paths();
        fs::write(
            &paths.tasks,
            "bob, A, desc, 01 Jan 2024, 10 Jan 2024, No\nbroken line\n",
        )
        .unwrap();
        match Store::load(paths) {
            Err(TaskError::Format { line, source, .. }) => {
                assert_eq!(line, 2);
                assert!(matches!(source, FormatError::FieldCount { .. }));
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn mutations_are_flushed_and_reloaded_in_order() {
        let (_tmp, paths) = temp_paths();
        let mut store = Store::load(paths.clone()).unwrap();
        store.add_user(User::new("bob", "pw")).unwrap();
        store.add_task(task("First", "bob")).unwrap();
        store.add_task(task("Second", "bob")).unwrap();

        let reloaded = Store::load(paths).unwrap();
        assert_eq!(reloaded.find_user("bob"), Some(&User::new("bob", "pw")));
        let titles: Vec<_> = reloaded.all_tasks().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[test]
    fn duplicate_user_is_rejected() {
        let (_tmp, paths) = temp_paths();
        let mut store = Store::load(paths).unwrap();
        store.add_user(User::new("bob", "pw")).unwrap();
        assert!(matches!(
            store.add_user(User::new("bob", "other")),
            Err(TaskError::DuplicateUser(name)) if name == "bob"
        ));
        assert_eq!(store.users().count(), 1);
    }

    #[test]
    fn update_tasks_counts_matches() {
        let (_tmp, paths) = temp_paths();
        let mut store = Store::load(paths.clone()).unwrap();
        store.add_task(task("A", "bob")).unwrap();
        store.add_task(task("B", "bob")).unwrap();
        store.add_task(task("A", "carol")).unwrap();

        let updated = store
            .update_tasks(|t| t.title == "A", |t| t.completed = true)
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(store.tasks_for_user("bob").filter(|t| t.completed).count(), 1);
        assert_eq!(store.update_tasks(|t| t.title == "Z", |_| {}).unwrap(), 0);

        let reloaded = Store::load(paths).unwrap();
        assert_eq!(reloaded.all_tasks().filter(|t| t.completed).count(), 2);
    }

    #[test]
    fn positional_changes_touch_one_task_among_namesakes() {
        let (_tmp, paths) = temp_paths();
        let mut store = Store::load(paths.clone()).unwrap();
        store.add_task(task("Weekly", "bob")).unwrap();
        store.add_task(task("Weekly", "bob")).unwrap();
        store.add_task(task("Weekly", "bob")).unwrap();

        store.update_task_at(1, |t| t.completed = true).unwrap();
        let flags: Vec<_> = store.all_tasks().map(|t| t.completed).collect();
        assert_eq!(flags, [false, true, false]);

        let removed = store.remove_task_at(0).unwrap();
        assert!(!removed.completed);
        let reloaded = Store::load(paths).unwrap();
        let flags: Vec<_> = reloaded.all_tasks().map(|t| t.completed).collect();
        assert_eq!(flags, [true, false]);
    }

    #[test]
    fn unknown_position_is_rejected() {
        let (_tmp, paths) = temp_paths();
        let mut store = Store::load(paths).unwrap();
        store.add_task(task("A", "bob")).unwrap();
        assert!(matches!(
            store.update_task_at(1, |t| t.completed = true),
            Err(TaskError::UnknownTask(1))
        ));
        assert!(matches!(store.remove_task_at(5), Err(TaskError::UnknownTask(5))));
        assert_eq!(store.all_tasks().count(), 1);
    }

    #[test]
    fn failed_flush_is_reported_and_rolled_back() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = StorePaths {
            users: tmp.path().join("missing-dir").join("user.txt"),
            tasks: tmp.path().join("tasks.txt"),
        };
        let mut store = Store::load(paths).unwrap();
        assert!(matches!(
            store.add_user(User::new("bob", "pw")),
            Err(TaskError::Io { .. })
        ));
        assert!(!store.user_exists("bob"));
        assert!(matches!(
            store.add_task(task("A", "bob")),
            Err(TaskError::Io { .. })
        ));
        assert_eq!(store.all_tasks().count(), 0);
    }

    #[test]
    fn failed_flush_restores_updated_and_removed_tasks() {
        let (_tmp, dir, paths) = removable_paths();
        let mut store = Store::load(paths).unwrap();
        store.add_task(task("A", "bob")).unwrap();
        store.add_task(task("B", "bob")).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert!(store.update_task_at(0, |t| t.completed = true).is_err());
        assert!(store.update_tasks(|_| true, |t| t.title.clear()).is_err());
        assert!(store.remove_task_at(0).is_err());

        let titles: Vec<_> = store.all_tasks().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
        assert!(store.all_tasks().all(|t| !t.completed));
    }
}
