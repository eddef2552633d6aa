// Persistence of the task list
// Every operation reads the whole list, applies one change and writes the whole list back
use parking_lot::Mutex;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::error::{StoreError, StoreResult};
use crate::app::identity::{Clock, IdPolicy, SystemClock};
use crate::app::models::{Task, TaskId};

// Where the task list physically lives
pub trait TaskBackend: Send + Sync {
    // Create an empty list if nothing is stored yet
    fn initialize(&self) -> StoreResult<()>;
    fn load(&self) -> StoreResult<Vec<Task>>;
    fn save(&self, tasks: &[Task]) -> StoreResult<()>;
}

// A single JSON array in one file
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileBackend {
        JsonFileBackend { path: path.into() }
    }
}

impl TaskBackend for JsonFileBackend {
    fn initialize(&self) -> StoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        fs::write(&self.path, "[]").map_err(StoreError::write)
    }

    fn load(&self) -> StoreResult<Vec<Task>> {
        let data = fs::read_to_string(&self.path).map_err(StoreError::read)?;
        serde_json::from_str(&data).map_err(StoreError::read)
    }

    fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let data = serde_json::to_string_pretty(tasks).map_err(StoreError::write)?;
        fs::write(&self.path, data).map_err(StoreError::write)
    }
}

// Keeps the list in process memory; mostly useful for tests
#[derive(Default)]
pub struct MemoryBackend {
    tasks: Mutex<Vec<Task>>,
}

impl TaskBackend for MemoryBackend {
    fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    fn load(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tasks.lock().clone())
    }

    fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        *self.tasks.lock() = tasks.to_vec();
        Ok(())
    }
}

// Embedded SQLite database. Rows keep the list order through the Position column.
// Based on https://github.com/rusqlite/rusqlite/blob/master/examples/persons/main.rs
pub struct SqliteBackend {
    db_con: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<SqliteBackend> {
        let db_con = Connection::open(path).map_err(StoreError::read)?;
        Ok(SqliteBackend::with_connection(db_con))
    }

    pub fn with_connection(db_con: Connection) -> SqliteBackend {
        SqliteBackend {
            db_con: Mutex::new(db_con),
        }
    }
}

impl TaskBackend for SqliteBackend {
    fn initialize(&self) -> StoreResult<()> {
        self.db_con
            .lock()
            .execute(
                "CREATE TABLE IF NOT EXISTS task_item (
                Position INTEGER PRIMARY KEY,
                Id INTEGER NOT NULL,
                Text TEXT NOT NULL,
                Completed TINYINT NOT NULL
            );",
                (),
            )
            .map_err(StoreError::write)?;
        Ok(())
    }

    fn load(&self) -> StoreResult<Vec<Task>> {
        let db_con = self.db_con.lock();
        let mut stmt = db_con
            .prepare("SELECT Id, Text, Completed FROM task_item ORDER BY Position")
            .map_err(StoreError::read)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Task {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    completed: row.get(2)?,
                })
            })
            .map_err(StoreError::read)?;

        let tasks = rows
            .collect::<Result<Vec<Task>, _>>()
            .map_err(StoreError::read)?;
        Ok(tasks)
    }

    fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let mut db_con = self.db_con.lock();
        let tx = db_con.transaction().map_err(StoreError::write)?;
        tx.execute("DELETE FROM task_item;", ())
            .map_err(StoreError::write)?;
        for (position, task) in tasks.iter().enumerate() {
            tx.execute(
                "INSERT INTO task_item (Position, Id, Text, Completed) VALUES (?1, ?2, ?3, ?4);",
                (position as i64, task.id, &task.text, task.completed),
            )
            .map_err(StoreError::write)?;
        }
        tx.commit().map_err(StoreError::write)
    }
}

pub struct Storage {
    backend: Box<dyn TaskBackend>,
    clock: Box<dyn Clock>,
    id_policy: IdPolicy,
    // Held for the whole read-modify-write cycle. None reproduces the lost-update race.
    gate: Option<Mutex<()>>,
}

impl Storage {
    pub fn new(backend: impl TaskBackend + 'static) -> Storage {
        Storage {
            backend: Box::new(backend),
            clock: Box::new(SystemClock),
            id_policy: IdPolicy::Monotonic,
            gate: Some(Mutex::new(())),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Storage {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_id_policy(mut self, id_policy: IdPolicy) -> Storage {
        self.id_policy = id_policy;
        self
    }

    pub fn serialized(mut self, serialized: bool) -> Storage {
        self.gate = serialized.then(|| Mutex::new(()));
        self
    }

    // Make sure there is a list to read from
    pub fn open(self) -> StoreResult<Storage> {
        self.backend.initialize()?;
        Ok(self)
    }

    fn exclusive<T>(&self, operation: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.gate.as_ref().map(|gate| gate.lock());
        operation()
    }

    // READ
    pub fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.exclusive(|| self.backend.load())
    }

    // CREATE
    pub fn create_task(&self, text: &str) -> StoreResult<Task> {
        self.exclusive(|| {
            let mut tasks = self.backend.load()?;
            let id = self
                .id_policy
                .assign(self.clock.now_millis(), &tasks)
                .ok_or_else(|| StoreError::write("no task id left above the highest stored id"))?;
            let task = Task::new(id, text);
            tasks.push(task.clone());
            self.backend.save(&tasks)?;
            debug!(id, total = tasks.len(), "task created");
            Ok(task)
        })
    }

    // UPDATE
    pub fn set_completed(&self, id: TaskId, completed: bool) -> StoreResult<Task> {
        self.exclusive(|| {
            let mut tasks = self.backend.load()?;
            let task = match tasks.iter_mut().find(|task| task.id == id) {
                Some(task) => {
                    task.completed = completed;
                    task.clone()
                }
                None => return Err(StoreError::TaskNotFound(id)),
            };
            self.backend.save(&tasks)?;
            debug!(id, completed, "task updated");
            Ok(task)
        })
    }

    // DELETE
    pub fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        self.exclusive(|| {
            let mut tasks = self.backend.load()?;
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            self.backend.save(&tasks)?;
            debug!(id, removed = before - tasks.len(), "task deleted");
            Ok(())
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ProbeBackend;
    use super::*;
    use crate::app::identity::FixedClock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;

    fn json_storage(dir: &tempfile::TempDir) -> Storage {
        Storage::new(JsonFileBackend::new(dir.path().join("tasks.json")))
            .with_clock(FixedClock::at(1_700_000_000_000))
            .open()
            .expect("open storage")
    }

    #[test]
    fn open_creates_an_empty_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);

        let content = fs::read_to_string(dir.path().join("tasks.json")).unwrap();
        assert_eq!(content, "[]");
        assert_eq!(storage.list_tasks().unwrap(), vec![]);
    }

    #[test]
    fn open_leaves_an_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"[{"id":7,"text":"kept","completed":true}]"#).unwrap();

        let storage = Storage::new(JsonFileBackend::new(&path)).open().unwrap();
        let mut kept = Task::new(7, "kept");
        kept.completed = true;
        assert_eq!(storage.list_tasks().unwrap(), vec![kept]);
    }

    #[test]
    fn create_returns_a_fresh_uncompleted_task() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);
        let existing = storage.create_task("walk the dog").unwrap();

        let task = storage.create_task("buy milk").unwrap();
        assert_eq!(task.text, "buy milk");
        assert!(!task.completed);
        assert_ne!(task.id, existing.id);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);
        let a = storage.create_task("a").unwrap();
        let b = storage.create_task("b").unwrap();

        assert_eq!(storage.list_tasks().unwrap(), vec![a, b]);
    }

    #[test]
    fn list_reports_corrupt_or_missing_files_as_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let storage = Storage::new(JsonFileBackend::new(&path));
        assert!(matches!(
            storage.list_tasks(),
            Err(StoreError::StorageRead(_))
        ));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            storage.list_tasks(),
            Err(StoreError::StorageRead(_))
        ));
    }

    #[test]
    fn ids_stay_distinct_within_one_millisecond_under_monotonic_policy() {
        let storage = Storage::new(MemoryBackend::default())
            .with_clock(FixedClock::at(1_000))
            .with_id_policy(IdPolicy::Monotonic);

        let ids: Vec<TaskId> = (0..5)
            .map(|i| storage.create_task(&format!("task {i}")).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1_000, 1_001, 1_002, 1_003, 1_004]);
    }

    #[test]
    fn create_after_the_largest_id_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let stored = r#"[{"id":9223372036854775807,"text":"x","completed":false}]"#;
        fs::write(&path, stored).unwrap();
        let storage = Storage::new(JsonFileBackend::new(&path)).open().unwrap();

        assert!(matches!(
            storage.create_task("y"),
            Err(StoreError::StorageWrite(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), stored);
    }

    #[test]
    fn timestamp_policy_collides_within_one_millisecond() {
        let clock = Arc::new(FixedClock::at(1_000));
        let storage = Storage::new(MemoryBackend::default())
            .with_clock(ClockHandle(clock.clone()))
            .with_id_policy(IdPolicy::Timestamp);

        let first = storage.create_task("first").unwrap();
        let second = storage.create_task("second").unwrap();
        assert_eq!(first.id, second.id);

        clock.advance(1);
        let third = storage.create_task("third").unwrap();
        assert_eq!(third.id, 1_001);
    }

    struct ClockHandle(Arc<FixedClock>);

    impl Clock for ClockHandle {
        fn now_millis(&self) -> TaskId {
            self.0.now_millis()
        }
    }

    #[test]
    fn set_completed_changes_only_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);
        let a = storage.create_task("a").unwrap();
        let b = storage.create_task("b").unwrap();

        let updated = storage.set_completed(a.id, true).unwrap();
        assert!(updated.completed);

        let tasks = storage.list_tasks().unwrap();
        assert_eq!(tasks[0], Task { completed: true, ..a });
        assert_eq!(tasks[1], b);
    }

    #[test]
    fn set_completed_on_unknown_id_does_not_write() {
        let backend = Arc::new(ProbeBackend::default());
        let storage = Storage::new(backend.clone());
        storage.create_task("a").unwrap();
        let before = storage.list_tasks().unwrap();
        let saves = backend.saves.load(Ordering::SeqCst);

        let result = storage.set_completed(404, true);
        assert!(matches!(result, Err(StoreError::TaskNotFound(404))));
        assert_eq!(backend.saves.load(Ordering::SeqCst), saves);
        assert_eq!(storage.list_tasks().unwrap(), before);
    }

    #[test]
    fn delete_unknown_id_succeeds_and_keeps_the_list() {
        let backend = Arc::new(ProbeBackend::default());
        let storage = Storage::new(backend.clone());
        storage.create_task("a").unwrap();
        let before = storage.list_tasks().unwrap();

        storage.delete_task(12345).unwrap();
        assert_eq!(storage.list_tasks().unwrap(), before);
        // the list is rewritten even when nothing was removed
        assert_eq!(backend.saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delete_removes_the_task_permanently() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);
        let a = storage.create_task("a").unwrap();
        let b = storage.create_task("b").unwrap();

        storage.delete_task(a.id).unwrap();
        assert_eq!(storage.list_tasks().unwrap(), vec![b]);
    }

    #[test]
    fn failed_write_keeps_the_previous_list() {
        let backend = Arc::new(ProbeBackend::default());
        let storage = Storage::new(backend.clone());
        let a = storage.create_task("a").unwrap();

        backend.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            storage.create_task("b"),
            Err(StoreError::StorageWrite(_))
        ));
        assert!(matches!(
            storage.set_completed(a.id, true),
            Err(StoreError::StorageWrite(_))
        ));
        assert!(matches!(
            storage.delete_task(a.id),
            Err(StoreError::StorageWrite(_))
        ));
        assert_eq!(storage.list_tasks().unwrap(), vec![a]);
    }

    #[test]
    fn json_file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = json_storage(&dir);
        storage.create_task("a").unwrap();

        let content = fs::read_to_string(dir.path().join("tasks.json")).unwrap();
        assert!(content.starts_with("[\n  {\n    \"id\": 1700000000000,"));
    }

    #[test]
    fn unserialized_storage_loses_interleaved_updates() {
        let backend = Arc::new(ProbeBackend::with_rendezvous(2));
        let storage = Arc::new(Storage::new(backend).serialized(false));

        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|text| {
                let storage = storage.clone();
                thread::spawn(move || storage.create_task(text).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // both requests read the empty list before either wrote
        assert_eq!(storage.list_tasks().unwrap().len(), 1);
    }

    #[test]
    fn serialized_storage_keeps_every_concurrent_create() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(json_storage(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                thread::spawn(move || storage.create_task(&format!("task {i}")).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tasks = storage.list_tasks().unwrap();
        assert_eq!(tasks.len(), 8);
        let mut ids: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn sqlite_backend_keeps_order_and_duplicate_ids() {
        let backend = SqliteBackend::with_connection(Connection::open_in_memory().unwrap());
        let storage = Storage::new(backend)
            .with_clock(FixedClock::at(5))
            .with_id_policy(IdPolicy::Timestamp)
            .open()
            .unwrap();

        let b = storage.create_task("b").unwrap();
        let a = storage.create_task("a").unwrap();
        storage.set_completed(5, true).unwrap();

        let tasks = storage.list_tasks().unwrap();
        assert_eq!(tasks, vec![Task { completed: true, ..b }, a]);
    }

    #[test]
    fn sqlite_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let created = {
            let storage = Storage::new(SqliteBackend::open(&path).unwrap())
                .open()
                .unwrap();
            storage.create_task("persisted").unwrap()
        };

        let storage = Storage::new(SqliteBackend::open(&path).unwrap())
            .open()
            .unwrap();
        assert_eq!(storage.list_tasks().unwrap(), vec![created]);
    }
}
