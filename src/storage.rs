use crate::models::{Entry, User, UserDb};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::error;

const USERS_FILE: &str = "users.json";
const ENTRIES_DIR: &str = "entries";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode users: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode entries: {0}")]
    Csv(#[from] csv::Error),
    #[error("username '{0}' is already taken")]
    UserExists(String),
    #[error("user '{0}' not found")]
    UserNotFound(String),
}

/// Persistence for users and their entry logs.
///
/// Reads never fail: unreadable or malformed data is logged and treated as
/// empty. Writes rewrite the affected document wholesale.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, username: &str) -> Option<User>;

    async fn list_users(&self) -> Vec<User>;

    /// Fails with [`StoreError::UserExists`] when the username is taken,
    /// ignoring ASCII case since usernames also name files.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// Fails with [`StoreError::UserNotFound`] when there is nothing to replace.
    async fn update_user(&self, user: User) -> Result<(), StoreError>;

    async fn delete_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn load_entries(&self, username: &str) -> Vec<Entry>;

    async fn append_entry(&self, username: &str, entry: Entry) -> Result<(), StoreError>;

    /// Hands every entry of `from` over to `to` and returns how many moved.
    async fn move_entries(&self, from: &str, to: &str) -> Result<usize, StoreError>;

    async fn delete_entries(&self, username: &str) -> Result<(), StoreError>;
}

/// `users.json` plus one CSV file per user under `entries/`.
pub struct FileStore {
    users_path: PathBuf,
    entries_dir: PathBuf,
}

impl FileStore {
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let entries_dir = data_dir.join(ENTRIES_DIR);
        fs::create_dir_all(&entries_dir).await?;
        Ok(Self {
            users_path: data_dir.join(USERS_FILE),
            entries_dir,
        })
    }

    fn entries_path(&self, username: &str) -> PathBuf {
        self.entries_dir.join(format!("{username}.csv"))
    }

    async fn load_db(&self) -> UserDb {
        match fs::read(&self.users_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(db) => db,
                Err(err) => {
                    error!("failed to parse users file: {err}");
                    UserDb::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => UserDb::default(),
            Err(err) => {
                error!("failed to read users file: {err}");
                UserDb::default()
            }
        }
    }

    async fn persist_db(&self, db: &UserDb) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(db)?;
        write_replace(&self.users_path, &payload).await
    }

    async fn persist_entries(&self, username: &str, entries: &[Entry]) -> Result<(), StoreError> {
        let payload = entries_to_csv(entries)?;
        write_replace(&self.entries_path(username), &payload).await
    }
}

/// Writes to a sibling temp file and renames it over `path`, so readers only
/// ever see the old or the new document.
async fn write_replace(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    let suffix: [u8; 6] = rand::random();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".tmp-{}", hex::encode(suffix)));
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, payload).await?;
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn get_user(&self, username: &str) -> Option<User> {
        self.load_db().await.users.remove(username)
    }

    async fn list_users(&self) -> Vec<User> {
        self.load_db().await.users.into_values().collect()
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut db = self.load_db().await;
        if db.is_taken(&user.username) {
            return Err(StoreError::UserExists(user.username));
        }
        db.users.insert(user.username.clone(), user);
        self.persist_db(&db).await
    }

    async fn update_user(&self, user: User) -> Result<(), StoreError> {
        let mut db = self.load_db().await;
        match db.users.get_mut(&user.username) {
            Some(existing) => *existing = user,
            None => return Err(StoreError::UserNotFound(user.username)),
        }
        self.persist_db(&db).await
    }

    async fn delete_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let mut db = self.load_db().await;
        let removed = db.users.remove(username);
        if removed.is_some() {
            self.persist_db(&db).await?;
        }
        Ok(removed)
    }

    async fn load_entries(&self, username: &str) -> Vec<Entry> {
        let path = self.entries_path(username);
        match fs::read(&path).await {
            Ok(bytes) => match entries_from_csv(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    error!("failed to parse entries for {username}: {err}");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                error!("failed to read entries for {username}: {err}");
                Vec::new()
            }
        }
    }

    async fn append_entry(&self, username: &str, entry: Entry) -> Result<(), StoreError> {
        let mut entries = self.load_entries(username).await;
        entries.push(entry);
        self.persist_entries(username, &entries).await
    }

    async fn move_entries(&self, from: &str, to: &str) -> Result<usize, StoreError> {
        let source = self.entries_path(from);
        if !fs::try_exists(&source).await? {
            return Ok(0);
        }

        let moved = self.load_entries(from).await;
        let target = self.entries_path(to);
        if fs::try_exists(&target).await? {
            let mut merged = self.load_entries(to).await;
            merged.extend(moved.iter().cloned());
            self.persist_entries(to, &merged).await?;
            fs::remove_file(&source).await?;
        } else {
            fs::rename(&source, &target).await?;
        }
        Ok(moved.len())
    }

    async fn delete_entries(&self, username: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.entries_path(username)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store, used by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    db: UserDb,
    entries: HashMap<String, Vec<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, username: &str) -> Option<User> {
        self.inner.lock().await.db.users.get(username).cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        self.inner.lock().await.db.users.values().cloned().collect()
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut data = self.inner.lock().await;
        if data.db.is_taken(&user.username) {
            return Err(StoreError::UserExists(user.username));
        }
        data.db.users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> Result<(), StoreError> {
        let mut data = self.inner.lock().await;
        match data.db.users.get_mut(&user.username) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(StoreError::UserNotFound(user.username)),
        }
    }

    async fn delete_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.db.users.remove(username))
    }

    async fn load_entries(&self, username: &str) -> Vec<Entry> {
        self.inner
            .lock()
            .await
            .entries
            .get(username)
            .cloned()
            .unwrap_or_default()
    }

    async fn append_entry(&self, username: &str, entry: Entry) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .entries
            .entry(username.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn move_entries(&self, from: &str, to: &str) -> Result<usize, StoreError> {
        let mut data = self.inner.lock().await;
        let moved = data.entries.remove(from).unwrap_or_default();
        let count = moved.len();
        if count > 0 {
            data.entries.entry(to.to_string()).or_default().extend(moved);
        }
        Ok(count)
    }

    async fn delete_entries(&self, username: &str) -> Result<(), StoreError> {
        self.inner.lock().await.entries.remove(username);
        Ok(())
    }
}

/// Encodes entries as CSV with a header row.
pub fn entries_to_csv(entries: &[Entry]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer.serialize(entry)?;
    }
    if entries.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    writer
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

fn entries_from_csv(bytes: &[u8]) -> Result<Vec<Entry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader.deserialize().collect()
}

const CSV_HEADER: [&str; 9] = [
    "timestamp",
    "date",
    "entry_type",
    "miles",
    "shower_minutes",
    "plastic_bottles",
    "takeout_meals",
    "laundry_loads",
    "co2_saved",
];
