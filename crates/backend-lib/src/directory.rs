// ============================
// userauth-backend/src/directory.rs
// ============================
//! User directory abstraction with flat-file and in-memory implementations.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::{fs as tokio_fs, sync::Mutex};
use userauth_common::User;
use uuid::Uuid;

/// File holding every user record, relative to the storage root
const USERS_FILE: &str = "users.json";

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("google account already linked")]
    GoogleIdTaken,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A user as the directory stores it, hash included.
/// Only the auth service ever sees the hash.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    #[serde(default, rename = "password", skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// Fields for a user the directory has not seen yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub fullname: String,
    pub img_url: Option<String>,
    pub is_admin: bool,
    pub google_id: Option<String>,
    pub email: Option<String>,
}

impl NewUser {
    fn into_record(self) -> UserRecord {
        UserRecord {
            user: User {
                id: Uuid::new_v4().simple().to_string(),
                username: self.username,
                fullname: self.fullname,
                img_url: self.img_url,
                is_admin: self.is_admin,
                google_id: self.google_id,
                email: self.email,
                created_at: Utc::now(),
            },
            password_hash: self.password_hash,
        }
    }
}

/// Authoritative store of user records.
///
/// Implementations must reject a second user with the same username or
/// Google subject on their own; the service's lookups are not atomic with
/// `add`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by login name
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Look a user up by Google subject identifier
    async fn get_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    /// Create a user and return the stored record
    async fn add(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError>;
}

fn insert_unique(
    records: &mut Vec<UserRecord>,
    new_user: NewUser,
) -> Result<UserRecord, DirectoryError> {
    if let Some(username) = new_user.username.as_deref() {
        if find_by_username(records.as_slice(), username).is_some() {
            return Err(DirectoryError::UsernameTaken);
        }
    }
    if let Some(google_id) = new_user.google_id.as_deref() {
        if find_by_google_id(records.as_slice(), google_id).is_some() {
            return Err(DirectoryError::GoogleIdTaken);
        }
    }
    let record = new_user.into_record();
    records.push(record.clone());
    Ok(record)
}

fn find_by_username(records: &[UserRecord], username: &str) -> Option<UserRecord> {
    records
        .iter()
        .find(|r| r.user.username.as_deref() == Some(username))
        .cloned()
}

fn find_by_google_id(records: &[UserRecord], google_id: &str) -> Option<UserRecord> {
    records
        .iter()
        .find(|r| r.user.google_id.as_deref() == Some(google_id))
        .cloned()
}

/// Flat-file implementation of the UserDirectory trait.
///
/// All records live in one JSON array; writes go to a temp file that is
/// renamed over the original.
#[derive(Clone)]
pub struct FlatFileDirectory {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FlatFileDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            path: root.join(USERS_FILE),
            lock: Arc::new(Mutex::new(())),
        })
    }

    async fn load(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        if !tokio_fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = tokio_fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn persist(&self, records: &[UserRecord]) -> Result<(), DirectoryError> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for FlatFileDirectory {
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let _guard = self.lock.lock().await;
        Ok(find_by_username(&self.load().await?, username))
    }

    async fn get_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let _guard = self.lock.lock().await;
        Ok(find_by_google_id(&self.load().await?, google_id))
    }

    async fn add(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let record = insert_unique(&mut records, new_user)?;
        self.persist(&records).await?;
        tracing::debug!(user_id = %record.user.id, "user record written");
        Ok(record)
    }
}

/// In-memory directory, handy for tests and embedding
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    records: Arc<Mutex<Vec<UserRecord>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(find_by_username(&self.records.lock().await, username))
    }

    async fn get_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(find_by_google_id(&self.records.lock().await, google_id))
    }

    async fn add(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        insert_unique(&mut *self.records.lock().await, new_user)
    }
}
