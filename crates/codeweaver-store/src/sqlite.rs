//! SQLite implementation of the DocumentStore trait.
//!
//! Persistent backend using rusqlite with bundled SQLite, wrapped in async
//! via tokio::spawn_blocking. Payloads are stored as tagged JSON.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use codeweaver_core::{
    CollectionRef, DocumentPath, DocumentRef, Payload, SetOptions, Uid, WriteOperationKind,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::rules::{authorize, AccessRequest, AccessRules, AllowAll, AuthState};
use crate::traits::{auto_id, now_millis, DocumentStore, StoredDocument};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
///
/// The connection lock is fair, so operations run in the order their
/// futures were first polled: two writes issued back to back apply in that
/// order.
pub struct SqliteStore {
    /// The SQLite connection, behind a FIFO async mutex.
    conn: Arc<Mutex<Connection>>,
    rules: Arc<dyn AccessRules>,
    auth: AuthState,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            rules: Arc::new(AllowAll),
            auth: AuthState::new(),
        }
    }

    /// Guard the store with `rules`.
    pub fn with_rules(mut self, rules: impl AccessRules + 'static) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Present `uid` to the access rules on subsequent requests.
    pub fn sign_in(&self, uid: Uid) {
        self.auth.set(Some(uid));
    }

    /// Drop the current identity.
    pub fn sign_out(&self) {
        self.auth.set(None);
    }

    /// All documents directly inside `collection`, ordered by id.
    pub async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDocument>> {
        let collection = collection.path().as_str().to_string();
        self.run(move |conn, _| {
            let mut stmt = conn.prepare(
                "SELECT path, data, create_time, update_time
                 FROM documents WHERE collection = ?1 ORDER BY doc_id",
            )?;
            let rows = stmt
                .query_map(params![collection], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(path, data, create_time, update_time)| {
                    decode_document(&DocumentPath::parse(&path)?, &data, create_time, update_time)
                })
                .collect()
        })
        .await
    }

    /// Execute a blocking operation on the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &dyn AccessRules) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        // Queue for the connection before leaving the async side; the guard
        // moves into the blocking job and is released when it finishes.
        let mut conn = Arc::clone(&self.conn).lock_owned().await;
        let rules = Arc::clone(&self.rules);

        tokio::task::spawn_blocking(move || f(&mut *conn, &*rules))
            .await
            .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn decode_document(
    path: &DocumentPath,
    data: &str,
    create_time: i64,
    update_time: i64,
) -> Result<StoredDocument> {
    Ok(StoredDocument {
        reference: DocumentRef::from_path(path.clone())?,
        data: serde_json::from_str(data)?,
        create_time,
        update_time,
    })
}

fn load(conn: &Connection, path: &DocumentPath) -> Result<Option<StoredDocument>> {
    let row = conn
        .query_row(
            "SELECT data, create_time, update_time FROM documents WHERE path = ?1",
            params![path.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(data, create_time, update_time)| {
        decode_document(path, &data, create_time, update_time)
    })
    .transpose()
}

fn save(conn: &Connection, doc: &StoredDocument) -> Result<()> {
    // JSON has no NaN or infinity; serde_json would store them as null and
    // the document could never be read back.
    if let Some(field) = doc.data.non_finite_field() {
        return Err(StoreError::InvalidData(format!(
            "{}: field {:?} holds a non-finite number",
            doc.reference, field
        )));
    }

    conn.execute(
        "INSERT OR REPLACE INTO documents (path, collection, doc_id, data, create_time, update_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            doc.reference.path().as_str(),
            doc.reference.parent().path().as_str(),
            doc.reference.id(),
            serde_json::to_string(&doc.data)?,
            doc.create_time,
            doc.update_time,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, collection: &CollectionRef, data: &Payload) -> Result<DocumentRef> {
        let collection = collection.clone();
        let data = data.clone();
        let caller = self.auth.current();

        self.run(move |conn, rules| {
            let doc = loop {
                let candidate = collection.doc(&auto_id())?;
                if load(conn, candidate.path())?.is_none() {
                    break candidate;
                }
            };

            authorize(
                rules,
                &AccessRequest {
                    path: doc.path(),
                    operation: WriteOperationKind::Create,
                    incoming: Some(&data),
                    existing: None,
                    caller: caller.as_ref(),
                },
            )?;

            let now = now_millis();
            save(
                conn,
                &StoredDocument {
                    reference: doc.clone(),
                    data: data.resolve_server_timestamps(now),
                    create_time: now,
                    update_time: now,
                },
            )?;
            Ok(doc)
        })
        .await
    }

    async fn set(&self, doc: &DocumentRef, data: &Payload, options: SetOptions) -> Result<()> {
        let doc = doc.clone();
        let data = data.clone();
        let caller = self.auth.current();

        self.run(move |conn, rules| {
            let tx = conn.transaction()?;
            let existing = load(&tx, doc.path())?;

            authorize(
                rules,
                &AccessRequest {
                    path: doc.path(),
                    operation: if existing.is_some() {
                        WriteOperationKind::Update
                    } else {
                        WriteOperationKind::Create
                    },
                    incoming: Some(&data),
                    existing: existing.as_ref().map(|d| &d.data),
                    caller: caller.as_ref(),
                },
            )?;

            let now = now_millis();
            let incoming = data.resolve_server_timestamps(now);
            let (create_time, data) = match (existing, options) {
                (Some(mut current), SetOptions::Merge) => {
                    current.data.merge(&incoming);
                    (current.create_time, current.data)
                }
                (Some(current), SetOptions::Overwrite) => (current.create_time, incoming),
                (None, _) => (now, incoming),
            };

            save(
                &tx,
                &StoredDocument {
                    reference: doc,
                    data,
                    create_time,
                    update_time: now,
                },
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update(&self, doc: &DocumentRef, data: &Payload) -> Result<()> {
        let doc = doc.clone();
        let data = data.clone();
        let caller = self.auth.current();

        self.run(move |conn, rules| {
            let tx = conn.transaction()?;
            let existing = load(&tx, doc.path())?;

            authorize(
                rules,
                &AccessRequest {
                    path: doc.path(),
                    operation: WriteOperationKind::Update,
                    incoming: Some(&data),
                    existing: existing.as_ref().map(|d| &d.data),
                    caller: caller.as_ref(),
                },
            )?;

            let Some(mut current) = existing else {
                return Err(StoreError::NotFound(doc.to_string()));
            };

            let now = now_millis();
            current.data.merge(&data.resolve_server_timestamps(now));
            current.update_time = now;
            save(&tx, &current)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<()> {
        let doc = doc.clone();
        let caller = self.auth.current();

        self.run(move |conn, rules| {
            let existing = load(conn, doc.path())?;

            authorize(
                rules,
                &AccessRequest {
                    path: doc.path(),
                    operation: WriteOperationKind::Delete,
                    incoming: None,
                    existing: existing.as_ref().map(|d| &d.data),
                    caller: caller.as_ref(),
                },
            )?;

            conn.execute(
                "DELETE FROM documents WHERE path = ?1",
                params![doc.path().as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<StoredDocument>> {
        let doc = doc.clone();
        let caller = self.auth.current();

        self.run(move |conn, rules| {
            let existing = load(conn, doc.path())?;

            authorize(
                rules,
                &AccessRequest {
                    path: doc.path(),
                    operation: WriteOperationKind::Read,
                    incoming: None,
                    existing: existing.as_ref().map(|d| &d.data),
                    caller: caller.as_ref(),
                },
            )?;

            Ok(existing)
        })
        .await
    }
}
