//! Client-side storage and shared application state
//!
//! The front-end persists exactly one thing: the session token, kept in an
//! embedded redb file under a well-known key. Every mutation bumps a revision
//! counter so the auth watcher can re-evaluate without a restart.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::api::ApiClient;
use crate::clipboard::Clipboard;
use crate::session::AuthContext;
use crate::view::LinkBook;

/// Table holding persisted client state
///
/// Key: storage key (only `TOKEN_KEY` is used)
/// Value: the raw bearer token
pub const TABLE_SESSION: TableDefinition<&str, &str> = TableDefinition::new("session_v1");

/// Well-known key the bearer token is stored under
pub const TOKEN_KEY: &str = "token";

/// Handle to the persisted credential
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    revision: Arc<watch::Sender<u64>>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            db,
            revision: Arc::new(revision),
        }
    }

    pub fn load(&self) -> Result<Option<String>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_SESSION)?;
        let token = table.get(TOKEN_KEY)?.map(|guard| guard.value().to_string());
        Ok(token)
    }

    pub fn save(&self, token: &str) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_SESSION)?;
            table.insert(TOKEN_KEY, token)?;
        }
        write_txn.commit()?;
        self.bump();
        Ok(())
    }

    /// Removes the stored token. Only signals a change if one was present.
    pub fn purge(&self) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TABLE_SESSION)?;
            let removed = table.remove(TOKEN_KEY)?.is_some();
            removed
        };
        write_txn.commit()?;
        if removed {
            self.bump();
        }
        Ok(())
    }

    /// Change notifications, one per mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Application state shared across all request handlers
///
/// Built once at the root; the credential, the API client and the local link
/// list are reached through here rather than through globals.
#[derive(Clone)]
pub struct AppState {
    pub store: CredentialStore,
    pub auth: AuthContext,
    pub api: ApiClient,
    pub links: Arc<RwLock<LinkBook>>,
    pub clipboard: Arc<dyn Clipboard>,
}

impl AppState {
    pub fn new(db: Arc<Database>, api: ApiClient, clipboard: Arc<dyn Clipboard>) -> Self {
        let store = CredentialStore::new(db);
        let auth = AuthContext::new(store.clone());
        Self {
            store,
            auth,
            api,
            links: Arc::new(RwLock::new(LinkBook::default())),
            clipboard,
        }
    }
}

/// Opens the storage file and creates the session table
///
/// # Example
///
/// ```no_run
/// # use shortener_web::database::init_db;
/// let db = init_db("session.db").expect("Failed to initialize storage");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_SESSION)?;
    }
    write_txn.commit()?;

    Ok(db)
}
