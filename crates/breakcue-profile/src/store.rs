//! Durable storage for profile documents.
//!
//! Profiles talk to storage only through the [`ProfileStore`] trait: one
//! schemaless JSON object per player identifier, fetched by key and replaced
//! as a whole on write. Two implementations are provided:
//!
//! - [`MemoryProfileStore`]: an in-process map, used as a test double and for
//!   throwaway simulations
//! - [`JsonDirStore`]: one `<player_id>.json` file per document in a directory
//!
//! Stores are `Send + Sync` so they can be shared behind an `Arc` between
//! several profiles. They provide no cross-process locking: a single writer
//! per player identifier is assumed.

use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::PathBuf,
    sync::Mutex,
};

use crate::Document;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("I/O error on profile document {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("malformed profile document {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("invalid player identifier '{player_id}'")]
    InvalidKey { player_id: String },
    #[display("profile store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Key-value document storage keyed by player identifier.
pub trait ProfileStore: fmt::Debug + Send + Sync {
    /// Returns the stored document for `player_id`, or `None` if there is none.
    fn fetch(&self, player_id: &str) -> Result<Option<Document>, StoreError>;

    /// Stores `document` for `player_id`, replacing any existing document.
    fn upsert(&self, player_id: &str, document: &Document) -> Result<(), StoreError>;

    /// Removes every stored document.
    ///
    /// Administrative operation; profiles never call it.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory [`ProfileStore`].
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    documents: Mutex<BTreeMap<String, Document>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().map_or(0, |docs| docs.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Document>>, StoreError> {
        self.documents.lock().map_err(|_| StoreError::Unavailable {
            reason: "document map lock poisoned".to_owned(),
        })
    }
}

impl ProfileStore for MemoryProfileStore {
    fn fetch(&self, player_id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.lock()?.get(player_id).cloned())
    }

    fn upsert(&self, player_id: &str, document: &Document) -> Result<(), StoreError> {
        self.lock()?.insert(player_id.to_owned(), document.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.clear();
        Ok(())
    }
}

/// [`ProfileStore`] keeping one pretty-printed JSON file per player.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

const EXTENSION: &str = "json";

impl JsonDirStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new<P>(dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { dir: dir.into() }
    }

    fn document_path(&self, player_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !player_id.is_empty()
            && player_id != "."
            && player_id != ".."
            && !player_id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidKey {
                player_id: player_id.to_owned(),
            });
        }
        Ok(self.dir.join(format!("{player_id}.{EXTENSION}")))
    }
}

impl ProfileStore for JsonDirStore {
    fn fetch(&self, player_id: &str) -> Result<Option<Document>, StoreError> {
        let path = self.document_path(player_id)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let document = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
        Ok(Some(document))
    }

    fn upsert(&self, player_id: &str, document: &Document) -> Result<(), StoreError> {
        let path = self.document_path(player_id)?;
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let tmp_path = path.with_extension(format!("{EXTENSION}.tmp"));
        let io_err = |source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        };
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, document).map_err(|source| StoreError::Json {
            path: tmp_path.clone(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
        drop(writer);

        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                fs::remove_file(&path).map_err(|source| StoreError::Io { path, source })?;
            }
        }
        Ok(())
    }
}
