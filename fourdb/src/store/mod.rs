use crate::error::{FourDbError, Result};
use crate::query::{self, Crud};
use crate::schema::{normalize, Conditions, Document, RawSchema, Schema};
use crate::validation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One collection as stored in the backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub schema: Schema,
    #[serde(default)]
    pub data: Vec<Document>,
}

/// Top level of the backing file: collection name -> record.
pub type StoreData = IndexMap<String, CollectionRecord>;

/// The document store. Owns every collection of one backing JSON file.
///
/// Writes are whole-file read-modify-write with no locking: one writer per
/// file. Two stores on the same file can overwrite each other's changes to
/// the same collection.
pub struct Store {
    path: PathBuf,
    collections: StoreData,
}

impl Store {
    /// Open an existing backing file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(FourDbError::Configuration("Backing file path must not be empty".into()));
        }
        if !path.exists() {
            return Err(FourDbError::Configuration(format!(
                "Backing file does not exist: {}",
                path.display()
            )));
        }

        let collections = load_file(path)?;
        log::debug!(
            "Opened {} with {} collection(s)",
            path.display(),
            collections.len()
        );
        Ok(Store {
            path: path.to_path_buf(),
            collections,
        })
    }

    /// Open a backing file, first creating it as `{}` if it is missing.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            write_file(path, &StoreData::new())?;
            log::info!("Created backing file {}", path.display());
        }
        Store::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read every collection from the backing file, dropping in-memory state.
    pub fn reload(&mut self) -> Result<()> {
        self.collections = load_file(&self.path)?;
        Ok(())
    }

    /// Create a collection, or replace the schema of an existing one.
    /// Existing documents are kept and are not re-validated.
    pub fn define_collection(&mut self, name: &str, raw: &RawSchema) -> Result<()> {
        if name.trim().is_empty() {
            return Err(FourDbError::Configuration("Collection name must not be empty".into()));
        }
        let schema = normalize(raw)?;

        match self.collections.get_mut(name) {
            Some(record) => {
                record.schema = schema;
                if !record.data.is_empty() {
                    log::warn!(
                        "Collection '{name}' redefined; {} existing document(s) were not re-validated",
                        record.data.len()
                    );
                }
            }
            None => {
                self.collections.insert(
                    name.to_string(),
                    CollectionRecord {
                        schema,
                        data: Vec::new(),
                    },
                );
                log::info!("Defined collection '{name}'");
            }
        }

        self.persist(name)
    }

    /// Get a collection handle. Fails with NotFound if it was never defined.
    pub fn collection(&mut self, name: &str) -> Result<Collection<'_>> {
        if !self.collections.contains_key(name) {
            return Err(FourDbError::NotFound {
                collection: name.to_string(),
            });
        }
        Ok(Collection {
            store: self,
            name: name.to_string(),
        })
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(|k| k.as_str()).collect()
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.collections.get(name).map(|record| &record.schema)
    }

    /// Load the whole file, overlay this collection's in-memory state and
    /// overwrite the file.
    fn persist(&self, name: &str) -> Result<()> {
        let record = self.collections.get(name).ok_or_else(|| FourDbError::NotFound {
            collection: name.to_string(),
        })?;

        let mut on_disk = if self.path.exists() {
            load_file(&self.path)?
        } else {
            StoreData::new()
        };
        on_disk.insert(name.to_string(), record.clone());
        write_file(&self.path, &on_disk)?;

        log::debug!(
            "Persisted collection '{name}' ({} document(s)) to {}",
            record.data.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<StoreData> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(StoreData::new());
    }
    let data: StoreData = serde_json::from_str(&content)?;
    Ok(data)
}

/// Replace the file in one rename so readers never see a partial write.
fn write_file(path: &Path, data: &StoreData) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, data)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| FourDbError::Io(e.error))?;
    Ok(())
}

/// A handle to one collection of a Store, bound to its schema and its
/// live document sequence.
pub struct Collection<'a> {
    store: &'a mut Store,
    name: String,
}

impl<'a> Collection<'a> {
    fn record(&self) -> &CollectionRecord {
        &self.store.collections[&self.name]
    }

    fn record_mut(&mut self) -> &mut CollectionRecord {
        &mut self.store.collections[&self.name]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.record().schema
    }

    pub fn len(&self) -> usize {
        self.record().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record().data.is_empty()
    }
}

impl<'a> Crud for Collection<'a> {
    fn get_all(&self) -> Result<Vec<Document>> {
        Ok(self.record().data.clone())
    }

    fn find_many(&self, conditions: &Conditions) -> Result<Vec<Document>> {
        Ok(self
            .record()
            .data
            .iter()
            .filter(|doc| query::matches(doc, conditions))
            .cloned()
            .collect())
    }

    fn find_one(&self, conditions: &Conditions) -> Result<Option<Document>> {
        Ok(self
            .record()
            .data
            .iter()
            .find(|doc| query::matches(doc, conditions))
            .cloned())
    }

    fn create(&mut self, data: Document) -> Result<Document> {
        let document = validation::prepare_document(self.schema(), data)?;

        self.record_mut().data.push(document.clone());
        if let Err(e) = self.store.persist(&self.name) {
            self.record_mut().data.pop();
            return Err(e);
        }
        Ok(document)
    }

    fn update(&mut self, conditions: &Conditions, patch: &Document) -> Result<Option<Document>> {
        let index = match query::position(&self.record().data, conditions) {
            Some(index) => index,
            None => return Ok(None),
        };

        // Every field is checked before any is applied.
        validation::validate_patch(self.schema(), patch)?;

        let previous = self.record().data[index].clone();
        let document = &mut self.record_mut().data[index];
        for (field, value) in patch {
            document.insert(field.clone(), value.clone());
        }
        let updated = document.clone();

        if let Err(e) = self.store.persist(&self.name) {
            self.record_mut().data[index] = previous;
            return Err(e);
        }
        Ok(Some(updated))
    }

    fn delete(&mut self, conditions: &Conditions) -> Result<Option<Document>> {
        let index = match query::position(&self.record().data, conditions) {
            Some(index) => index,
            None => return Ok(None),
        };

        let removed = self.record_mut().data.remove(index);
        if let Err(e) = self.store.persist(&self.name) {
            self.record_mut().data.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }
}
