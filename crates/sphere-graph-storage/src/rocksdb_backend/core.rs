//! Core SphereDb struct and database operations.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rocksdb::{Cache, ColumnFamily, IteratorMode, Options, DB};
use tracing::info;

use sphere_graph_core::atoms::AtomStore;
use sphere_graph_core::types::{Atom, ContentHash, EntityId};
use sphere_graph_core::CoreResult;
use uuid::Uuid;

use crate::column_families::{all_column_family_descriptors, cf_names};
use crate::serialization::{codepoint_key, entity_from_spatial_row, from_bytes, spatial_row_key, to_bytes};

use super::config::RocksDbConfig;
use super::error::StorageError;

/// System CF key holding the atom table's data version.
const ATOM_DATA_VERSION_KEY: &[u8] = b"atom_data_version";

/// RocksDB-backed storage for the sphere graph tables.
///
/// # Thread Safety
///
/// RocksDB's `DB` is internally thread-safe; all methods take `&self` and
/// the struct is shared via `Arc<SphereDb>`. The create-or-append and
/// rating read-modify-write guarantees are layered on top with per-hash
/// mutex striping (see the `GraphStore` impl).
pub struct SphereDb {
    pub(crate) db: DB,
    /// Shared LRU block cache, kept alive for the database lifetime.
    #[allow(dead_code)]
    cache: Cache,
    path: String,
    /// Per-hash guards serializing create-or-append and rating updates.
    row_locks: DashMap<ContentHash, Arc<Mutex<()>>>,
    /// Per-uuid guards serializing evidence invalidation and content
    /// insertion.
    uuid_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl SphereDb {
    /// Open a database at `path` with default configuration.
    ///
    /// Creates the directory and all column families when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with_config(path, RocksDbConfig::default())
    }

    /// Open a database with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: RocksDbConfig,
    ) -> Result<Self, StorageError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let cache = Cache::new_lru_cache(config.block_cache_size);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(config.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        if !config.enable_wal {
            db_opts.set_manual_wal_flush(true);
        }

        let descriptors = all_column_family_descriptors(&cache);
        let db = DB::open_cf_descriptors(&db_opts, &path_str, descriptors).map_err(|e| {
            StorageError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            }
        })?;

        info!(path = %path_str, "sphere database opened");
        Ok(Self {
            db,
            cache,
            path: path_str,
            row_locks: DashMap::new(),
            uuid_locks: DashMap::new(),
        })
    }

    /// Per-hash mutex for create-or-append and rating updates.
    pub(crate) fn hash_lock(&self, hash: &ContentHash) -> Arc<Mutex<()>> {
        self.row_locks.entry(*hash).or_default().clone()
    }

    /// Per-uuid mutex for evidence invalidation and content insertion.
    pub(crate) fn uuid_lock(&self, id: &Uuid) -> Arc<Mutex<()>> {
        self.uuid_locks.entry(*id).or_default().clone()
    }

    /// Column family handle by name.
    pub(crate) fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound {
                name: name.to_string(),
            })
    }

    /// Database directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Verify every column family is reachable.
    pub fn health_check(&self) -> Result<(), StorageError> {
        for name in cf_names::ALL {
            self.cf(name)?;
        }
        Ok(())
    }

    /// Flush all column families to disk.
    pub fn flush_all(&self) -> Result<(), StorageError> {
        for name in cf_names::ALL {
            let cf = self.cf(name)?;
            self.db
                .flush_cf(cf)
                .map_err(|e| StorageError::FlushFailed(e.to_string()))?;
        }
        Ok(())
    }

    // === Atom snapshot ===

    /// Persist a seeded atom table, replacing any previous snapshot.
    ///
    /// Part of the explicit version-rebuild path: a new seed artifact is
    /// projected, persisted here, and downstream rows are rebuilt against
    /// it by the operator.
    pub fn persist_atoms(&self, store: &AtomStore) -> Result<(), StorageError> {
        let cf = self.cf(cf_names::ATOMS)?;
        let mut batch = rocksdb::WriteBatch::default();
        for atom in store.iter() {
            batch.put_cf(cf, codepoint_key(atom.codepoint), to_bytes(atom)?);
        }
        let system = self.cf(cf_names::SYSTEM)?;
        batch.put_cf(
            system,
            ATOM_DATA_VERSION_KEY,
            store.data_version().to_be_bytes(),
        );
        self.db.write(batch)?;
        info!(
            atoms = store.len(),
            data_version = store.data_version(),
            "atom snapshot persisted"
        );
        Ok(())
    }

    /// Restore the atom table snapshot, if one was persisted.
    pub fn load_atoms(&self) -> CoreResult<Option<AtomStore>> {
        let system = self.cf(cf_names::SYSTEM)?;
        let Some(version_bytes) = self
            .db
            .get_cf(system, ATOM_DATA_VERSION_KEY)
            .map_err(StorageError::from)?
        else {
            return Ok(None);
        };
        let version_bytes: [u8; 4] = version_bytes
            .as_slice()
            .try_into()
            .map_err(|_| StorageError::Corrupt("atom data version width".into()))?;
        let data_version = u32::from_be_bytes(version_bytes);

        let cf = self.cf(cf_names::ATOMS)?;
        let mut atoms: Vec<Atom> = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(StorageError::from)?;
            atoms.push(from_bytes(&value)?);
        }
        Ok(Some(AtomStore::from_seeded(atoms, data_version)?))
    }

    // === Spatial mirror ===

    /// Mirror one spatial entry into the key-ordered table.
    pub fn put_spatial_entry(
        &self,
        spatial_key: u128,
        entity: &EntityId,
    ) -> Result<(), StorageError> {
        let cf = self.cf(cf_names::SPATIAL_KEYS)?;
        self.db
            .put_cf(cf, spatial_row_key(spatial_key, entity), [])?;
        Ok(())
    }

    /// Remove one spatial entry.
    pub fn delete_spatial_entry(
        &self,
        spatial_key: u128,
        entity: &EntityId,
    ) -> Result<(), StorageError> {
        let cf = self.cf(cf_names::SPATIAL_KEYS)?;
        self.db
            .delete_cf(cf, spatial_row_key(spatial_key, entity))?;
        Ok(())
    }

    /// All entities whose spatial keys fall in `[low, high]`.
    ///
    /// A coarse curve-order prefilter: key-adjacent entities are usually
    /// space-adjacent, so hosts use this scan to narrow candidates before
    /// exact geometric filtering.
    pub fn scan_spatial_range(
        &self,
        low: u128,
        high: u128,
    ) -> Result<Vec<EntityId>, StorageError> {
        let cf = self.cf(cf_names::SPATIAL_KEYS)?;
        let start = low.to_be_bytes();
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&start, rocksdb::Direction::Forward))
        {
            let (key, _) = item?;
            let key_prefix: [u8; 16] = key[..16]
                .try_into()
                .map_err(|_| StorageError::Corrupt("spatial key width".into()))?;
            if u128::from_be_bytes(key_prefix) > high {
                break;
            }
            out.push(entity_from_spatial_row(&key)?);
        }
        Ok(out)
    }
}
