//! The immutable atom table.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{CoreError, CoreResult};
use crate::types::{Atom, Physicality};

static GLOBAL: OnceLock<Arc<AtomStore>> = OnceLock::new();

/// Write-once table of all atoms, keyed by code point.
///
/// Built exactly once by the seeding pass and read-only for the lifetime
/// of the process: concurrent readers need no synchronization. The only
/// lifecycle transition is a full rebuild under a bumped data version,
/// which is an explicit operator action (a new process with a new store),
/// never an in-place mutation.
#[derive(Debug)]
pub struct AtomStore {
    atoms: HashMap<u32, Atom>,
    data_version: u32,
}

impl AtomStore {
    /// Assemble a store from seeded atoms. Crate-internal: the seeder is
    /// the only producer inside this crate.
    pub(crate) fn from_atoms(atoms: HashMap<u32, Atom>, data_version: u32) -> Self {
        Self {
            atoms,
            data_version,
        }
    }

    /// Rebuild a store from previously seeded atoms, e.g. a durable
    /// snapshot. The rows must originate from a seeding pass; this is a
    /// restore path, not a mutation path.
    ///
    /// # Errors
    ///
    /// `CoreError::Internal` when the snapshot repeats a code point.
    pub fn from_seeded<I>(rows: I, data_version: u32) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Atom>,
    {
        let mut atoms = HashMap::new();
        for atom in rows {
            let codepoint = atom.codepoint;
            if atoms.insert(codepoint, atom).is_some() {
                return Err(CoreError::Internal(format!(
                    "atom snapshot repeats code point U+{codepoint:X}"
                )));
            }
        }
        Ok(Self::from_atoms(atoms, data_version))
    }

    /// Look up the atom for a code point. A miss is a typed `None`, never
    /// an insert: the table is closed after seeding.
    pub fn get(&self, codepoint: u32) -> Option<&Atom> {
        self.atoms.get(&codepoint)
    }

    /// The atom's physicality, as a hard lookup.
    ///
    /// # Errors
    ///
    /// `CoreError::AtomNotFound` when the code point was not seeded.
    pub fn physicality(&self, codepoint: u32) -> CoreResult<&Physicality> {
        self.atoms
            .get(&codepoint)
            .map(|a| &a.physicality)
            .ok_or(CoreError::AtomNotFound { codepoint })
    }

    /// Number of seeded atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Seed-artifact version this table was built from.
    pub fn data_version(&self) -> u32 {
        self.data_version
    }

    /// Iterate all atoms in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    /// Install a store as the process-wide table.
    ///
    /// # Errors
    ///
    /// `CoreError::AtomStoreAlreadyInstalled` on a second install; a
    /// version rebuild replaces the process, not the global.
    pub fn install(store: Arc<AtomStore>) -> CoreResult<()> {
        let version = store.data_version;
        GLOBAL
            .set(store)
            .map_err(|_| CoreError::AtomStoreAlreadyInstalled {
                data_version: GLOBAL
                    .get()
                    .map(|s| s.data_version)
                    .unwrap_or(version),
            })
    }

    /// The process-wide table.
    ///
    /// # Errors
    ///
    /// `CoreError::AtomStoreNotInstalled` before [`AtomStore::install`].
    pub fn global() -> CoreResult<Arc<AtomStore>> {
        GLOBAL.get().cloned().ok_or(CoreError::AtomStoreNotInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::seeder::AtomSeeder;

    #[test]
    fn test_lookup_never_inserts() {
        let store = AtomSeeder::default().seed_codepoint_range('a'..='z', 1).unwrap();
        assert_eq!(store.len(), 26);
        assert!(store.get(u32::from('a')).is_some());
        assert!(store.get(u32::from('A')).is_none());
        assert_eq!(store.len(), 26, "a miss must not grow the table");
    }

    #[test]
    fn test_physicality_miss_is_typed() {
        let store = AtomSeeder::default().seed_codepoint_range('a'..='b', 1).unwrap();
        let err = store.physicality(0x41).unwrap_err();
        assert!(matches!(err, CoreError::AtomNotFound { codepoint: 0x41 }));
    }
}
