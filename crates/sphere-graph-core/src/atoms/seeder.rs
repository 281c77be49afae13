//! The one-time seeding pass.
//!
//! Seeding consumes an externally produced artifact - rows of code point
//! plus precomputed ordering key - projects every row onto S³, and freezes
//! the result into an [`AtomStore`]. The pass is single-writer, batch
//! oriented, and non-reentrant; it runs before normal operation, never
//! during it. A full seed covers every Unicode scalar value (~1.11M rows).

use std::collections::HashMap;
use std::ops::RangeInclusive;

use tracing::{debug, info};

use super::store::AtomStore;
use crate::error::{CoreError, CoreResult};
use crate::geometry::{OrderingKey, Projector};
use crate::types::Atom;

/// One row of the seed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRow {
    /// The code point to seed.
    pub codepoint: u32,
    /// Its precomputed semantic ordering key.
    pub key: OrderingKey,
}

/// Batch seeder for the atom table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomSeeder {
    projector: Projector,
}

/// Log progress every this many rows.
const PROGRESS_INTERVAL: usize = 100_000;

impl AtomSeeder {
    /// Create a seeder around a projector.
    pub fn new(projector: Projector) -> Self {
        Self { projector }
    }

    /// Project and freeze a full seed artifact.
    ///
    /// # Errors
    ///
    /// - `CoreError::MalformedCodePoint` for surrogates or out-of-range rows
    /// - `CoreError::Internal` for duplicate code points in the artifact
    pub fn seed<I>(&self, rows: I, data_version: u32) -> CoreResult<AtomStore>
    where
        I: IntoIterator<Item = SeedRow>,
    {
        let mut atoms: HashMap<u32, Atom> = HashMap::new();
        let mut seen = 0usize;

        for row in rows {
            let physicality = self.projector.project(&row.key)?;
            let atom = Atom::new(row.codepoint, physicality)?;
            if atoms.insert(row.codepoint, atom).is_some() {
                return Err(CoreError::Internal(format!(
                    "seed artifact repeats code point U+{:X}",
                    row.codepoint
                )));
            }
            seen += 1;
            if seen % PROGRESS_INTERVAL == 0 {
                debug!(rows = seen, "seeding atoms");
            }
        }

        info!(
            atoms = atoms.len(),
            data_version, "atom table seeded"
        );
        Ok(AtomStore::from_atoms(atoms, data_version))
    }

    /// Seed a contiguous code-point range with default ordering keys.
    ///
    /// Convenience for environments without a collation artifact
    /// (development, tests). Surrogate gaps are skipped rather than
    /// rejected so wide ranges stay usable.
    pub fn seed_codepoint_range(
        &self,
        range: RangeInclusive<char>,
        data_version: u32,
    ) -> CoreResult<AtomStore> {
        let rows = range.map(|c| {
            let codepoint = u32::from(c);
            SeedRow {
                codepoint,
                key: OrderingKey::from_codepoint_defaults(codepoint),
            }
        });
        self.seed(rows, data_version)
    }
}
