//! RocksDB column family definitions.
//!
//! Column families separate the logical tables and let each carry options
//! tuned to its access pattern.
//!
//! # Column Families (12 total)
//! | Name | Purpose | Key Format | Optimization |
//! |------|---------|------------|--------------|
//! | atoms | Seeded atom snapshot | codepoint (4 bytes BE) | Bloom filter |
//! | compositions | Composition headers | hash (32 bytes) | Bloom filter, cache |
//! | composition_sequences | RLE sequences | hash (32 bytes) | Large blocks |
//! | relations | Relation headers | hash (32 bytes) | Bloom filter, cache |
//! | relation_sequences | RLE sequences | hash (32 bytes) | Large blocks |
//! | relation_ratings | Rating aggregates | hash (32 bytes) | Bloom filter |
//! | relation_evidence | Provenance rows | uuid (16 bytes) | Bloom filter |
//! | evidence_by_content | Provenance index | content uuid + evidence uuid | Prefix extractor |
//! | evidence_by_relation | Provenance index | hash + evidence uuid | Prefix extractor |
//! | contents | Ingestion events | uuid (16 bytes) | Bloom filter |
//! | spatial_keys | Key-ordered mirror | spatial key (16 bytes BE) + entity | Range scans |
//! | system | Metadata | string key | No compression |
//!
//! # Shared Block Cache
//! All column families share a single LRU block cache (256MB default) so
//! memory stays bounded regardless of how many CFs are hot.

use rocksdb::{BlockBasedOptions, Cache, ColumnFamilyDescriptor, Options, SliceTransform};

/// Column family name constants.
pub mod cf_names {
    /// Seeded atom snapshot.
    pub const ATOMS: &str = "atoms";

    /// Composition headers (physicality, mode, references, timestamps).
    pub const COMPOSITIONS: &str = "compositions";

    /// Composition run-length sequences.
    pub const COMPOSITION_SEQUENCES: &str = "composition_sequences";

    /// Relation headers.
    pub const RELATIONS: &str = "relations";

    /// Relation run-length sequences.
    pub const RELATION_SEQUENCES: &str = "relation_sequences";

    /// Rating aggregates, one per rated relation.
    pub const RELATION_RATINGS: &str = "relation_ratings";

    /// Append-only evidence rows.
    pub const RELATION_EVIDENCE: &str = "relation_evidence";

    /// Evidence ids grouped by contributing content.
    /// Key: [content uuid: 16][evidence uuid: 16] = 32 bytes.
    pub const EVIDENCE_BY_CONTENT: &str = "evidence_by_content";

    /// Evidence ids grouped by supported relation.
    /// Key: [relation hash: 32][evidence uuid: 16] = 48 bytes.
    pub const EVIDENCE_BY_RELATION: &str = "evidence_by_relation";

    /// Ingestion events with their Dense root sequences.
    pub const CONTENTS: &str = "contents";

    /// Key-ordered spatial mirror.
    /// Key: [spatial key: 16 BE][entity tag: 1][entity id: 4|32] bytes.
    /// Big-endian keys make lexicographic order equal numeric order, so
    /// curve-local entities are adjacent on disk.
    pub const SPATIAL_KEYS: &str = "spatial_keys";

    /// System metadata (atom data version, schema markers).
    pub const SYSTEM: &str = "system";

    /// All column family names.
    pub const ALL: &[&str] = &[
        ATOMS,
        COMPOSITIONS,
        COMPOSITION_SEQUENCES,
        RELATIONS,
        RELATION_SEQUENCES,
        RELATION_RATINGS,
        RELATION_EVIDENCE,
        EVIDENCE_BY_CONTENT,
        EVIDENCE_BY_RELATION,
        CONTENTS,
        SPATIAL_KEYS,
        SYSTEM,
    ];
}

/// Options for point-lookup tables (headers, ratings, evidence, contents).
///
/// Bloom filters cut disk reads for misses - dedup probes miss far more
/// often than they hit.
fn point_lookup_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_bloom_filter(10.0, false);
    block_opts.set_cache_index_and_filter_blocks(true);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Options for sequence tables: values are larger, reads are whole-row.
fn sequence_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_block_size(64 * 1024);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Options for prefix-scanned index tables.
fn prefix_scan_options(cache: &Cache, prefix_len: usize) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_prefix_extractor(SliceTransform::create_fixed_prefix(prefix_len));
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Options for the key-ordered spatial mirror: range scans dominate.
fn range_scan_options(cache: &Cache) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts.create_if_missing(true);
    opts
}

/// Options for rarely touched system metadata.
fn system_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::None);
    opts.create_if_missing(true);
    opts
}

/// Descriptors for every column family, sharing one block cache.
pub fn all_column_family_descriptors(cache: &Cache) -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(cf_names::ATOMS, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::COMPOSITIONS, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::COMPOSITION_SEQUENCES, sequence_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::RELATIONS, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::RELATION_SEQUENCES, sequence_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::RELATION_RATINGS, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::RELATION_EVIDENCE, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::EVIDENCE_BY_CONTENT, prefix_scan_options(cache, 16)),
        ColumnFamilyDescriptor::new(
            cf_names::EVIDENCE_BY_RELATION,
            prefix_scan_options(cache, 32),
        ),
        ColumnFamilyDescriptor::new(cf_names::CONTENTS, point_lookup_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::SPATIAL_KEYS, range_scan_options(cache)),
        ColumnFamilyDescriptor::new(cf_names::SYSTEM, system_options()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_count_matches_names() {
        let cache = Cache::new_lru_cache(8 * 1024 * 1024);
        assert_eq!(
            all_column_family_descriptors(&cache).len(),
            cf_names::ALL.len()
        );
    }
}
