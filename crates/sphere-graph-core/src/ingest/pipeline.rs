//! The ingestion pipeline.
//!
//! Ties the stages together: code-point stream -> atom lookup (never
//! insert) -> token compositions -> co-occurrence relations -> ratings and
//! evidence -> spatial index. Queries walk the spatial index first and the
//! graph tables second.
//!
//! Multiple ingestion streams may run concurrently: row creation is
//! idempotent at the storage boundary (create-or-append), rating updates
//! are serialized per relation, and the spatial tree takes coarse write
//! locks per insert.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sphere_graph_index::{GeoEntry, IndexError, QueryMetric, Region, SpatialTree};

use crate::atoms::AtomStore;
use crate::config::Config;
use crate::detect::{CooccurrenceDetector, RelationCandidate, SimilarityDetector};
use crate::error::{noted, CoreError, CoreResult};
use crate::geometry::SpatialKeyEncoder;
use crate::graph::ContentGraphBuilder;
use crate::rating::{InvalidationOutcome, RatingEngine};
use crate::store::GraphStore;
use crate::types::{
    canonical_bytes, run_length_encode, run_length_expand, validate_scalar, ChildRef, Content,
    ContentHash, ContentId, EntityId, EvidenceId, Physicality, SequenceDomain, SequenceEntry,
    StorageMode,
};

/// Counters reported back to the caller of one ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Code points consumed from the stream.
    pub atoms_seen: u64,
    /// Composition rows this call created (dedup hits excluded).
    pub compositions_created: u64,
    /// Relation rows this call created (dedup hits excluded).
    pub relations_created: u64,
    /// Bytes of original content consumed.
    pub bytes_in: u64,
    /// Canonical bytes of newly stored sequences.
    pub bytes_stored: u64,
}

/// One piece of a Dense root stream.
enum RootPiece {
    /// A maximal run of non-whitespace code points.
    Token(Vec<char>),
    /// A single whitespace code point, kept for byte-exact replay.
    Separator(char),
}

/// The assembled core: atom table, graph store, and spatial index.
///
/// Generic over the storage backend; the in-memory store serves tests and
/// development, the RocksDB backend provides durability with the same
/// boundary contract.
pub struct SphereGraph<S: GraphStore> {
    atoms: Arc<AtomStore>,
    store: S,
    index: SpatialTree<EntityId>,
    encoder: SpatialKeyEncoder,
    cooccurrence: CooccurrenceDetector,
    config: Config,
}

impl<S: GraphStore> SphereGraph<S> {
    /// Assemble a graph over a seeded atom table and a storage backend.
    pub fn new(atoms: Arc<AtomStore>, store: S, config: Config) -> CoreResult<Self> {
        config.validate()?;
        let encoder = SpatialKeyEncoder::new(config.spatial_key)?;
        let cooccurrence =
            CooccurrenceDetector::new(config.detector.window, config.detector.initial_rating)?;
        let index = SpatialTree::try_new(config.tree)?;
        info!(
            atoms = atoms.len(),
            data_version = atoms.data_version(),
            "sphere graph assembled"
        );
        Ok(Self {
            atoms,
            store,
            index,
            encoder,
            cooccurrence,
            config,
        })
    }

    /// The atom table.
    pub fn atoms(&self) -> &AtomStore {
        &self.atoms
    }

    /// The storage backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pure projection: the permanent physicality of a code point's atom.
    ///
    /// # Errors
    ///
    /// - `CoreError::MalformedCodePoint` for non-scalar values
    /// - `CoreError::AtomNotFound` for unseeded code points
    pub fn project(&self, codepoint: u32) -> CoreResult<Physicality> {
        noted(self.project_inner(codepoint))
    }

    fn project_inner(&self, codepoint: u32) -> CoreResult<Physicality> {
        validate_scalar(codepoint)?;
        Ok(self.atoms.physicality(codepoint)?.clone())
    }

    /// Bulk-insert every seeded atom into the spatial index, so spatial
    /// queries cover atoms as well as compositions and relations. Returns
    /// the number inserted.
    pub fn index_atoms(&self) -> CoreResult<usize> {
        let mut inserted = 0usize;
        for atom in self.atoms.iter() {
            self.index.insert(GeoEntry::new(
                EntityId::Atom(atom.codepoint),
                atom.physicality.position,
                atom.physicality.spatial_key,
            ))?;
            inserted += 1;
        }
        info!(atoms = inserted, "atom positions indexed");
        Ok(inserted)
    }

    /// Ingest one content stream.
    ///
    /// Dense mode retains the full root sequence for byte-exact
    /// reconstruction; Sparse mode keeps only the graph contributions.
    ///
    /// # Errors
    ///
    /// - `CoreError::DuplicateContent` when `content_id` was already used
    /// - `CoreError::MalformedCodePoint` / `CoreError::AtomNotFound` for
    ///   invalid or unseeded stream elements; nothing is persisted
    pub fn ingest(
        &self,
        content_id: ContentId,
        code_points: &[u32],
        media_type: &str,
        mode: StorageMode,
    ) -> CoreResult<IngestionStats> {
        noted(self.ingest_inner(content_id, code_points, media_type, mode))
    }

    fn ingest_inner(
        &self,
        content_id: ContentId,
        code_points: &[u32],
        media_type: &str,
        mode: StorageMode,
    ) -> CoreResult<IngestionStats> {
        if self.store.content(&content_id)?.is_some() {
            return Err(CoreError::DuplicateContent { id: content_id });
        }

        // Validate the whole stream before touching any table.
        let mut chars = Vec::with_capacity(code_points.len());
        for &codepoint in code_points {
            let c = char::from_u32(codepoint).ok_or(CoreError::MalformedCodePoint { codepoint })?;
            if self.atoms.get(codepoint).is_none() {
                return Err(CoreError::AtomNotFound { codepoint });
            }
            chars.push(c);
        }

        let mut stats = IngestionStats {
            atoms_seen: chars.len() as u64,
            ..IngestionStats::default()
        };
        let original_bytes: Vec<u8> = chars.iter().collect::<String>().into_bytes();
        stats.bytes_in = original_bytes.len() as u64;
        let content_hash = ContentHash::of_bytes(&original_bytes);

        let builder = ContentGraphBuilder::new(&self.atoms, &self.store, self.encoder);

        // Token compositions plus the interleaved root stream.
        let mut token_hashes = Vec::new();
        let mut root_children = Vec::new();
        for piece in segment(&chars) {
            match piece {
                RootPiece::Token(token) => {
                    let children: Vec<ChildRef> = token
                        .iter()
                        .map(|c| ChildRef::Atom(u32::from(*c)))
                        .collect();
                    let outcome = builder.compose(&children, mode)?;
                    if outcome.created {
                        stats.compositions_created += 1;
                        let entries = run_length_encode(children.into_iter());
                        stats.bytes_stored +=
                            canonical_bytes(SequenceDomain::Composition, &entries).len() as u64;
                        self.index.insert(GeoEntry::new(
                            EntityId::Composition(outcome.hash),
                            outcome.physicality.position,
                            outcome.physicality.spatial_key,
                        ))?;
                    }
                    token_hashes.push(outcome.hash);
                    root_children.push(ChildRef::Composition(outcome.hash));
                }
                RootPiece::Separator(c) => {
                    root_children.push(ChildRef::Atom(u32::from(c)));
                }
            }
        }

        // Co-occurrence relations with evidence.
        let candidates = self.cooccurrence.detect(&token_hashes);
        self.absorb_candidates(&builder, content_id, &candidates, &mut stats)?;

        // The content row owns the replayable root stream (Dense only).
        let root_sequence = match mode {
            StorageMode::Dense => {
                let entries = run_length_encode(root_children.iter().copied());
                stats.bytes_stored +=
                    canonical_bytes(SequenceDomain::Composition, &entries).len() as u64;
                for member in distinct_compositions(&entries) {
                    self.store.adjust_composition_refs(&member, 1)?;
                }
                Some(entries)
            }
            StorageMode::Sparse => None,
        };

        self.store.put_content(Content {
            id: content_id,
            hash: content_hash,
            byte_len: stats.bytes_in,
            media_type: media_type.to_string(),
            mode,
            root_sequence,
            created_at: chrono::Utc::now(),
        })?;

        info!(
            content = %content_id,
            atoms = stats.atoms_seen,
            compositions = stats.compositions_created,
            relations = stats.relations_created,
            "content ingested"
        );
        Ok(stats)
    }

    /// Link an embedding source into the graph through the approximate
    /// k-NN detector. Each embedding id must reference a stored
    /// composition; every retained neighbor edge becomes (or reinforces) a
    /// relation with a proximity-derived rating.
    pub fn link_embeddings(
        &self,
        content_id: ContentId,
        embeddings: &[(ContentHash, Vec<f32>)],
    ) -> CoreResult<IngestionStats> {
        noted(self.link_embeddings_inner(content_id, embeddings))
    }

    fn link_embeddings_inner(
        &self,
        content_id: ContentId,
        embeddings: &[(ContentHash, Vec<f32>)],
    ) -> CoreResult<IngestionStats> {
        if self.store.content(&content_id)?.is_some() {
            return Err(CoreError::DuplicateContent { id: content_id });
        }

        let detector = SimilarityDetector::new(
            self.config.detector.k,
            self.config.detector.ef_search,
            self.config.detector.initial_rating,
            self.config.detector.rating_floor,
            self.config.detector.rating_ceiling,
        )?;
        let candidates = detector.detect(embeddings)?;

        let builder = ContentGraphBuilder::new(&self.atoms, &self.store, self.encoder);
        let mut stats = IngestionStats::default();
        self.absorb_candidates(&builder, content_id, &candidates, &mut stats)?;

        // Identity of the extraction event is the digest of its vectors.
        let mut vector_bytes = Vec::new();
        for (_, vector) in embeddings {
            for value in vector {
                vector_bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        stats.bytes_in = vector_bytes.len() as u64;
        self.store.put_content(Content {
            id: content_id,
            hash: ContentHash::of_bytes(&vector_bytes),
            byte_len: stats.bytes_in,
            media_type: "application/x-embedding".to_string(),
            mode: StorageMode::Sparse,
            root_sequence: None,
            created_at: chrono::Utc::now(),
        })?;
        Ok(stats)
    }

    /// Create-or-reinforce every candidate relation and record evidence.
    fn absorb_candidates(
        &self,
        builder: &ContentGraphBuilder<'_, S>,
        content_id: ContentId,
        candidates: &[RelationCandidate],
        stats: &mut IngestionStats,
    ) -> CoreResult<()> {
        let engine = RatingEngine::new(&self.store);
        for candidate in candidates {
            let outcome = builder.relate(&candidate.members)?;
            if outcome.created {
                stats.relations_created += 1;
                let entries = run_length_encode(
                    candidate
                        .members
                        .iter()
                        .map(|hash| ChildRef::Composition(*hash)),
                );
                stats.bytes_stored +=
                    canonical_bytes(SequenceDomain::Relation, &entries).len() as u64;
                self.index.insert(GeoEntry::new(
                    EntityId::Relation(outcome.hash),
                    outcome.physicality.position,
                    outcome.physicality.spatial_key,
                ))?;
            }
            engine.record(
                &outcome.hash,
                content_id,
                candidate.initial_rating,
                self.config.rating.default_weight,
            )?;
        }
        Ok(())
    }

    /// Replay a Dense content stream byte-exactly.
    ///
    /// The replayed bytes are verified against the stored content hash;
    /// a mismatch means stored state was corrupted and is surfaced, never
    /// papered over.
    ///
    /// # Errors
    ///
    /// - `CoreError::ContentNotFound` for an unknown id
    /// - `CoreError::ReconstructionUnavailable` for Sparse content
    pub fn reconstruct(&self, content_id: &ContentId) -> CoreResult<Vec<u8>> {
        noted(self.reconstruct_inner(content_id))
    }

    fn reconstruct_inner(&self, content_id: &ContentId) -> CoreResult<Vec<u8>> {
        let content = self
            .store
            .content(content_id)?
            .ok_or(CoreError::ContentNotFound { id: *content_id })?;
        let root = match (&content.mode, &content.root_sequence) {
            (StorageMode::Dense, Some(root)) => root,
            _ => return Err(CoreError::ReconstructionUnavailable { id: *content_id }),
        };

        let mut bytes = Vec::with_capacity(content.byte_len as usize);
        for child in run_length_expand(root) {
            self.append_child_bytes(&child, &mut bytes)?;
        }

        if ContentHash::of_bytes(&bytes) != content.hash {
            return Err(CoreError::Internal(format!(
                "reconstruction of {content_id} does not match its stored hash"
            )));
        }
        Ok(bytes)
    }

    fn append_child_bytes(&self, child: &ChildRef, out: &mut Vec<u8>) -> CoreResult<()> {
        match child {
            ChildRef::Atom(codepoint) => {
                let atom = self
                    .atoms
                    .get(*codepoint)
                    .ok_or(CoreError::AtomNotFound { codepoint: *codepoint })?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(atom.to_char().encode_utf8(&mut buf).as_bytes());
                Ok(())
            }
            ChildRef::Composition(hash) => {
                let row = self
                    .store
                    .composition(hash)?
                    .ok_or(CoreError::ChildNotFound { child: *child })?;
                for nested in run_length_expand(&row.sequence) {
                    self.append_child_bytes(&nested, out)?;
                }
                Ok(())
            }
        }
    }

    /// All indexed entities whose positions fall inside `region`.
    pub fn range(&self, region: &Region) -> Vec<EntityId> {
        self.index.range(region)
    }

    /// The `k` indexed entities nearest to `point`.
    pub fn nearest(&self, point: &[f64; 4], k: usize, metric: QueryMetric) -> Vec<(EntityId, f64)> {
        self.index.nearest_k(point, k, metric)
    }

    /// Reverse one evidence contribution; cascades to relation and
    /// composition removal when the evidence was the last support.
    pub fn invalidate_evidence(&self, id: &EvidenceId) -> CoreResult<()> {
        noted(self.invalidate_evidence_inner(id))
    }

    fn invalidate_evidence_inner(&self, id: &EvidenceId) -> CoreResult<()> {
        let engine = RatingEngine::new(&self.store);
        match engine.invalidate(id)? {
            InvalidationOutcome::RolledBack(_) => Ok(()),
            InvalidationOutcome::RelationOrphaned { relation } => {
                self.remove_orphaned_relation(&relation)
            }
        }
    }

    /// Delete everything one content row contributed, then the row itself.
    ///
    /// Every valid evidence sample the content produced is invalidated
    /// (cascading where it was the last support), the root sequence's
    /// composition references are released, and orphaned compositions are
    /// collected. Unrelated data is untouched.
    pub fn retract(&self, content_id: &ContentId) -> CoreResult<()> {
        noted(self.retract_inner(content_id))
    }

    fn retract_inner(&self, content_id: &ContentId) -> CoreResult<()> {
        let content = self
            .store
            .content(content_id)?
            .ok_or(CoreError::ContentNotFound { id: *content_id })?;

        for evidence in self.store.evidence_for_content(content_id)? {
            if evidence.valid {
                self.invalidate_evidence_inner(&evidence.id)?;
            }
        }

        if let Some(root) = &content.root_sequence {
            for member in distinct_compositions(root) {
                let remaining = self.store.adjust_composition_refs(&member, -1)?;
                if remaining == 0 {
                    self.gc_composition(&member)?;
                }
            }
        }

        self.store.remove_content(content_id)?;
        info!(content = %content_id, "content retracted");
        Ok(())
    }

    fn remove_orphaned_relation(&self, relation: &ContentHash) -> CoreResult<()> {
        let row = self
            .store
            .relation(relation)?
            .ok_or(CoreError::RelationNotFound { hash: *relation })?;

        self.unindex(EntityId::Relation(*relation), &row.physicality.position);
        self.store.remove_rating(relation)?;
        self.store.remove_relation(relation)?;
        debug!(%relation, "orphaned relation removed");

        for member in row.member_hashes() {
            let remaining = self.store.adjust_composition_refs(&member, -1)?;
            if remaining == 0 {
                self.gc_composition(&member)?;
            }
        }
        Ok(())
    }

    fn gc_composition(&self, hash: &ContentHash) -> CoreResult<()> {
        let row = self
            .store
            .composition(hash)?
            .ok_or(CoreError::CompositionNotFound { hash: *hash })?;
        self.unindex(EntityId::Composition(*hash), &row.physicality.position);
        self.store.remove_composition(hash)?;
        debug!(composition = %hash, "unreferenced composition collected");
        Ok(())
    }

    /// Drop an index entry, tolerating entries that were never indexed
    /// (e.g. rows restored from a durable store without a rebuilt index).
    fn unindex(&self, id: EntityId, position: &[f64; 4]) {
        match self.index.remove(&id, position) {
            Ok(()) | Err(IndexError::EntryNotFound) => {}
            Err(err) => warn!(?id, %err, "spatial index removal failed"),
        }
    }
}

/// Split a validated char stream into tokens and separators.
///
/// Separators are single whitespace code points; tokens are maximal
/// non-whitespace runs. Replaying pieces in order reproduces the stream.
fn segment(chars: &[char]) -> Vec<RootPiece> {
    let mut pieces = Vec::new();
    let mut current: Vec<char> = Vec::new();
    for &c in chars {
        if c.is_whitespace() {
            if !current.is_empty() {
                pieces.push(RootPiece::Token(std::mem::take(&mut current)));
            }
            pieces.push(RootPiece::Separator(c));
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(RootPiece::Token(current));
    }
    pieces
}

/// Distinct composition hashes referenced by a sequence.
fn distinct_compositions(entries: &[SequenceEntry]) -> Vec<ContentHash> {
    let mut out = Vec::new();
    for entry in entries {
        if let ChildRef::Composition(hash) = entry.child {
            if !out.contains(&hash) {
                out.push(hash);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::AtomSeeder;
    use crate::store::MemoryGraphStore;
    use uuid::Uuid;

    fn graph() -> SphereGraph<MemoryGraphStore> {
        let atoms = Arc::new(
            AtomSeeder::default()
                .seed_codepoint_range(' '..='~', 1)
                .unwrap(),
        );
        SphereGraph::new(atoms, MemoryGraphStore::new(), Config::default()).unwrap()
    }

    fn codepoints(text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    #[test]
    fn test_segment_keeps_separators() {
        let chars: Vec<char> = "a  b".chars().collect();
        let pieces = segment(&chars);
        assert_eq!(pieces.len(), 4);
        assert!(matches!(pieces[0], RootPiece::Token(_)));
        assert!(matches!(pieces[1], RootPiece::Separator(' ')));
        assert!(matches!(pieces[2], RootPiece::Separator(' ')));
        assert!(matches!(pieces[3], RootPiece::Token(_)));
    }

    #[test]
    fn test_project_matches_atom_table() {
        let g = graph();
        let p = g.project(u32::from('h')).unwrap();
        assert_eq!(
            p.position,
            g.atoms().get(u32::from('h')).unwrap().physicality.position
        );
    }

    #[test]
    fn test_project_unseeded_is_not_found() {
        let g = graph();
        assert!(matches!(
            g.project(0x4E2D),
            Err(CoreError::AtomNotFound { .. })
        ));
    }

    #[test]
    fn test_ingest_rejects_duplicate_content_id() {
        let g = graph();
        let id = Uuid::new_v4();
        g.ingest(id, &codepoints("once"), "text/plain", StorageMode::Dense)
            .unwrap();
        assert!(matches!(
            g.ingest(id, &codepoints("twice"), "text/plain", StorageMode::Dense),
            Err(CoreError::DuplicateContent { .. })
        ));
    }

    #[test]
    fn test_ingest_rejects_unseeded_stream_without_side_effects() {
        let g = graph();
        let err = g
            .ingest(
                Uuid::new_v4(),
                &codepoints("caf\u{e9}"),
                "text/plain",
                StorageMode::Dense,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::AtomNotFound { .. }));
        assert_eq!(g.store().composition_count(), 0);
    }

    #[test]
    fn test_sparse_content_cannot_reconstruct() {
        let g = graph();
        let id = Uuid::new_v4();
        g.ingest(id, &codepoints("alpha beta"), "text/plain", StorageMode::Sparse)
            .unwrap();
        assert!(matches!(
            g.reconstruct(&id),
            Err(CoreError::ReconstructionUnavailable { .. })
        ));
    }

    #[test]
    fn test_reconstruct_unknown_content_is_not_found() {
        let g = graph();
        assert!(matches!(
            g.reconstruct(&Uuid::new_v4()),
            Err(CoreError::ContentNotFound { .. })
        ));
    }

    #[test]
    fn test_last_error_reports_boundary_failures() {
        let g = graph();
        let _ = g.reconstruct(&Uuid::new_v4());
        let descriptor = crate::error::last_error().expect("failure was recorded");
        assert_eq!(descriptor.code, "content_not_found");
    }
}
