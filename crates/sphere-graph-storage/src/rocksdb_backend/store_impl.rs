//! `GraphStore` implementation for [`SphereDb`].
//!
//! The two boundary contracts are delivered with per-hash mutex striping:
//! a writer holds the hash's mutex across its read-check-write, so create
//! races resolve to one created row (the loser observes the winner and
//! reports `Existing`), and rating read-modify-writes never interleave.

use rocksdb::WriteBatch;

use sphere_graph_core::error::{CoreError, CoreResult};
use sphere_graph_core::store::{GraphStore, InsertOutcome};
use sphere_graph_core::types::{
    Composition, Content, ContentHash, ContentId, EvidenceId, Relation, RelationEvidence,
    RelationRating,
};

use crate::column_families::cf_names;
use crate::serialization::{
    content_evidence_key, from_bytes, relation_evidence_key, to_bytes, CompositionHeader,
    RelationHeader,
};

use super::core::SphereDb;
use super::error::StorageError;

impl SphereDb {
    fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.put_cf(cf, key, value)?)
    }

    fn delete_raw(&self, cf_name: &str, key: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.delete_cf(cf, key)?)
    }

    fn read_composition(&self, hash: &ContentHash) -> Result<Option<Composition>, StorageError> {
        let Some(header_bytes) = self.get_raw(cf_names::COMPOSITIONS, hash.as_bytes())? else {
            return Ok(None);
        };
        let header: CompositionHeader = from_bytes(&header_bytes)?;
        let sequence_bytes = self
            .get_raw(cf_names::COMPOSITION_SEQUENCES, hash.as_bytes())?
            .ok_or_else(|| StorageError::Corrupt(format!("composition {hash} lost its sequence")))?;
        Ok(Some(header.join(*hash, from_bytes(&sequence_bytes)?)))
    }

    fn read_relation(&self, hash: &ContentHash) -> Result<Option<Relation>, StorageError> {
        let Some(header_bytes) = self.get_raw(cf_names::RELATIONS, hash.as_bytes())? else {
            return Ok(None);
        };
        let header: RelationHeader = from_bytes(&header_bytes)?;
        let sequence_bytes = self
            .get_raw(cf_names::RELATION_SEQUENCES, hash.as_bytes())?
            .ok_or_else(|| StorageError::Corrupt(format!("relation {hash} lost its sequence")))?;
        Ok(Some(header.join(*hash, from_bytes(&sequence_bytes)?)))
    }

    /// Evidence ids under a fixed-width key prefix.
    fn evidence_ids_by_prefix(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<EvidenceId>, StorageError> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, prefix) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let id_bytes: [u8; 16] = key[prefix.len()..]
                .try_into()
                .map_err(|_| StorageError::Corrupt("evidence index key width".into()))?;
            out.push(EvidenceId::from_bytes(id_bytes));
        }
        Ok(out)
    }
}

impl GraphStore for SphereDb {
    fn composition(&self, hash: &ContentHash) -> CoreResult<Option<Composition>> {
        Ok(self.read_composition(hash)?)
    }

    fn create_composition(&self, row: Composition) -> CoreResult<InsertOutcome<Composition>> {
        let lock = self.hash_lock(&row.hash);
        let _guard = lock.lock();

        if let Some(existing) = self.read_composition(&row.hash)? {
            return Ok(InsertOutcome::Existing(existing));
        }

        let hash = row.hash;
        let (header, sequence) = CompositionHeader::split(row);
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(cf_names::COMPOSITIONS)?,
            hash.as_bytes(),
            to_bytes(&header)?,
        );
        batch.put_cf(
            self.cf(cf_names::COMPOSITION_SEQUENCES)?,
            hash.as_bytes(),
            to_bytes(&sequence)?,
        );
        self.db.write(batch).map_err(StorageError::from)?;
        self.put_spatial_entry(
            header.physicality.spatial_key,
            &sphere_graph_core::types::EntityId::Composition(hash),
        )?;
        Ok(InsertOutcome::Created)
    }

    fn remove_composition(&self, hash: &ContentHash) -> CoreResult<()> {
        let lock = self.hash_lock(hash);
        let _guard = lock.lock();

        let Some(row) = self.read_composition(hash)? else {
            return Err(CoreError::CompositionNotFound { hash: *hash });
        };
        self.delete_spatial_entry(
            row.physicality.spatial_key,
            &sphere_graph_core::types::EntityId::Composition(*hash),
        )?;
        self.delete_raw(cf_names::COMPOSITIONS, hash.as_bytes())?;
        self.delete_raw(cf_names::COMPOSITION_SEQUENCES, hash.as_bytes())?;
        Ok(())
    }

    fn adjust_composition_refs(&self, hash: &ContentHash, delta: i64) -> CoreResult<u64> {
        let lock = self.hash_lock(hash);
        let _guard = lock.lock();

        let header_bytes = self
            .get_raw(cf_names::COMPOSITIONS, hash.as_bytes())?
            .ok_or(CoreError::CompositionNotFound { hash: *hash })?;
        let mut header: CompositionHeader = from_bytes(&header_bytes)?;
        header.references = header.references.saturating_add_signed(delta);
        self.put_raw(cf_names::COMPOSITIONS, hash.as_bytes(), &to_bytes(&header)?)?;
        Ok(header.references)
    }

    fn relation(&self, hash: &ContentHash) -> CoreResult<Option<Relation>> {
        Ok(self.read_relation(hash)?)
    }

    fn create_relation(&self, row: Relation) -> CoreResult<InsertOutcome<Relation>> {
        let lock = self.hash_lock(&row.hash);
        let _guard = lock.lock();

        if let Some(existing) = self.read_relation(&row.hash)? {
            return Ok(InsertOutcome::Existing(existing));
        }

        let hash = row.hash;
        let (header, sequence) = RelationHeader::split(row);
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(cf_names::RELATIONS)?,
            hash.as_bytes(),
            to_bytes(&header)?,
        );
        batch.put_cf(
            self.cf(cf_names::RELATION_SEQUENCES)?,
            hash.as_bytes(),
            to_bytes(&sequence)?,
        );
        self.db.write(batch).map_err(StorageError::from)?;
        self.put_spatial_entry(
            header.physicality.spatial_key,
            &sphere_graph_core::types::EntityId::Relation(hash),
        )?;
        Ok(InsertOutcome::Created)
    }

    fn remove_relation(&self, hash: &ContentHash) -> CoreResult<()> {
        let lock = self.hash_lock(hash);
        let _guard = lock.lock();

        let Some(row) = self.read_relation(hash)? else {
            return Err(CoreError::RelationNotFound { hash: *hash });
        };
        self.delete_spatial_entry(
            row.physicality.spatial_key,
            &sphere_graph_core::types::EntityId::Relation(*hash),
        )?;
        self.delete_raw(cf_names::RELATIONS, hash.as_bytes())?;
        self.delete_raw(cf_names::RELATION_SEQUENCES, hash.as_bytes())?;
        Ok(())
    }

    fn rating(&self, relation: &ContentHash) -> CoreResult<Option<RelationRating>> {
        match self.get_raw(cf_names::RELATION_RATINGS, relation.as_bytes())? {
            Some(bytes) => Ok(Some(from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn apply_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating> {
        let lock = self.hash_lock(relation);
        let _guard = lock.lock();

        let mut aggregate = match self.get_raw(cf_names::RELATION_RATINGS, relation.as_bytes())? {
            Some(bytes) => from_bytes(&bytes)?,
            None => RelationRating::unrated(*relation),
        };
        aggregate.absorb(rating, weight);
        self.put_raw(
            cf_names::RELATION_RATINGS,
            relation.as_bytes(),
            &to_bytes(&aggregate)?,
        )?;
        Ok(aggregate)
    }

    fn rollback_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating> {
        let lock = self.hash_lock(relation);
        let _guard = lock.lock();

        let bytes = self
            .get_raw(cf_names::RELATION_RATINGS, relation.as_bytes())?
            .ok_or(CoreError::RelationNotFound { hash: *relation })?;
        let mut aggregate: RelationRating = from_bytes(&bytes)?;
        aggregate.release(rating, weight)?;
        self.put_raw(
            cf_names::RELATION_RATINGS,
            relation.as_bytes(),
            &to_bytes(&aggregate)?,
        )?;
        Ok(aggregate)
    }

    fn remove_rating(&self, relation: &ContentHash) -> CoreResult<()> {
        let lock = self.hash_lock(relation);
        let _guard = lock.lock();

        if self
            .get_raw(cf_names::RELATION_RATINGS, relation.as_bytes())?
            .is_none()
        {
            return Err(CoreError::RelationNotFound { hash: *relation });
        }
        self.delete_raw(cf_names::RELATION_RATINGS, relation.as_bytes())?;
        Ok(())
    }

    fn append_evidence(&self, row: RelationEvidence) -> CoreResult<()> {
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(cf_names::RELATION_EVIDENCE)?,
            row.id.as_bytes(),
            to_bytes(&row)?,
        );
        batch.put_cf(
            self.cf(cf_names::EVIDENCE_BY_CONTENT)?,
            content_evidence_key(&row.content, &row.id),
            [],
        );
        batch.put_cf(
            self.cf(cf_names::EVIDENCE_BY_RELATION)?,
            relation_evidence_key(&row.relation, &row.id),
            [],
        );
        self.db.write(batch).map_err(StorageError::from)?;
        Ok(())
    }

    fn evidence(&self, id: &EvidenceId) -> CoreResult<Option<RelationEvidence>> {
        match self.get_raw(cf_names::RELATION_EVIDENCE, id.as_bytes())? {
            Some(bytes) => Ok(Some(from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn invalidate_evidence(&self, id: &EvidenceId) -> CoreResult<RelationEvidence> {
        let lock = self.uuid_lock(id);
        let _guard = lock.lock();

        let bytes = self
            .get_raw(cf_names::RELATION_EVIDENCE, id.as_bytes())?
            .ok_or(CoreError::EvidenceNotFound { id: *id })?;
        let mut row: RelationEvidence = from_bytes(&bytes)?;
        if !row.valid {
            return Err(CoreError::EvidenceAlreadyInvalid { id: *id });
        }
        row.invalidate();
        self.put_raw(cf_names::RELATION_EVIDENCE, id.as_bytes(), &to_bytes(&row)?)?;
        Ok(row)
    }

    fn evidence_for_content(&self, content: &ContentId) -> CoreResult<Vec<RelationEvidence>> {
        let ids = self.evidence_ids_by_prefix(cf_names::EVIDENCE_BY_CONTENT, content.as_bytes())?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.evidence(&id)? {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn evidence_for_relation(&self, relation: &ContentHash) -> CoreResult<Vec<RelationEvidence>> {
        let ids =
            self.evidence_ids_by_prefix(cf_names::EVIDENCE_BY_RELATION, relation.as_bytes())?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.evidence(&id)? {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn content(&self, id: &ContentId) -> CoreResult<Option<Content>> {
        match self.get_raw(cf_names::CONTENTS, id.as_bytes())? {
            Some(bytes) => Ok(Some(from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_content(&self, row: Content) -> CoreResult<()> {
        let lock = self.uuid_lock(&row.id);
        let _guard = lock.lock();

        if self.get_raw(cf_names::CONTENTS, row.id.as_bytes())?.is_some() {
            return Err(CoreError::DuplicateContent { id: row.id });
        }
        self.put_raw(cf_names::CONTENTS, row.id.as_bytes(), &to_bytes(&row)?)?;
        Ok(())
    }

    fn remove_content(&self, id: &ContentId) -> CoreResult<()> {
        let lock = self.uuid_lock(id);
        let _guard = lock.lock();

        if self.get_raw(cf_names::CONTENTS, id.as_bytes())?.is_none() {
            return Err(CoreError::ContentNotFound { id: *id });
        }
        self.delete_raw(cf_names::CONTENTS, id.as_bytes())?;
        Ok(())
    }
}
