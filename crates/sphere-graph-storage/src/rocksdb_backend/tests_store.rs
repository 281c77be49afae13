//! GraphStore contract tests against a temporary database.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use sphere_graph_core::error::CoreError;
use sphere_graph_core::store::{GraphStore, InsertOutcome};
use sphere_graph_core::types::{
    hash_sequence, run_length_encode, ChildRef, Composition, Content, ContentHash, EntityId,
    Physicality, Relation, RelationEvidence, SequenceDomain, StorageMode,
};

use super::core::SphereDb;

fn open_db() -> (TempDir, SphereDb) {
    let tmp = TempDir::new().unwrap();
    let db = SphereDb::open(tmp.path()).unwrap();
    db.health_check().unwrap();
    (tmp, db)
}

fn composition(children: &[u32], key: u128) -> Composition {
    let seq = run_length_encode(children.iter().map(|c| ChildRef::Atom(*c)));
    let hash = hash_sequence(SequenceDomain::Composition, &seq);
    Composition::new(
        hash,
        seq,
        Physicality::new([1.0, 0.0, 0.0, 0.0], key),
        StorageMode::Dense,
    )
}

#[test]
fn test_open_and_flush() {
    let (_tmp, db) = open_db();
    db.flush_all().unwrap();
    assert!(!db.path().is_empty());
}

#[test]
fn test_composition_roundtrip() {
    let (_tmp, db) = open_db();
    let row = composition(&[104, 105, 105], 42);
    let hash = row.hash;

    assert!(db.create_composition(row.clone()).unwrap().is_created());
    let loaded = db.composition(&hash).unwrap().unwrap();
    assert_eq!(loaded, row);

    // Second create is a dedup hit, not a new row.
    match db.create_composition(row).unwrap() {
        InsertOutcome::Existing(existing) => assert_eq!(existing.hash, hash),
        InsertOutcome::Created => panic!("create race contract violated"),
    }
}

#[test]
fn test_composition_refs_and_removal() {
    let (_tmp, db) = open_db();
    let row = composition(&[120], 9);
    let hash = row.hash;
    db.create_composition(row).unwrap();

    assert_eq!(db.adjust_composition_refs(&hash, 3).unwrap(), 3);
    assert_eq!(db.adjust_composition_refs(&hash, -3).unwrap(), 0);

    db.remove_composition(&hash).unwrap();
    assert!(db.composition(&hash).unwrap().is_none());
    assert!(matches!(
        db.remove_composition(&hash),
        Err(CoreError::CompositionNotFound { .. })
    ));
}

#[test]
fn test_relation_roundtrip_with_spatial_mirror() {
    let (_tmp, db) = open_db();
    let member = composition(&[104], 5);
    let member_hash = member.hash;
    db.create_composition(member).unwrap();

    let seq = run_length_encode([
        ChildRef::Composition(member_hash),
        ChildRef::Composition(member_hash),
    ]);
    let hash = hash_sequence(SequenceDomain::Relation, &seq);
    let relation = Relation::new(hash, seq, Physicality::new([0.0, 1.0, 0.0, 0.0], 77));
    db.create_relation(relation.clone()).unwrap();

    assert_eq!(db.relation(&hash).unwrap().unwrap(), relation);

    // The key-ordered mirror sees both rows.
    let entities = db.scan_spatial_range(0, u128::MAX).unwrap();
    assert!(entities.contains(&EntityId::Composition(member_hash)));
    assert!(entities.contains(&EntityId::Relation(hash)));

    // Range bounds prune by key.
    let narrow = db.scan_spatial_range(70, 80).unwrap();
    assert_eq!(narrow, vec![EntityId::Relation(hash)]);
}

#[test]
fn test_rating_lifecycle() {
    let (_tmp, db) = open_db();
    let relation = ContentHash::of_bytes(b"edge");

    assert!(db.rating(&relation).unwrap().is_none());

    let first = db.apply_rating(&relation, 1000.0, 1.0).unwrap();
    assert_eq!(first.rating, 1000.0);
    assert_eq!(first.observations, 1.0);

    let second = db.apply_rating(&relation, 1200.0, 1.0).unwrap();
    assert_eq!(second.rating, 1100.0);
    assert_eq!(second.observations, 2.0);

    let rolled = db.rollback_rating(&relation, 1200.0, 1.0).unwrap();
    assert!((rolled.rating - 1000.0).abs() < 1e-9);

    // Rolling back the last sample underflows and leaves the row intact.
    assert!(matches!(
        db.rollback_rating(&relation, 1000.0, 1.0),
        Err(CoreError::RatingUnderflow { .. })
    ));
    assert!(db.rating(&relation).unwrap().is_some());

    db.remove_rating(&relation).unwrap();
    assert!(db.rating(&relation).unwrap().is_none());
}

#[test]
fn test_concurrent_rating_updates_lose_nothing() {
    let (_tmp, db) = open_db();
    let db = Arc::new(db);
    let relation = ContentHash::of_bytes(b"contended");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    db.apply_rating(&relation, 1000.0, 1.0).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let aggregate = db.rating(&relation).unwrap().unwrap();
    assert_eq!(aggregate.observations, 200.0);
}

#[test]
fn test_evidence_indexes() {
    let (_tmp, db) = open_db();
    let relation_a = ContentHash::of_bytes(b"a");
    let relation_b = ContentHash::of_bytes(b"b");
    let content = Uuid::new_v4();

    let ev1 = RelationEvidence::new(relation_a, content, 1000.0, 1.0);
    let ev2 = RelationEvidence::new(relation_b, content, 1100.0, 1.0);
    let ev3 = RelationEvidence::new(relation_a, Uuid::new_v4(), 900.0, 1.0);
    for ev in [&ev1, &ev2, &ev3] {
        db.append_evidence(ev.clone()).unwrap();
    }

    let by_content = db.evidence_for_content(&content).unwrap();
    assert_eq!(by_content.len(), 2);

    let by_relation = db.evidence_for_relation(&relation_a).unwrap();
    assert_eq!(by_relation.len(), 2);
    assert!(by_relation.iter().all(|e| e.relation == relation_a));
}

#[test]
fn test_evidence_invalidation_is_single_shot() {
    let (_tmp, db) = open_db();
    let ev = RelationEvidence::new(ContentHash::of_bytes(b"r"), Uuid::new_v4(), 1000.0, 1.0);
    let id = ev.id;
    db.append_evidence(ev).unwrap();

    let updated = db.invalidate_evidence(&id).unwrap();
    assert!(!updated.valid);
    assert!(updated.invalidated_at.is_some());
    assert!(matches!(
        db.invalidate_evidence(&id),
        Err(CoreError::EvidenceAlreadyInvalid { .. })
    ));
}

#[test]
fn test_content_rows() {
    let (_tmp, db) = open_db();
    let id = Uuid::new_v4();
    let row = Content {
        id,
        hash: ContentHash::of_bytes(b"hello world"),
        byte_len: 11,
        media_type: "text/plain".into(),
        mode: StorageMode::Dense,
        root_sequence: Some(run_length_encode([ChildRef::Atom(104)])),
        created_at: chrono::Utc::now(),
    };
    db.put_content(row.clone()).unwrap();
    assert_eq!(db.content(&id).unwrap().unwrap(), row);
    assert!(matches!(
        db.put_content(row),
        Err(CoreError::DuplicateContent { .. })
    ));

    db.remove_content(&id).unwrap();
    assert!(matches!(
        db.remove_content(&id),
        Err(CoreError::ContentNotFound { .. })
    ));
}

#[test]
fn test_atom_snapshot_roundtrip() {
    use sphere_graph_core::atoms::AtomSeeder;

    let (_tmp, db) = open_db();
    assert!(db.load_atoms().unwrap().is_none());

    let store = AtomSeeder::default()
        .seed_codepoint_range('a'..='z', 3)
        .unwrap();
    db.persist_atoms(&store).unwrap();

    let restored = db.load_atoms().unwrap().expect("snapshot present");
    assert_eq!(restored.len(), 26);
    assert_eq!(restored.data_version(), 3);
    let original = store.get(u32::from('q')).unwrap();
    let loaded = restored.get(u32::from('q')).unwrap();
    assert_eq!(original.physicality.position, loaded.physicality.position);
}

#[test]
fn test_reopen_preserves_rows() {
    let tmp = TempDir::new().unwrap();
    let row = composition(&[104, 105], 11);
    let hash = row.hash;
    {
        let db = SphereDb::open(tmp.path()).unwrap();
        db.create_composition(row).unwrap();
        db.flush_all().unwrap();
    }
    let db = SphereDb::open(tmp.path()).unwrap();
    assert!(db.composition(&hash).unwrap().is_some());
}
