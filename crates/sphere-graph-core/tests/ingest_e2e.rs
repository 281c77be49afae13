//! End-to-end ingestion scenarios over the in-memory store.

use std::sync::Arc;

use uuid::Uuid;

use sphere_graph_core::atoms::{AtomSeeder, AtomStore};
use sphere_graph_core::config::Config;
use sphere_graph_core::error::CoreError;
use sphere_graph_core::ingest::SphereGraph;
use sphere_graph_core::store::{GraphStore, MemoryGraphStore};
use sphere_graph_core::types::{EntityId, StorageMode};
use sphere_graph_index::QueryMetric;

fn seeded_atoms() -> Arc<AtomStore> {
    Arc::new(
        AtomSeeder::default()
            .seed_codepoint_range(' '..='~', 1)
            .unwrap(),
    )
}

fn graph() -> SphereGraph<MemoryGraphStore> {
    SphereGraph::new(seeded_atoms(), MemoryGraphStore::new(), Config::default()).unwrap()
}

fn codepoints(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).collect()
}

#[test]
fn hello_hello_scenario() {
    let g = graph();
    let id = Uuid::new_v4();
    let stats = g
        .ingest(id, &codepoints("hello hello"), "text/plain", StorageMode::Dense)
        .unwrap();

    // All letters are pre-seeded; ingestion never creates atoms.
    assert_eq!(stats.atoms_seen, 11);
    assert_eq!(g.atoms().len(), 95);

    // One composition for "hello"; the repeat deduplicates.
    assert_eq!(stats.compositions_created, 1);
    assert_eq!(g.store().composition_count(), 1);

    // One relation whose sequence records the repeat through run-length
    // encoding, observed once.
    assert_eq!(stats.relations_created, 1);
    assert_eq!(g.store().relation_count(), 1);

    let relation_id = g
        .range(&sphere_graph_index::Region::cube([-1.0; 4], [1.0; 4]))
        .into_iter()
        .find_map(|entity| match entity {
            EntityId::Relation(hash) => Some(hash),
            _ => None,
        })
        .expect("relation is indexed");
    let relation = g.store().relation(&relation_id).unwrap().unwrap();
    assert_eq!(relation.sequence.len(), 1);
    assert_eq!(relation.sequence[0].occurrences, 2);

    let rating = g.store().rating(&relation_id).unwrap().unwrap();
    assert_eq!(rating.observations, 1.0);
    assert_eq!(rating.rating, 1000.0);
}

#[test]
fn dense_round_trip_is_byte_exact() {
    let g = graph();
    let samples = [
        "hello world",
        "the quick brown fox jumps over the lazy dog",
        "  leading and trailing  ",
        "a",
        "repeated   spaces\tand\ttabs",
        "aaa bbb aaa",
    ];
    for text in samples {
        let id = Uuid::new_v4();
        g.ingest(id, &codepoints(text), "text/plain", StorageMode::Dense)
            .unwrap();
        assert_eq!(
            g.reconstruct(&id).unwrap(),
            text.as_bytes(),
            "round trip failed for {text:?}"
        );
    }
}

#[test]
fn repeat_ingestion_creates_zero_rows() {
    let g = graph();
    let text = codepoints("green eggs and ham");

    let first = g
        .ingest(Uuid::new_v4(), &text, "text/plain", StorageMode::Dense)
        .unwrap();
    assert_eq!(first.compositions_created, 4);
    assert_eq!(first.relations_created, 3);

    let second = g
        .ingest(Uuid::new_v4(), &text, "text/plain", StorageMode::Dense)
        .unwrap();
    assert_eq!(second.compositions_created, 0);
    assert_eq!(second.relations_created, 0);
    assert_eq!(g.store().composition_count(), 4);
    assert_eq!(g.store().relation_count(), 3);
}

#[test]
fn repeat_observation_reinforces_rating() {
    let g = graph();
    let text = codepoints("salt pepper");

    g.ingest(Uuid::new_v4(), &text, "text/plain", StorageMode::Dense)
        .unwrap();
    g.ingest(Uuid::new_v4(), &text, "text/plain", StorageMode::Dense)
        .unwrap();

    let everything = sphere_graph_index::Region::cube([-1.0; 4], [1.0; 4]);
    let relation_id = g
        .range(&everything)
        .into_iter()
        .find_map(|entity| match entity {
            EntityId::Relation(hash) => Some(hash),
            _ => None,
        })
        .unwrap();
    let rating = g.store().rating(&relation_id).unwrap().unwrap();
    // Two identical observations at the initial rating.
    assert_eq!(rating.observations, 2.0);
    assert_eq!(rating.rating, 1000.0);
}

#[test]
fn nearest_queries_cover_ingested_entities() {
    let g = graph();
    g.ingest(
        Uuid::new_v4(),
        &codepoints("alpha beta gamma"),
        "text/plain",
        StorageMode::Dense,
    )
    .unwrap();

    let nearest = g.nearest(&[1.0, 0.0, 0.0, 0.0], 3, QueryMetric::Geodesic);
    assert_eq!(nearest.len(), 3);
    // Distances ascend and stay within the geodesic range.
    assert!(nearest.windows(2).all(|w| w[0].1 <= w[1].1));
    assert!(nearest.iter().all(|(_, d)| (0.0..=std::f64::consts::PI).contains(d)));
}

#[test]
fn invalidation_cascades_to_relation_removal() {
    let g = graph();
    let content = Uuid::new_v4();
    g.ingest(content, &codepoints("ham eggs"), "text/plain", StorageMode::Dense)
        .unwrap();
    assert_eq!(g.store().relation_count(), 1);

    let evidence = g
        .store()
        .evidence_for_content(&content)
        .unwrap()
        .into_iter()
        .next()
        .expect("ingestion recorded evidence");
    g.invalidate_evidence(&evidence.id).unwrap();

    // Single-evidence relation disappears with its rating; compositions
    // survive because the content root still references them.
    assert_eq!(g.store().relation_count(), 0);
    assert_eq!(g.store().composition_count(), 2);
}

#[test]
fn retract_removes_everything_the_content_contributed() {
    let g = graph();
    let keep = Uuid::new_v4();
    let drop = Uuid::new_v4();

    g.ingest(keep, &codepoints("shared words"), "text/plain", StorageMode::Dense)
        .unwrap();
    g.ingest(drop, &codepoints("other tokens"), "text/plain", StorageMode::Dense)
        .unwrap();
    assert_eq!(g.store().composition_count(), 4);
    assert_eq!(g.store().relation_count(), 2);

    g.retract(&drop).unwrap();

    // The retracted content's rows are gone; the other content's remain.
    assert_eq!(g.store().composition_count(), 2);
    assert_eq!(g.store().relation_count(), 1);
    assert!(matches!(
        g.reconstruct(&drop),
        Err(CoreError::ContentNotFound { .. })
    ));
    assert_eq!(g.reconstruct(&keep).unwrap(), b"shared words");
}

#[test]
fn concurrent_ingestion_of_identical_content_stays_deduplicated() {
    let g = Arc::new(graph());
    let text = Arc::new(codepoints("same text every thread"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let g = Arc::clone(&g);
            let text = Arc::clone(&text);
            std::thread::spawn(move || {
                g.ingest(Uuid::new_v4(), &text, "text/plain", StorageMode::Dense)
                    .unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Exactly one winner created each row; every loser degraded to an
    // evidence append against the winning row.
    let compositions_created: u64 = results.iter().map(|s| s.compositions_created).sum();
    let relations_created: u64 = results.iter().map(|s| s.relations_created).sum();
    assert_eq!(compositions_created, 4);
    assert_eq!(relations_created, 3);
    assert_eq!(g.store().composition_count(), 4);
    assert_eq!(g.store().relation_count(), 3);

    // No evidence was lost: every thread contributed one observation per
    // window.
    let everything = sphere_graph_index::Region::cube([-1.0; 4], [1.0; 4]);
    for entity in g.range(&everything) {
        if let EntityId::Relation(hash) = entity {
            let rating = g.store().rating(&hash).unwrap().unwrap();
            assert_eq!(rating.observations, 8.0);
        }
    }
}

#[test]
fn link_embeddings_builds_similarity_relations() {
    let g = graph();
    g.ingest(
        Uuid::new_v4(),
        &codepoints("red green blue crimson"),
        "text/plain",
        StorageMode::Dense,
    )
    .unwrap();

    // Fetch the token composition hashes through a full range scan.
    let everything = sphere_graph_index::Region::cube([-1.0; 4], [1.0; 4]);
    let tokens: Vec<_> = g
        .range(&everything)
        .into_iter()
        .filter_map(|entity| match entity {
            EntityId::Composition(hash) => Some(hash),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 4);

    // Synthetic embeddings: "red" and "crimson" adjacent, others apart.
    let embeddings = vec![
        (tokens[0], vec![1.0, 0.05, 0.0]),
        (tokens[1], vec![0.0, 1.0, 0.0]),
        (tokens[2], vec![0.0, 0.0, 1.0]),
        (tokens[3], vec![1.0, 0.0, 0.05]),
    ];
    let before = g.store().relation_count();
    let stats = g.link_embeddings(Uuid::new_v4(), &embeddings).unwrap();
    assert!(stats.relations_created > 0);
    assert!(g.store().relation_count() > before);
}
