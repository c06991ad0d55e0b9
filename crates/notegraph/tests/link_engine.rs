use notegraph::{
    ChangeWatcher, CollisionPolicy, EngineConfig, EngineError, LinkEngine, MemoryStore, NoteEdit,
    NoteStore, Scope, WatcherConfig,
};
use notegraph_core::{links_converged, recompute_links, NoteId, NodeTier, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn engine() -> LinkEngine<MemoryStore> {
    LinkEngine::new(Arc::new(MemoryStore::new()), EngineConfig::default())
}

async fn note_with(engine: &LinkEngine<MemoryStore>, title: &str, content: &str) -> NoteId {
    let note = engine.create_note(title).await.unwrap();
    engine
        .update_note(&note.id, NoteEdit::content(content))
        .await
        .unwrap();
    note.id
}

async fn stored(store: &MemoryStore) -> Snapshot {
    Snapshot::new(store.fetch_all(&Scope::new("local")).await.unwrap())
}

#[tokio::test]
async fn reference_creates_forward_link_and_backlink() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha", "see [[Beta]]").await;
    let beta = note_with(&engine, "Beta", "no links").await;

    let a = engine.note(&alpha).unwrap();
    let b = engine.note(&beta).unwrap();
    assert_eq!(a.forward_links, vec![beta.clone()]);
    assert!(a.backlinks.is_empty());
    assert!(b.forward_links.is_empty());
    assert_eq!(b.backlinks, vec![alpha.clone()]);

    // Store holds the same link fields as the published snapshot
    assert_eq!(engine.store().get(&beta).unwrap().backlinks, vec![alpha]);
}

#[tokio::test]
async fn colliding_titles_resolve_to_first_created() {
    let engine = engine();
    let first = engine.create_note("Dup").await.unwrap().id;
    let second = engine.create_note("dup").await.unwrap().id;
    let d = note_with(&engine, "D", "[[DUP]]").await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.get(&first).unwrap().backlinks, vec![d.clone()]);
    assert!(snapshot.get(&second).unwrap().backlinks.is_empty());
    assert_eq!(snapshot.get(&d).unwrap().forward_links, vec![first]);
}

#[tokio::test]
async fn reject_policy_refuses_duplicate_titles() {
    let config = EngineConfig {
        collision_policy: CollisionPolicy::Reject,
        ..EngineConfig::default()
    };
    let engine = LinkEngine::new(Arc::new(MemoryStore::new()), config);
    let existing = engine.create_note("Dup").await.unwrap().id;

    let err = engine.create_note("DUP").await.unwrap_err();
    match err {
        EngineError::TitleCollision { existing: id, .. } => assert_eq!(id, existing),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn deleting_target_drops_dangling_reference() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha", "see [[Beta]]").await;
    let beta = note_with(&engine, "Beta", "no links").await;

    engine.delete_note(&beta).await.unwrap();

    let a = engine.note(&alpha).unwrap();
    assert!(a.forward_links.is_empty());
    assert_eq!(a.content, "see [[Beta]]");
    assert!(engine.note(&beta).is_none());
}

#[tokio::test]
async fn self_reference_is_kept() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha", "[[Alpha]]").await;

    let a = engine.note(&alpha).unwrap();
    assert_eq!(a.forward_links, vec![alpha.clone()]);
    assert_eq!(a.backlinks, vec![alpha.clone()]);

    let view = engine.graph_view();
    assert_eq!(view.edges.len(), 1);
    assert_eq!(view.node(&alpha).unwrap().weight, 9);
}

#[tokio::test]
async fn hub_note_projects_heavier_weight() {
    let engine = engine();
    let x = note_with(&engine, "X", "[[Other]]").await;
    note_with(&engine, "Other", "").await;
    for title in ["P", "Q", "R"] {
        note_with(&engine, title, "links to [[x]]").await;
    }

    let view = engine.graph_view();
    let node = view.node(&x).unwrap();
    assert_eq!(node.weight, 13);
    assert_eq!(node.tier, NodeTier::Hub);
    assert_eq!(node.color, NodeTier::Hub.color());
    assert_eq!(view.edges.len(), 4);
}

#[tokio::test]
async fn rename_moves_references_without_content_change() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha", "see [[Beta]]").await;
    let beta = note_with(&engine, "Beta", "").await;

    engine
        .update_note(&beta, NoteEdit::title("Gamma"))
        .await
        .unwrap();
    assert!(engine.note(&alpha).unwrap().forward_links.is_empty());
    assert!(engine.note(&beta).unwrap().backlinks.is_empty());

    // A second note taking over the old title picks up the reference
    let new_beta = engine.create_note("Beta").await.unwrap().id;
    assert_eq!(engine.note(&alpha).unwrap().forward_links, vec![new_beta.clone()]);
    assert_eq!(engine.note(&new_beta).unwrap().backlinks, vec![alpha]);
}

#[tokio::test]
async fn failed_write_back_is_repaired_by_reconcile() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha", "").await;
    let beta = note_with(&engine, "Beta", "").await;
    let before = engine.snapshot();

    // Content edit succeeds, then the link write-back fails after one note
    engine.store().fail_updates_after(2);
    let err = engine
        .update_note(&alpha, NoteEdit::content("[[Beta]]"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert!(engine.needs_reconcile());
    assert_eq!(engine.snapshot(), before);

    let partial = stored(engine.store()).await;
    assert!(!links_converged(&partial, &recompute_links(&partial)));

    engine.store().clear_faults();
    engine.reconcile().await.unwrap();
    assert!(!engine.needs_reconcile());
    assert_eq!(engine.note(&beta).unwrap().backlinks, vec![alpha.clone()]);

    let repaired = stored(engine.store()).await;
    assert!(links_converged(&repaired, &recompute_links(&repaired)));
}

#[tokio::test]
async fn search_and_neighbours_read_published_snapshot() {
    let engine = engine();
    let alpha = note_with(&engine, "Alpha Notes", "[[beta]]").await;
    let beta = note_with(&engine, "Beta", "[[alpha notes]]").await;

    let hits: Vec<String> = engine
        .search_titles("ALPHA")
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(hits, vec!["Alpha Notes".to_string()]);

    let neighbours = engine.linked_notes(&alpha).unwrap();
    assert_eq!(neighbours.backlinks.len(), 1);
    assert_eq!(neighbours.backlinks[0].id, beta);
    assert_eq!(neighbours.forward_links[0].id, beta);
}

#[tokio::test]
async fn recompute_is_idempotent_over_engine_passes() {
    let engine = engine();
    note_with(&engine, "A", "[[B]] [[C]] [[missing]]").await;
    note_with(&engine, "B", "[[A]]").await;
    note_with(&engine, "C", "[[B]] [[b]]").await;

    let first = engine.refresh().await.unwrap();
    let second = engine.refresh().await.unwrap();
    let links = |snapshot: &Snapshot| -> Vec<(NoteId, Vec<NoteId>, Vec<NoteId>)> {
        snapshot
            .iter()
            .map(|n| (n.id.clone(), n.forward_links.clone(), n.backlinks.clone()))
            .collect()
    };
    assert_eq!(links(&first), links(&second));
    for note in first.iter() {
        assert!(note.forward_links.iter().all(|id| first.get(id).is_some()));
        for target in &note.forward_links {
            assert!(first.get(target).unwrap().backlinks.contains(&note.id));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_engines_converge_through_watchers() {
    let store = Arc::new(MemoryStore::new());
    let left = Arc::new(LinkEngine::new(Arc::clone(&store), EngineConfig::default()));
    let right = Arc::new(LinkEngine::new(Arc::clone(&store), EngineConfig::default()));

    let watcher_config = WatcherConfig { debounce_ms: 25 };
    let cancel = CancellationToken::new();
    let handles = vec![
        ChangeWatcher::new(Arc::clone(&left), &watcher_config).spawn(cancel.clone()),
        ChangeWatcher::new(Arc::clone(&right), &watcher_config).spawn(cancel.clone()),
    ];

    let (a, b) = tokio::join!(left.create_note("Alpha"), right.create_note("Beta"));
    let (a, b) = (a.unwrap().id, b.unwrap().id);
    let (ra, rb) = tokio::join!(
        left.update_note(&a, NoteEdit::content("[[Beta]]")),
        right.update_note(&b, NoteEdit::content("[[Alpha]]")),
    );
    ra.unwrap();
    rb.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;

    let final_state = stored(&store).await;
    assert!(links_converged(&final_state, &recompute_links(&final_state)));
    assert_eq!(*left.snapshot(), final_state);
    assert_eq!(*right.snapshot(), final_state);
    assert_eq!(final_state.get(&a).unwrap().backlinks, vec![b.clone()]);
    assert_eq!(final_state.get(&b).unwrap().backlinks, vec![a]);

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}
