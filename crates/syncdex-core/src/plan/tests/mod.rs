
use crate::{
    error::{ErrorClass, ErrorOrigin},
    event::MutationEvent,
    identity::{EntityTypeId, IndexingId},
    obs,
    op::IndexOperation,
    plan::IndexingPlan,
    registry::BuilderRegistry,
    test_support::{FailingSink, StubBuilder, entity},
    traits::{CollectingSink, DocumentBuilder, InterceptDecision},
};
use std::sync::Arc;

const BOOK: EntityTypeId = EntityTypeId::new("library::Book");
const AUTHOR: EntityTypeId = EntityTypeId::new("library::Author");
const PARAGRAPH: EntityTypeId = EntityTypeId::new("library::Paragraph");
const NODE: EntityTypeId = EntityTypeId::new("graph::Node");

fn registry(builders: impl IntoIterator<Item = StubBuilder>) -> Arc<BuilderRegistry> {
    let mut registry = BuilderRegistry::new();
    for builder in builders {
        registry
            .register(Arc::new(builder) as Arc<dyn DocumentBuilder>)
            .unwrap();
    }

    Arc::new(registry)
}

fn book_plan() -> IndexingPlan {
    IndexingPlan::new(registry([StubBuilder::new(BOOK)]))
}

fn uint(id: u64) -> IndexingId {
    IndexingId::Uint(id)
}

// ---------------------------------------------------------------------------
// Coalescing
// ---------------------------------------------------------------------------

#[test]
fn worked_example_coalesces_to_two_operations() {
    // ADD(1), ADD(1), DELETE(2), UPDATE(1): key 1 stays a plain add (created
    // in-plan, the update is a no-op on it), key 2 is a bare delete.
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::delete(BOOK, entity(2)))
        .unwrap();
    plan.add_work(MutationEvent::update(BOOK, entity(1)))
        .unwrap();

    plan.process_contained_in_and_prepare_execution().unwrap();
    let ops = plan.planned_operations().unwrap();

    assert_eq!(ops.len(), 2);
    assert!(matches!(
        &ops[0],
        IndexOperation::Add { entity_type, id, .. } if *entity_type == BOOK && *id == uint(1)
    ));
    assert!(matches!(
        &ops[1],
        IndexOperation::Delete { entity_type, id } if *entity_type == BOOK && *id == uint(2)
    ));
}

#[test]
fn in_plan_add_then_delete_emits_nothing() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::delete(BOOK, entity(1)))
        .unwrap();

    assert_eq!(plan.planned_operations().unwrap(), vec![]);
}

#[test]
fn delete_then_add_emits_a_replace() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::delete(BOOK, entity(1)))
        .unwrap();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(
        &ops[0],
        IndexOperation::Update { id, .. } if *id == uint(1)
    ));
}

#[test]
fn update_for_an_unseen_key_emits_a_replace() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::update(BOOK, entity(7)))
        .unwrap();

    let ops = plan.planned_operations().unwrap();
    assert!(matches!(&ops[0], IndexOperation::Update { .. }));
}

#[test]
fn purge_all_dominates_prior_per_id_work() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::update(BOOK, entity(2)))
        .unwrap();
    plan.add_work(MutationEvent::delete(BOOK, entity(3)))
        .unwrap();
    plan.add_work(MutationEvent::purge_all(BOOK)).unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(
        ops,
        vec![IndexOperation::PurgeAll { entity_type: BOOK }]
    );
}

#[test]
fn work_after_purge_all_is_queued_again() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::purge_all(BOOK)).unwrap();
    plan.add_work(MutationEvent::add(BOOK, entity(4))).unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], IndexOperation::PurgeAll { .. }));
    assert!(matches!(&ops[1], IndexOperation::Add { id, .. } if *id == uint(4)));
}

#[test]
fn cross_type_blocks_keep_insertion_order() {
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(BOOK),
        StubBuilder::new(AUTHOR),
    ]));

    // Interleaved events; flattening groups by type in type-insertion order,
    // per-id insertion order within each type.
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::add(AUTHOR, entity(10)))
        .unwrap();
    plan.add_work(MutationEvent::add(BOOK, entity(2))).unwrap();
    plan.add_work(MutationEvent::add(AUTHOR, entity(11)))
        .unwrap();

    let ops = plan.planned_operations().unwrap();
    let keys: Vec<_> = ops
        .iter()
        .map(|op| (op.entity_type(), op.id().cloned().unwrap()))
        .collect();

    assert_eq!(
        keys,
        vec![
            (BOOK, uint(1)),
            (BOOK, uint(2)),
            (AUTHOR, uint(10)),
            (AUTHOR, uint(11)),
        ]
    );
}

// ---------------------------------------------------------------------------
// Id resolution
// ---------------------------------------------------------------------------

#[test]
fn purge_without_entity_uses_the_provided_id() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::purge(BOOK, 42u64)).unwrap();

    let ops = plan.planned_operations().unwrap();
    assert!(matches!(&ops[0], IndexOperation::Delete { id, .. } if *id == uint(42)));
}

#[test]
fn provided_id_type_rejects_events_without_an_id() {
    let mut plan = IndexingPlan::new(registry([StubBuilder::new(BOOK).provided_id()]));

    let err = plan
        .add_work(MutationEvent::add(BOOK, entity(1)))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.origin, ErrorOrigin::Work);
}

#[test]
fn provided_id_type_uses_the_event_id() {
    let mut plan = IndexingPlan::new(registry([StubBuilder::new(BOOK).provided_id()]));
    plan.add_work(MutationEvent::add(BOOK, entity(1)).with_provided_id("isbn-0553573403"))
        .unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(
        ops[0].id(),
        Some(&IndexingId::from("isbn-0553573403"))
    );
}

#[test]
fn identifier_rollback_trusts_the_event_id_over_the_snapshot() {
    let mut plan = book_plan();

    // The snapshot claims id 5, but the event was observed after a rollback;
    // the entity's own id field is no longer trustworthy.
    plan.add_work(
        MutationEvent::delete(BOOK, entity(5))
            .with_provided_id(9u64)
            .identifier_rolled_back(),
    )
    .unwrap();

    let ops = plan.planned_operations().unwrap();
    assert!(matches!(&ops[0], IndexOperation::Delete { id, .. } if *id == uint(9)));
}

#[test]
fn unknown_entity_type_is_unsupported() {
    let mut plan = book_plan();
    let err = plan
        .add_work(MutationEvent::add(AUTHOR, entity(1)))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::Registry);
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Paragraphs are contained in their book: a paragraph change re-indexes the
/// book with id `paragraph.id / 100`.
fn paragraph_registry() -> Arc<BuilderRegistry> {
    registry([
        StubBuilder::new(PARAGRAPH)
            .contained_in(|paragraph| vec![(BOOK, entity(paragraph.id / 100))]),
        StubBuilder::new(BOOK),
    ])
}

#[test]
fn contained_in_change_reindexes_the_container() {
    let mut plan = IndexingPlan::new(paragraph_registry());
    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();

    plan.process_contained_in_and_prepare_execution().unwrap();
    let ops = plan.planned_operations().unwrap();

    assert_eq!(ops.len(), 2);
    assert!(matches!(
        &ops[0],
        IndexOperation::Update { entity_type, id, .. }
            if *entity_type == PARAGRAPH && *id == uint(101)
    ));
    assert!(matches!(
        &ops[1],
        IndexOperation::Update { entity_type, id, .. }
            if *entity_type == BOOK && *id == uint(1)
    ));
}

#[test]
fn already_queued_container_is_not_duplicated() {
    let mut plan = IndexingPlan::new(paragraph_registry());
    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.add_work(MutationEvent::update(PARAGRAPH, entity(102)))
        .unwrap();

    plan.process_contained_in_and_prepare_execution().unwrap();
    let ops = plan.planned_operations().unwrap();

    // Both paragraphs point at book 1; the book is queued exactly once.
    let books = ops.iter().filter(|op| op.entity_type() == BOOK).count();
    assert_eq!(books, 1);
    assert_eq!(ops.len(), 3);
}

#[test]
fn two_cycle_terminates_via_the_visited_set() {
    // Node 1 contains node 2 and vice versa.
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(NODE).contained_in(|node| vec![(NODE, entity(node.id ^ 1))]),
    ]));

    plan.add_work(MutationEvent::update(NODE, entity(0)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 2);
}

#[test]
fn unbounded_chain_is_cut_by_the_depth_guard() {
    // Every node claims containment in a fresh successor; only the guard
    // bounds the walk. depth hops queue depth + 1 cascade entries past the
    // direct one.
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(NODE).contained_in(|node| vec![(NODE, entity(node.id + 1))]),
    ]))
    .with_cascade_depth(3);

    plan.add_work(MutationEvent::update(NODE, entity(0)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 5);
}

#[test]
fn cascade_on_provided_id_type_is_skipped_not_fatal() {
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(PARAGRAPH).contained_in(|_| vec![(BOOK, entity(1))]),
        StubBuilder::new(BOOK).provided_id(),
    ]))
    .debug();

    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    // Accepted best-effort degradation: the book is under-reindexed.
    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].entity_type(), PARAGRAPH);
}

#[test]
fn interception_skip_queues_nothing_for_the_container() {
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(PARAGRAPH).contained_in(|_| vec![(BOOK, entity(1))]),
        StubBuilder::new(BOOK).intercept(InterceptDecision::Skip),
    ]));

    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 1);
}

#[test]
fn interception_remove_queues_a_delete_for_the_container() {
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(PARAGRAPH).contained_in(|_| vec![(BOOK, entity(1))]),
        StubBuilder::new(BOOK).intercept(InterceptDecision::Remove),
    ]));

    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let ops = plan.planned_operations().unwrap();
    assert_eq!(ops.len(), 2);
    assert!(matches!(
        &ops[1],
        IndexOperation::Delete { entity_type, id } if *entity_type == BOOK && *id == uint(1)
    ));
}

#[test]
fn explicit_update_interception_behaves_like_the_default() {
    let mut plan = IndexingPlan::new(registry([
        StubBuilder::new(PARAGRAPH).contained_in(|_| vec![(BOOK, entity(1))]),
        StubBuilder::new(BOOK).intercept(InterceptDecision::Update),
    ]));

    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let ops = plan.planned_operations().unwrap();
    assert!(matches!(
        &ops[1],
        IndexOperation::Update { entity_type, .. } if *entity_type == BOOK
    ));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn cascade_processing_runs_exactly_once() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();

    plan.process_contained_in_and_prepare_execution().unwrap();
    let err = plan
        .process_contained_in_and_prepare_execution()
        .unwrap_err();

    assert!(err.is_invariant_violation());
    assert_eq!(err.origin, ErrorOrigin::Plan);
}

#[test]
fn work_after_cascade_processing_is_rejected() {
    let mut plan = book_plan();
    plan.process_contained_in_and_prepare_execution().unwrap();

    let err = plan
        .add_work(MutationEvent::add(BOOK, entity(1)))
        .unwrap_err();
    assert!(err.is_invariant_violation());
}

#[test]
fn size_counts_events_and_clear_resets() {
    let mut plan = book_plan();
    assert!(plan.is_empty());

    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::update(BOOK, entity(1)))
        .unwrap();
    plan.add_work(MutationEvent::purge_all(BOOK)).unwrap();
    assert_eq!(plan.size(), 3);

    plan.clear();
    assert!(plan.is_empty());
    assert_eq!(plan.planned_operations().unwrap(), vec![]);

    // A cleared plan accepts a fresh unit of work, cascade pass included.
    plan.add_work(MutationEvent::add(BOOK, entity(2))).unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();
    assert_eq!(plan.planned_operations().unwrap().len(), 1);
}

#[test]
fn execute_into_hands_operations_to_the_sink() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();
    plan.add_work(MutationEvent::purge(BOOK, 2u64)).unwrap();

    let mut sink = CollectingSink::new();
    plan.execute_into(&mut sink).unwrap();

    assert_eq!(sink.operations().len(), 2);
}

#[test]
fn sink_failures_propagate() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();

    let err = plan.execute_into(&mut FailingSink).unwrap_err();
    assert_eq!(err.origin, ErrorOrigin::Sink);
}

#[test]
fn documents_carry_builder_projected_fields() {
    let mut plan = book_plan();
    plan.add_work(MutationEvent::add(BOOK, entity(1))).unwrap();

    let ops = plan.planned_operations().unwrap();
    let IndexOperation::Add { document, .. } = &ops[0] else {
        panic!("expected an add operation");
    };

    let json = serde_json::to_value(document).unwrap();
    assert_eq!(json["fields"]["label"], serde_json::json!({"Text": "entity-1"}));
}

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

#[test]
fn pipeline_counters_track_the_plan_lifecycle() {
    obs::metrics_reset_all();

    let mut plan = IndexingPlan::new(paragraph_registry());
    plan.add_work(MutationEvent::update(PARAGRAPH, entity(101)))
        .unwrap();
    plan.add_work(MutationEvent::purge_all(BOOK)).unwrap();
    plan.process_contained_in_and_prepare_execution().unwrap();
    plan.planned_operations().unwrap();

    let report = obs::metrics_report();
    assert_eq!(report.work_merged, 1);
    assert_eq!(report.purge_all_requests, 1);
    assert_eq!(report.cascade_work_added, 1);
    assert_eq!(report.plans_flattened, 1);
    assert_eq!(report.operations_emitted, 3);
    assert_eq!(
        report.entities.get(PARAGRAPH.as_str()).unwrap().work_merged,
        1
    );
}
