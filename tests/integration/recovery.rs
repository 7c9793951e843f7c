//! Replaying a task dump rebuilds a run's parent, children and final result.

use super::test_utils::Harness;
use gencomplete::recover::{recover, TaskRecord};
use gencomplete::{Disposition, GenerationStore};
use serde_json::json;
use uuid::Uuid;

fn rows(h: &Harness, orchestrator: Uuid) -> Vec<TaskRecord> {
    let segment = |index: i64, minute: u32| {
        json!({
            "id": Uuid::new_v4(),
            "task_type": "join_clips_segment",
            "project_id": h.project,
            "status": "Complete",
            "output_location": format!("s3://outputs/join{}.mp4", index),
            "created_at": format!("2026-05-02T09:{:02}:00Z", minute),
            "params": {
                "orchestrator_task_id": orchestrator,
                "join_index": index,
                "is_first_join": index == 0,
                "is_last_join": index == 1,
            },
        })
    };
    let stitch = json!({
        "id": Uuid::new_v4(),
        "task_type": "join_final_stitch",
        "project_id": h.project,
        "status": "Complete",
        "output_location": "s3://outputs/final.mp4",
        "created_at": "2026-05-02T09:30:00Z",
        "params": { "orchestrator_task_id_ref": orchestrator },
    });
    serde_json::from_value(json!([stitch, segment(1, 10), segment(0, 5)])).unwrap()
}

#[tokio::test]
async fn dump_replays_in_creation_order() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();

    let report = recover(&h.dispatcher, rows(&h, orchestrator), false)
        .await
        .unwrap();
    let dispositions: Vec<_> = report
        .replayed
        .iter()
        .map(|task| task.disposition)
        .collect();
    assert_eq!(
        dispositions,
        vec![
            Some(Disposition::ChildGeneration),
            Some(Disposition::ChildGeneration),
            Some(Disposition::ParentVariant),
        ]
    );

    let parent = h
        .store
        .find_generation_by_task_id(orchestrator)
        .await
        .unwrap()
        .unwrap();
    let orders: Vec<_> = h
        .children(&parent)
        .await
        .into_iter()
        .map(|child| child.child_order)
        .collect();
    assert_eq!(orders, vec![Some(0), Some(1)]);
    assert_eq!(h.variants(&parent).await.len(), 1);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let h = Harness::new();
    let report = recover(&h.dispatcher, rows(&h, Uuid::new_v4()), true)
        .await
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.replayed.len(), 3);
    assert!(report.replayed.iter().all(|task| task.disposition.is_none()));
    assert_eq!(h.store.generation_count(), 0);
}

#[tokio::test]
async fn second_replay_skips_recorded_tasks() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let dump = rows(&h, orchestrator);

    recover(&h.dispatcher, dump.clone(), false).await.unwrap();
    let count = h.store.generation_count();
    let again = recover(&h.dispatcher, dump, false).await.unwrap();

    assert!(again.replayed.is_empty());
    assert_eq!(again.skipped.len(), 3);
    assert_eq!(h.store.generation_count(), count);
}
