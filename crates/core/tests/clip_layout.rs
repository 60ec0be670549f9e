//! Integration tests for annotation ingestion feeding the output layout.

use capsnet_core::annotation::parse_annotations;
use capsnet_core::layout::{prepare_output_layout, read_label_list, LabelListMode};

// ---------------------------------------------------------------------------
// Test: CSV table to clip tasks
// ---------------------------------------------------------------------------

/// A single annotated row maps to `<root>/<split>/<label>/<id>_<start>_<end>.mp4`.
#[test]
fn annotated_row_maps_to_label_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let csv = dir.path().join("kinetics_train.csv");
    std::fs::write(
        &csv,
        "label,youtube_id,time_start,time_end,split\ndancing,abc12345678,10,15,train\n",
    )
    .expect("write csv");

    let records = parse_annotations(&csv).expect("parse");
    let root = dir.path().join("kinetics600");
    let layout = prepare_output_layout(
        &records,
        &root,
        "train",
        &dir.path().join("kinetics600_labels.txt"),
        LabelListMode::FirstWriterWins,
    )
    .expect("layout");

    let tasks = layout.tasks_for(&records);
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].output_path,
        root.join("train/dancing/abc12345678_000010_000015.mp4")
    );
    assert_eq!(tasks[0].clip_id, "abc12345678_000010_000015");
}

/// Every row becomes a task, including rows the validator flags.
#[test]
fn every_row_becomes_a_task() {
    let dir = tempfile::tempdir().expect("temp dir");
    let csv = dir.path().join("kinetics_val.csv");
    std::fs::write(
        &csv,
        "youtube_id,time_start,time_end,label\n\
         abc12345678,10,15,dancing\n\
         bad,30,20,dancing\n\
         xyz98765432,0,10,archery\n",
    )
    .expect("write csv");

    let records = parse_annotations(&csv).expect("parse");
    let labels_path = dir.path().join("labels.txt");
    let layout = prepare_output_layout(
        &records,
        dir.path(),
        "val",
        &labels_path,
        LabelListMode::FirstWriterWins,
    )
    .expect("layout");

    assert_eq!(layout.tasks_for(&records).len(), 3);
    assert_eq!(
        read_label_list(&labels_path).expect("labels"),
        vec!["dancing", "archery"]
    );
}
