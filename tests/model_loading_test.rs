//! Frozen artifact loading: every inconsistency fails fast with a
//! path-free `ModelUnavailable` error.

mod common;

use chandas::{ChandasError, ErrorKind, ModelContext, ModelPaths};
use serde_json::{json, Value};

use common::{artifacts, write_artifacts};

/// Write the reference artifacts with one of them replaced, then load.
fn load_with(
    labels: Option<Value>,
    scaler: Option<Value>,
    ensemble: Option<Value>,
) -> Result<ModelContext, ChandasError> {
    let a = artifacts();
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(
        dir.path(),
        labels.as_ref().unwrap_or(&a.labels),
        scaler.as_ref().unwrap_or(&a.scaler),
        ensemble.as_ref().unwrap_or(&a.ensemble),
    );
    ModelContext::load(dir.path())
}

fn unavailable(result: Result<ModelContext, ChandasError>) -> String {
    let err = result.expect_err("load should fail");
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    err.to_string()
}

#[test]
fn test_reference_artifacts_load() {
    let ctx = load_with(None, None, None).unwrap();
    assert_eq!(ctx.n_classes(), 10);
    assert_eq!(ctx.labels().len(), 10);
    assert_eq!(ctx.ensemble().inner().forest().trees().len(), 12);
    let names: Vec<&str> = ctx.labels().iter().collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_missing_file_hides_path() {
    let dir = tempfile::tempdir().unwrap();
    let a = artifacts();
    write_artifacts(dir.path(), &a.labels, &a.scaler, &a.ensemble);
    std::fs::remove_file(dir.path().join("scaler.json")).unwrap();

    let message = unavailable(ModelContext::load(dir.path()));
    assert!(message.contains("feature scaler"), "{message}");
    assert!(!message.contains(&dir.path().display().to_string()), "{message}");
}

#[test]
fn test_custom_artifact_names() {
    let dir = tempfile::tempdir().unwrap();
    let a = artifacts();
    let paths = ModelPaths {
        labels: dir.path().join("meters.json"),
        scaler: dir.path().join("std.json"),
        ensemble: dir.path().join("model.json"),
    };
    std::fs::write(&paths.labels, a.labels.to_string()).unwrap();
    std::fs::write(&paths.scaler, a.scaler.to_string()).unwrap();
    std::fs::write(&paths.ensemble, a.ensemble.to_string()).unwrap();
    assert_eq!(ModelContext::load_from(&paths).unwrap().n_classes(), 10);
}

#[test]
fn test_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let a = artifacts();
    write_artifacts(dir.path(), &a.labels, &a.scaler, &a.ensemble);
    std::fs::write(dir.path().join("labels.json"), "{ not json").unwrap();
    let message = unavailable(ModelContext::load(dir.path()));
    assert!(message.contains("label table"), "{message}");
}

#[test]
fn test_label_count_mismatch() {
    let mut names = artifacts().names.clone();
    names.pop();
    let message = unavailable(load_with(Some(json!({ "labels": names })), None, None));
    assert!(message.contains("9 labels"), "{message}");
}

#[test]
fn test_partial_meter_set_rejected() {
    let names: Vec<String> = artifacts().names.iter().take(3).cloned().collect();
    let message = unavailable(load_with(Some(json!({ "labels": names })), None, None));
    assert!(message.contains("3 labels"), "{message}");
}

#[test]
fn test_duplicate_labels() {
    let mut names = artifacts().names.clone();
    names[1] = names[0].clone();
    unavailable(load_with(Some(json!({ "labels": names })), None, None));
}

#[test]
fn test_feature_name_mismatch() {
    let mut scaler = artifacts().scaler.clone();
    let names = scaler["feature_names"].as_array_mut().unwrap();
    names.swap(0, 1);
    let message = unavailable(load_with(None, Some(scaler), None));
    assert!(message.contains("feature 0"), "{message}");
}

#[test]
fn test_scaler_width_and_finiteness() {
    let mut short = artifacts().scaler.clone();
    short["mean"].as_array_mut().unwrap().pop();
    unavailable(load_with(None, Some(short), None));

    let mut negative = artifacts().scaler.clone();
    negative["scale"][3] = json!(-1.0);
    unavailable(load_with(None, Some(negative), None));
}

#[test]
fn test_unknown_field_rejected() {
    let mut labels = artifacts().labels.clone();
    labels["version"] = json!(2);
    unavailable(load_with(Some(labels), None, None));
}

#[test]
fn test_wrong_feature_count() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["n_features"] = json!(40);
    let message = unavailable(load_with(None, None, Some(ensemble)));
    assert!(message.contains("40"), "{message}");
}

#[test]
fn test_calibrator_count_mismatch() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["calibration"]["classes"].as_array_mut().unwrap().pop();
    unavailable(load_with(None, None, Some(ensemble)));
}

#[test]
fn test_unsupported_calibration_method() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["calibration"]["method"] = json!("isotonic");
    let message = unavailable(load_with(None, None, Some(ensemble)));
    assert!(message.contains("isotonic"), "{message}");
}

#[test]
fn test_boosted_model_count_mismatch() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["boosted"]["models"].as_array_mut().unwrap().pop();
    unavailable(load_with(None, None, Some(ensemble)));
}

#[test]
fn test_invalid_voting_weights() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["voting"]["weights"] = json!([0.0, 0.0]);
    unavailable(load_with(None, None, Some(ensemble)));

    let mut ensemble = artifacts().ensemble.clone();
    ensemble["voting"]["weights"] = json!([-1.0, 2.0]);
    unavailable(load_with(None, None, Some(ensemble)));
}

#[test]
fn test_tree_with_backward_child() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["forest"]["trees"][0]["children_left"][0] = json!(0);
    let message = unavailable(load_with(None, None, Some(ensemble)));
    assert!(message.contains("tree 0"), "{message}");
}

#[test]
fn test_tree_with_out_of_range_feature() {
    let mut ensemble = artifacts().ensemble.clone();
    ensemble["forest"]["trees"][2]["feature"][0] = json!(41);
    let message = unavailable(load_with(None, None, Some(ensemble)));
    assert!(message.contains("tree 2"), "{message}");
}

#[test]
fn test_leaf_row_width_mismatch() {
    let mut ensemble = artifacts().ensemble.clone();
    let tree = &mut ensemble["forest"]["trees"][0];
    let leaf = tree["children_left"]
        .as_array()
        .unwrap()
        .iter()
        .position(|c| c == &json!(-1))
        .unwrap();
    tree["value"][leaf].as_array_mut().unwrap().pop();
    unavailable(load_with(None, None, Some(ensemble)));
}
