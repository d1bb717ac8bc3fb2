//! Integration tests for loading and composing the demo model.
use gridplan::composition::compose;
use gridplan::model::Model;
use gridplan::simulation::validate;
use std::path::PathBuf;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

#[test]
fn test_load_model() {
    let model = Model::from_path(get_model_dir()).unwrap();
    assert_eq!(model.zones.len(), 3);
    assert_eq!(model.projects.len(), 5);
    assert_eq!(model.transmission_lines.len(), 3);
    assert_eq!(model.temporal.subproblem_stages(), [(1, 1), (2, 1)]);
    assert_eq!(model.capacity_data.vintages_for(&"wind".into()).len(), 2);
}

#[test]
fn test_compose_subproblem() {
    let model = Model::from_path(get_model_dir()).unwrap();
    let temporal = model.temporal.for_subproblem_stage(1, 1).unwrap();
    let composed = compose(&model, &temporal).unwrap();

    // The ring of three lines has a single cycle in the one period of the subproblem
    assert_eq!(composed.cycles().count(), 1);
    assert!(composed.problem().is_mip());
}

#[test]
fn test_validate_demo() {
    let model = Model::from_path(get_model_dir()).unwrap();
    let reports = validate(&model).unwrap();
    assert_eq!(reports.len(), 2);
    for (_, report) in &reports {
        assert!(report.contains("nuclear", "cannot provide reserves"));
    }
}
