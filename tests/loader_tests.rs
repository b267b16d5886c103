//! Load a stored workflow document and run it end to end

mod common;

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use browserflow::engine::RunStatus;
use browserflow::workflow::{ExecutionContext, WorkflowLoader};

use common::*;

fn write_checkout_workflow(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("checkout.yaml");
    fs::write(
        &path,
        r##"
name: checkout
variables:
  items:
    - "apples"
    - "pears"
actions:
  - type: navigate
    url: "https://shop.example.com"
  - type: loop
    name: add items
    loop_type: for_each
    source: items
    actions:
      - type: type
        selector: "#search"
        value:
          source: context
          variable: loop_item
      - type: click
        selector: "#add-to-cart"
  - type: conditional
    condition:
      kind: element_present
      selector: "#cart-count"
    true_actions:
      - type: click
        selector: "#checkout"
    false_actions: []
"##,
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_loaded_workflow_runs_end_to_end() {
    let dir = tempdir().unwrap();
    let path = write_checkout_workflow(dir.path());

    let document = WorkflowLoader::load_file(&path).unwrap();
    assert_eq!(document.name, "checkout");
    assert_eq!(document.actions.len(), 3);

    let harness = Harness::new();
    let mut ctx = ExecutionContext::with_variables(document.variables.clone());
    let report = harness
        .runner()
        .run_definitions(&document.name, &document.actions, &mut ctx)
        .await
        .unwrap();

    assert_eq!(report.final_status, RunStatus::Success);
    assert_eq!(
        harness.driver.calls().await,
        vec![
            "navigate https://shop.example.com",
            "type #search apples",
            "click #add-to-cart",
            "type #search pears",
            "click #add-to-cart",
            "element_present #cart-count",
            "click #checkout",
        ]
    );
}

#[tokio::test]
async fn test_directory_of_workflows_all_run() {
    let dir = tempdir().unwrap();
    write_checkout_workflow(dir.path());
    fs::write(
        dir.path().join("smoke.json"),
        r#"{
            "name": "smoke",
            "actions": [
                { "type": "navigate", "url": "https://shop.example.com/health" },
                { "type": "screenshot", "path": "/tmp/health.png" }
            ]
        }"#,
    )
    .unwrap();

    let documents = WorkflowLoader::load_directory(dir.path()).unwrap();
    assert_eq!(documents.len(), 2);

    for document in &documents {
        let harness = Harness::new();
        let mut ctx = ExecutionContext::with_variables(document.variables.clone());
        let report = harness
            .runner()
            .run_definitions(&document.name, &document.actions, &mut ctx)
            .await
            .unwrap();
        assert_eq!(report.final_status, RunStatus::Success, "{}", document.name);
    }
}
