//! Integration tests for `recipeci order`

mod common;

use common::{chain_project, stderr, stdout, TestProject};

#[test]
fn test_order_all() {
    let project = chain_project();
    let output = project.run(&["order", ".", "--all"]);
    assert!(output.status.success(), "stderr={}", stderr(&output));
    assert_eq!(stdout(&output), "base\nlib\napp\ntool\n");
}

#[test]
fn test_order_levels() {
    let project = chain_project();

    let zero = project.run(&["order", ".", "--package", "app"]);
    assert_eq!(stdout(&zero), "app\n");

    let two = project.run(&["order", ".", "--package", "app", "--level", "2"]);
    assert_eq!(stdout(&two), "base\nlib\napp\n");
}

#[test]
fn test_order_changed_depth() {
    let project = chain_project();

    let one = project.run(&["order", ".", "--changed", "base", "--depth", "1"]);
    assert_eq!(stdout(&one), "base\nlib\n");

    let two = project.run(&["order", ".", "--changed", "base", "--depth", "2"]);
    assert_eq!(stdout(&two), "base\nlib\napp\n");
}

#[test]
fn test_order_json() {
    let project = chain_project();
    let output = project.run(&["--json", "order", ".", "--package", "lib", "--package", "tool"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["order"], serde_json::json!(["lib", "tool"]));
}

#[test]
fn test_order_nested_recipes() {
    let project = TestProject::new();
    project.write_recipe("group/inner", "inner", &["top"]);
    project.write_recipe("top", "top", &[]);

    let flat = project.run(&["order", ".", "--all"]);
    assert_eq!(stdout(&flat), "top\n");

    let nested = project.run(&["order", ".", "--all", "--nested"]);
    assert_eq!(stdout(&nested), "top\ninner\n");
}

#[test]
fn test_missing_directory() {
    let project = TestProject::new();
    let output = project.run(&["order", "nope", "--all"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Recipe directory not found"));
}
