//! End-to-end CLI tests against the mock SendGrid server.

use std::collections::BTreeMap;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use sendgrid_sync::test_utils::fixture_tree;
use tempfile::TempDir;

use crate::mock_sendgrid::MockSendGrid;

/// Standard fixture: two templates, one shared footer partial.
fn standard_tree() -> TempDir {
    fixture_tree(&[
        (
            "templates/welcome.hbs",
            "<h1>Hello {{name}}</h1>{{> footer}}",
        ),
        ("templates/account/reset.hbs", "<p>Reset your password</p>{{> footer}}"),
        ("partials/footer.hbs", "<footer>The Team</footer>"),
    ])
}

fn sync_command(root: &Path, server: &MockSendGrid) -> Command {
    let mut cmd = Command::cargo_bin("sendgrid-sync").expect("binary builds");
    cmd.arg(root.join("templates"))
        .arg("-p")
        .arg(root.join("partials"))
        .env("SENDGRID_API_KEY", "test-api-key")
        .env("SENDGRID_BASE_URL", &server.base_url);
    cmd
}

fn read_mapping(path: &Path) -> BTreeMap<String, String> {
    let json = std::fs::read_to_string(path).expect("mapping file written");
    serde_json::from_str(&json).expect("mapping file is valid JSON")
}

#[test]
fn test_dry_run_previews_without_mutating() {
    let tree = standard_tree();
    let server = MockSendGrid::start(vec![MockSendGrid::template(
        "tpl-untouched",
        "ci-untouched",
        &[("ver-1", "v1")],
    )]);
    let output = tree.path().join("ids.json");

    sync_command(tree.path(), &server)
        .arg("--dry-run")
        .arg("--template-prefix")
        .arg("ci-")
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    let mapping = read_mapping(&output);
    assert!(
        mapping["welcome"].starts_with("sendgrid-dummy-id-create-ci-welcome"),
        "got {mapping:?}"
    );
    assert!(mapping["account/reset"].starts_with("sendgrid-dummy-id-create-ci-account/reset"));
    assert_eq!(mapping["untouched"], "tpl-untouched");

    // Only the inventory fetch reaches the server.
    let log = server.request_log();
    assert_eq!(log.len(), 1, "unexpected requests: {log:?}");
    assert!(log[0].starts_with("GET /v3/templates"));
    assert_eq!(server.templates().len(), 1);
}

#[test]
fn test_live_sync_creates_templates_and_versions() {
    let tree = standard_tree();
    let server = MockSendGrid::start(Vec::new());
    let output = tree.path().join("ids.json");

    sync_command(tree.path(), &server)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("SendGrid sync completed."));

    let remote = server.templates();
    assert_eq!(remote.len(), 2);

    let welcome = remote
        .iter()
        .find(|t| t["name"] == "welcome")
        .expect("welcome template created");
    let versions = welcome["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["name"], "v1");
    assert_eq!(versions[0]["subject"], "{{subject}}");

    // Uploaded body has the partial inlined and the variables untouched.
    let html = versions[0]["html_content"].as_str().unwrap();
    assert!(html.contains("{{name}}"), "variables must survive: {html}");
    assert!(html.contains("<footer>The Team</footer>"), "partial must be inlined: {html}");
    assert!(!html.contains("{{> footer}}"), "partial call must be expanded: {html}");

    let mapping = read_mapping(&output);
    assert_eq!(mapping["welcome"], welcome["id"].as_str().unwrap());
    assert!(mapping.contains_key("account/reset"));
}

#[test]
fn test_live_sync_rotates_version_history() {
    let tree = fixture_tree(&[("templates/welcome.hbs", "<h1>Hello</h1>")]);
    let server = MockSendGrid::start(vec![MockSendGrid::template(
        "tpl-welcome",
        "welcome",
        &[("ver-1", "v1"), ("ver-2", "v2"), ("ver-3", "v3")],
    )]);

    let mut cmd = Command::cargo_bin("sendgrid-sync").expect("binary builds");
    cmd.arg(tree.path().join("templates"))
        .env("SENDGRID_API_KEY", "test-api-key")
        .env("SENDGRID_BASE_URL", &server.base_url)
        .assert()
        .success();

    // v4 gets created; with the default retention of 2 only v3 and v4 remain.
    let remote = server.templates();
    assert_eq!(remote.len(), 1);
    let names: Vec<&str> = remote[0]["versions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["v3", "v4"]);

    let log = server.request_log();
    assert!(log.contains(&"DELETE /v3/templates/tpl-welcome/versions/ver-1".to_string()));
    assert!(log.contains(&"DELETE /v3/templates/tpl-welcome/versions/ver-2".to_string()));
}

#[test]
fn test_missing_api_key_fails() {
    let tree = standard_tree();

    Command::cargo_bin("sendgrid-sync")
        .expect("binary builds")
        .arg(tree.path().join("templates"))
        .env_remove("SENDGRID_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"))
        .stderr(predicate::str::contains("SENDGRID_API_KEY"));
}

#[test]
fn test_missing_templates_dir_fails() {
    Command::cargo_bin("sendgrid-sync")
        .expect("binary builds")
        .arg("/nonexistent/templates")
        .env("SENDGRID_API_KEY", "test-api-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/templates"));
}

#[test]
fn test_unknown_target_fails_before_remote_calls() {
    let tree = standard_tree();
    let server = MockSendGrid::start(Vec::new());

    sync_command(tree.path(), &server)
        .arg("-t")
        .arg("no-such-template")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-template"));

    assert!(server.request_log().is_empty());
}

#[test]
fn test_target_restricts_sync_scope() {
    let tree = standard_tree();
    let server = MockSendGrid::start(Vec::new());

    sync_command(tree.path(), &server).arg("-t").arg("welcome").assert().success();

    let remote = server.templates();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["name"], "welcome");
}
