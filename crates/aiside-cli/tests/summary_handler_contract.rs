use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

const COURSE: &str = "course-v1:edX+Demo+2024";
const UNIT: &str = "block-v1:edX+Demo+2024+type@vertical+block@unit1";
const SHORT_UNIT: &str = "block-v1:edX+Demo+2024+type@vertical+block@short";
const HANDLER_URL: &str = "http://localhost:18000/xblock/unit1/handler_noauth/summary_handler";

fn tree() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("course_tree.json")
}

fn aiside(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aiside"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("AISIDE_CONFIG")
        .env_remove("AISIDE_SUMMARY_HOOK_HOST")
        .env_remove("AISIDE_SUMMARY_HOOK_JS_PATH")
        .env_remove("AISIDE_AISPOT_LMS_NAME")
        .env_remove("AISIDE_SUMMARY_HOOK_MIN_SIZE")
        .env_remove("AISIDE_HTML_TAGS_TO_REMOVE");
    cmd
}

/// `aiside.toml` in `dir`, picked up by discovery.
fn write_config(dir: &Path, flags: &str) {
    let cfg = format!(
        r#"
min_size = 100
hook_host = "https://ai.example.com"
hook_js_path = "/static/hook.js"
aispot_lms_name = "lms.example.com"

{flags}
"#
    );
    std::fs::write(dir.join("aiside.toml"), cfg).unwrap();
}

const STAFF_ONLY: &str = r#"
[flags.staff_only]
courses = ["course-v1:edX+Demo+2024"]
"#;

fn run_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().expect("run aiside");
    assert!(
        out.status.success(),
        "aiside failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse json")
}

#[test]
fn summary_is_forbidden_for_non_staff() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), STAFF_ONLY);
    let v = run_json(
        aiside(tmp.path())
            .args(["summary", "--unit", UNIT, "--tree"])
            .arg(tree()),
    );
    assert_eq!(v["status"].as_u64(), Some(403));
}

#[test]
fn summary_is_not_found_when_the_aside_is_off() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), "");
    let v = run_json(
        aiside(tmp.path())
            .args(["summary", "--staff", "--unit", UNIT, "--tree"])
            .arg(tree()),
    );
    assert_eq!(v["status"].as_u64(), Some(404));
}

#[test]
fn summary_serves_unit_text_to_staff() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), STAFF_ONLY);
    let v = run_json(
        aiside(tmp.path())
            .args(["summary", "--staff", "--unit", UNIT, "--tree"])
            .arg(tree()),
    );
    assert_eq!(v["status"].as_u64(), Some(200));
    let body = &v["body"];
    assert_eq!(body["content_id"].as_str(), Some(UNIT));
    assert_eq!(body["course_id"].as_str(), Some(COURSE));
    assert_eq!(body["published_on"].as_str(), Some("2024-03-01T09:00:00Z"));

    let data = body["data"].as_array().expect("data");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["content_type"].as_str(), Some("TEXT"));
    assert_eq!(data[0]["edited_on"].as_str(), Some("2024-03-02T11:30:00Z"));
    assert_eq!(data[1]["content_type"].as_str(), Some("VIDEO"));
    assert!(data[1]["published_on"].is_null());
}

#[test]
fn summary_of_a_short_unit_has_no_data() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), STAFF_ONLY);
    let v = run_json(
        aiside(tmp.path())
            .args(["summary", "--staff", "--unit", SHORT_UNIT, "--tree"])
            .arg(tree()),
    );
    assert_eq!(v["status"].as_u64(), Some(200));
    assert_eq!(v["body"], serde_json::json!({ "data": [] }));
}

#[test]
fn fragment_carries_launcher_attributes() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), STAFF_ONLY);
    aiside(tmp.path())
        .args([
            "fragment",
            "--staff",
            "--unit",
            UNIT,
            "--handler-url",
            HANDLER_URL,
            "--user-id",
            "u1",
            "--role",
            "student",
            "--enrollment-mode",
            "verified",
            "--tree",
        ])
        .arg(tree())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"data-url-api="https://ai.example.com""#))
        .stdout(predicate::str::contains(format!(r#"data-course-id="{COURSE}""#)))
        .stdout(predicate::str::contains(format!(r#"data-content-id="{UNIT}""#)))
        .stdout(predicate::str::contains(
            r#"data-handler-url="http://lms.example.com:18000/xblock/unit1/handler/summary_handler""#,
        ))
        .stdout(predicate::str::contains(r#"data-last-updated="2024-03-02T11:30:00Z""#))
        .stdout(predicate::str::contains(r#"data-user-role="student verified""#))
        .stdout(predicate::str::contains(
            r#"src="https://ai.example.com/static/hook.js""#,
        ));
}

#[test]
fn fragment_is_empty_when_the_aside_does_not_apply() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(tmp.path(), STAFF_ONLY);
    // Staff-only flag, but the viewer is not staff and no settings enable the course.
    aiside(tmp.path())
        .args(["fragment", "--unit", UNIT, "--handler-url", HANDLER_URL, "--tree"])
        .arg(tree())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn fragment_follows_course_settings_for_learners() {
    let tmp = tempfile::tempdir().unwrap();
    write_config(
        tmp.path(),
        r#"
[flags.summaries_configuration]
everyone = true
"#,
    );
    let settings = tmp.path().join("settings.json");

    aiside(tmp.path())
        .args(["fragment", "--unit", UNIT, "--handler-url", HANDLER_URL, "--settings"])
        .arg(&settings)
        .arg("--tree")
        .arg(tree())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    aiside(tmp.path())
        .args(["settings", "set", "--course", COURSE, "--enabled", "true", "--file"])
        .arg(&settings)
        .assert()
        .success();

    aiside(tmp.path())
        .args(["fragment", "--unit", UNIT, "--handler-url", HANDLER_URL, "--settings"])
        .arg(&settings)
        .arg("--tree")
        .arg(tree())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"data-user-role="unknown""#));
}
