use assert_cmd::prelude::*;
use predicates::prelude::*;
use assert_cmd::Command;

fn aiside(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aiside"));
    // Keep config discovery inside the temp dir.
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("AISIDE_CONFIG")
        .env_remove("AISIDE_HTML_TAGS_TO_REMOVE");
    cmd
}

#[test]
fn normalize_reads_stdin_and_drops_script_text() {
    let tmp = tempfile::tempdir().unwrap();
    aiside(tmp.path())
        .arg("normalize")
        .write_stdin("<p>Hello   <b>world</b></p>\n<script>var x = 1;</script>\n\n<p>Bye</p>")
        .assert()
        .success()
        .stdout("Hello world\nBye\n");
}

#[test]
fn normalize_remove_tag_replaces_the_configured_set() {
    let tmp = tempfile::tempdir().unwrap();
    let page = tmp.path().join("page.html");
    std::fs::write(&page, "<h1>Title</h1><aside>related links</aside><script>kept()</script>")
        .unwrap();

    aiside(tmp.path())
        .args(["normalize", "--remove-tag", "ASIDE", "--file"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("Title"))
        .stdout(predicate::str::contains("kept()"))
        .stdout(predicate::str::contains("related links").not());
}

#[test]
fn normalize_missing_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    aiside(tmp.path())
        .args(["normalize", "--file", "does-not-exist.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.html"));
}
