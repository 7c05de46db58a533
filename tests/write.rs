mod common;

use common::{context, error_code, put, read_json, read_to_string, write_json};
use guarded_vfs::{Checksum, EditAction, LineRange, WriteOperation, WriteRequest};
use serde_json::json;

#[test]
fn crlf_files_keep_their_line_endings() {
    let dir = tempfile::tempdir().expect("tempdir");
    put(dir.path(), "win.txt", "one\r\ntwo\r\nthree\r\n");
    let ctx = context(dir.path());

    let mut request = WriteRequest::new("win.txt", WriteOperation::Update);
    request.action = Some(EditAction::Replace);
    request.lines = Some(LineRange::single(2).expect("range"));
    request.content = Some("TWO\n".to_string());
    let output = ctx.write(request).expect("write");

    assert!(output.applied);
    assert_eq!(read_to_string(dir.path(), "win.txt"), "one\r\nTWO\r\nthree\r\n");
    assert_eq!(output.result.total_lines, 3);
    assert_eq!(
        output.result.checksum,
        Some(Checksum::compute("one\r\nTWO\r\nthree\r\n"))
    );
}

#[test]
fn distant_replacements_produce_separate_hunks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut body = String::new();
    for idx in 1..=20 {
        if idx == 2 || idx == 18 {
            body.push_str("marker\n");
        } else {
            body.push_str(&format!("line {idx}\n"));
        }
    }
    put(dir.path(), "long.txt", &body);
    let ctx = context(dir.path());

    let envelope = write_json(
        &ctx,
        json!({
            "path": "long.txt",
            "operation": "update",
            "action": "replace",
            "pattern": "marker",
            "replace_all": true,
            "content": "changed",
        }),
    );
    assert_eq!(envelope["success"], true, "{envelope}");
    let result = &envelope["result"];
    assert_eq!(result["replacements"], 2);
    assert_eq!(result["match_lines"], json!([2, 18]));
    assert_eq!(result["additions"], 2);
    assert_eq!(result["deletions"], 2);
    let hunks = result["hunks"].as_array().expect("hunks");
    assert_eq!(hunks.len(), 2, "{result}");
    assert_eq!(hunks[0]["old_start"], 1);
    assert_eq!(hunks[1]["old_start"], 15);

    let diff = result["diff"].as_str().expect("diff");
    assert!(diff.starts_with("--- a/long.txt\n+++ b/long.txt\n"), "{diff}");
    assert!(diff.contains("-marker\n+changed\n"), "{diff}");
    assert_eq!(read_to_string(dir.path(), "long.txt").matches("changed").count(), 2);
}

#[test]
fn missing_final_newline_is_marked_in_the_diff() {
    let dir = tempfile::tempdir().expect("tempdir");
    put(dir.path(), "tail.txt", "a\nb");
    let ctx = context(dir.path());

    let envelope = write_json(
        &ctx,
        json!({
            "path": "tail.txt",
            "operation": "update",
            "action": "insert_after",
            "lines": "2",
            "content": "c",
        }),
    );
    assert_eq!(envelope["success"], true, "{envelope}");
    assert_eq!(read_to_string(dir.path(), "tail.txt"), "a\nb\nc");
    let diff = envelope["result"]["diff"].as_str().expect("diff");
    assert!(diff.contains("\\ No newline at end of file"), "{diff}");
    assert_eq!(envelope["result"]["target"], json!({"start": 2, "end": 2}));
}

#[test]
fn unchanged_content_reports_no_changes() {
    let dir = tempfile::tempdir().expect("tempdir");
    put(dir.path(), "same.txt", "keep\n");
    let ctx = context(dir.path());
    let before = std::fs::metadata(dir.path().join("same.txt"))
        .and_then(|meta| meta.modified())
        .expect("mtime");

    let envelope = write_json(
        &ctx,
        json!({
            "path": "same.txt",
            "operation": "update",
            "action": "replace",
            "lines": "1",
            "content": "keep",
        }),
    );
    assert_eq!(envelope["success"], true, "{envelope}");
    assert_eq!(envelope["result"]["diff"], "(no changes)");
    assert_eq!(envelope["result"]["hunks"], json!([]));
    assert_eq!(
        envelope["result"]["checksum"],
        envelope["result"]["previous_checksum"]
    );
    let after = std::fs::metadata(dir.path().join("same.txt"))
        .and_then(|meta| meta.modified())
        .expect("mtime");
    assert_eq!(before, after);
}

#[test]
fn create_reports_checksum_and_dry_run_leaves_no_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(dir.path());

    let preview = write_json(
        &ctx,
        json!({
            "path": "new/file.md",
            "operation": "create",
            "content": "hello\n",
            "dry_run": true,
        }),
    );
    assert_eq!(preview["applied"], false, "{preview}");
    assert!(!dir.path().join("new").exists());

    let created = write_json(
        &ctx,
        json!({"path": "new/file.md", "operation": "create", "content": "hello\n"}),
    );
    assert_eq!(created["applied"], true, "{created}");
    assert_eq!(created["result"]["checksum"], preview["result"]["checksum"]);
    assert_eq!(created["result"]["additions"], 1);

    let read = read_json(&ctx, json!({"path": "new/file.md"}));
    assert_eq!(read["checksum"], created["result"]["checksum"]);

    let again = write_json(
        &ctx,
        json!({"path": "new/file.md", "operation": "create", "content": "other\n"}),
    );
    assert_eq!(error_code(&again), "ALREADY_EXISTS");
    assert_eq!(read_to_string(dir.path(), "new/file.md"), "hello\n");
}

#[test]
fn chained_edits_use_the_returned_checksum() {
    let dir = tempfile::tempdir().expect("tempdir");
    put(dir.path(), "todo.md", "- a\n- b\n");
    let ctx = context(dir.path());

    let read = read_json(&ctx, json!({"path": "todo.md"}));
    let first = write_json(
        &ctx,
        json!({
            "path": "todo.md",
            "operation": "update",
            "action": "insert_after",
            "lines": "2",
            "content": "- c",
            "checksum": read["checksum"],
        }),
    );
    assert_eq!(first["success"], true, "{first}");

    let second = write_json(
        &ctx,
        json!({
            "path": "todo.md",
            "operation": "update",
            "action": "delete_lines",
            "lines": "1",
            "checksum": first["result"]["checksum"],
        }),
    );
    assert_eq!(second["success"], true, "{second}");
    assert_eq!(read_to_string(dir.path(), "todo.md"), "- b\n- c\n");

    let stale = write_json(
        &ctx,
        json!({
            "path": "todo.md",
            "operation": "delete",
            "checksum": first["result"]["checksum"],
        }),
    );
    assert_eq!(error_code(&stale), "CHECKSUM_MISMATCH");
    assert_eq!(stale["error"]["current_checksum"], second["result"]["checksum"]);
    assert!(dir.path().join("todo.md").exists());
}

#[test]
fn files_over_the_read_limit_can_still_be_deleted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = "x".repeat(64);
    put(dir.path(), "big.log", &body);
    put(dir.path(), "guarded.log", &body);
    let ctx = common::context_with(dir.path(), |config| config.limits.max_read_bytes = 16);

    let preview = write_json(
        &ctx,
        json!({"path": "big.log", "operation": "delete", "dry_run": true}),
    );
    assert_eq!(preview["success"], true, "{preview}");
    assert_eq!(preview["result"]["hunks"], json!([]));
    assert!(dir.path().join("big.log").exists());

    let deleted = write_json(&ctx, json!({"path": "big.log", "operation": "delete"}));
    assert_eq!(deleted["applied"], true, "{deleted}");
    assert!(!dir.path().join("big.log").exists());

    let stale = write_json(
        &ctx,
        json!({"path": "guarded.log", "operation": "delete", "checksum": "000000000000"}),
    );
    assert_eq!(error_code(&stale), "CHECKSUM_MISMATCH");
    assert!(dir.path().join("guarded.log").exists());

    let current = Checksum::compute(&body);
    let guarded = write_json(
        &ctx,
        json!({"path": "guarded.log", "operation": "delete", "checksum": current.as_str()}),
    );
    assert_eq!(guarded["success"], true, "{guarded}");
    assert_eq!(guarded["result"]["previous_checksum"], current.as_str());
    assert!(!dir.path().join("guarded.log").exists());
}

#[test]
fn edits_keep_terminators_of_untouched_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    put(dir.path(), "mixed.txt", "a\nb\r\nc\n");
    let ctx = context(dir.path());

    let envelope = write_json(
        &ctx,
        json!({
            "path": "mixed.txt",
            "operation": "update",
            "action": "replace",
            "lines": "3",
            "content": "C",
        }),
    );
    assert_eq!(envelope["success"], true, "{envelope}");
    assert_eq!(read_to_string(dir.path(), "mixed.txt"), "a\nb\r\nC\n");
    assert_eq!(envelope["result"]["additions"], 1);
    assert_eq!(envelope["result"]["deletions"], 1);
}
