//! End-to-end tests driving a fake `codex` executable.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use codex_driver::{
    AbortSignal, CancelFlag, Codex, CodexOptions, ThreadEvent, ThreadItem, ThreadOptions,
    TurnOptions,
};
use pretty_assertions::assert_eq;

/// Writes an executable `codex` shell script into `dir` and returns a client
/// pointed at it.
fn fake_codex(dir: &Path, body: &str) -> Codex {
    let path = dir.join("codex");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake codex");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod fake codex");
    Codex::new(CodexOptions::new().with_codex_path(path)).expect("build client")
}

/// Script body that drains stdin and prints the given JSONL events.
fn emit_events(lines: &[&str]) -> String {
    let mut body = String::from("cat >/dev/null\n");
    for line in lines {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    body
}

const STARTED: &str = r#"{"type":"thread.started","thread_id":"t-1"}"#;
const TURN_STARTED: &str = r#"{"type":"turn.started"}"#;
const COMPLETED: &str =
    r#"{"type":"turn.completed","usage":{"input_tokens":7,"cached_input_tokens":2,"output_tokens":3}}"#;

fn agent_message(text: &str) -> String {
    format!(r#"{{"type":"item.completed","item":{{"id":"i1","type":"agent_message","text":"{text}"}}}}"#)
}

#[test]
fn run_aggregates_a_successful_turn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[STARTED, TURN_STARTED, &agent_message("hi"), COMPLETED]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    assert_eq!(thread.id(), None);

    let result = thread.run("say hi").expect("run should succeed");

    assert_eq!(result.final_response, "hi");
    assert_eq!(result.items.len(), 1);
    assert!(matches!(result.items[0], ThreadItem::AgentMessage(_)));
    let usage = result.usage.expect("usage should be captured");
    assert_eq!(usage.input_tokens, 7);
    assert_eq!(usage.cached_input_tokens, 2);
    assert_eq!(usage.output_tokens, 3);
    assert_eq!(thread.id(), Some("t-1"));
}

#[test]
fn later_agent_messages_supersede_earlier_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[
            STARTED,
            TURN_STARTED,
            &agent_message("first"),
            &agent_message("second"),
            COMPLETED,
        ]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    let result = thread.run("talk").expect("run should succeed");
    assert_eq!(result.final_response, "second");
    assert_eq!(result.items.len(), 2);
}

#[test]
fn turn_failed_raises_but_still_assigns_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[
            STARTED,
            TURN_STARTED,
            r#"{"type":"turn.failed","error":{"message":"rate limit"}}"#,
        ]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    let err = thread.run("work").expect_err("run should fail");
    assert!(err.to_string().contains("rate limit"), "{err}");
    assert_eq!(thread.id(), Some("t-1"));
}

#[test]
fn missing_terminal_event_is_a_disconnect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[STARTED, TURN_STARTED, &agent_message("partial")]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    let err = thread.run("work").expect_err("run should fail");
    assert!(
        err.to_string().contains("stream disconnected before completion"),
        "{err}"
    );
}

#[test]
fn invalid_json_line_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(dir.path(), &emit_events(&[STARTED, "not-json"]));
    let mut thread = client.start_thread(ThreadOptions::new());
    let err = thread.run("work").expect_err("run should fail");
    assert!(err.to_string().contains("not-json"), "{err}");
}

#[test]
fn nonzero_exit_embeds_code_and_stderr() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = "cat >/dev/null\necho boom >&2\nexit 3";
    let client = fake_codex(dir.path(), body);
    let mut thread = client.start_thread(ThreadOptions::new());
    let err = thread.run("work").expect_err("run should fail");
    let message = err.to_string();
    assert!(message.contains("exited with code 3"), "{message}");
    assert!(message.contains("boom"), "{message}");
}

#[test]
fn streaming_passes_unknown_events_through() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[
            STARTED,
            r#"{"type":"thread.compacted","detail":1}"#,
            TURN_STARTED,
            COMPLETED,
        ]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    let events: Vec<ThreadEvent> = thread
        .run_streamed("work")
        .expect("stream should start")
        .collect::<Result<_, _>>()
        .expect("all events should parse");

    assert_eq!(events.len(), 4);
    assert_eq!(events[1].event_type(), "thread.compacted");
    assert!(matches!(events[1], ThreadEvent::Unknown { .. }));
    // Identity is assigned by stream consumption, not by aggregation.
    assert_eq!(thread.id(), Some("t-1"));
}

#[test]
fn pre_flagged_signal_spawns_no_process() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("ran");
    let body = format!("echo ran > {}", marker.display());
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    let flag = CancelFlag::new();
    flag.abort();
    let err = thread
        .run_with("work", TurnOptions::new().with_signal(Arc::new(flag)))
        .expect_err("run should abort");

    assert!(err.to_string().contains("aborted before start"), "{err}");
    assert!(!marker.exists(), "child must never have been spawned");
}

#[test]
fn abort_mid_stream_stops_iteration_and_raises() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut body = emit_events(&[STARTED, TURN_STARTED]);
    body.push_str("sleep 2\n");
    body.push_str(&format!("printf '%s\\n' '{COMPLETED}'\n"));
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    let flag = CancelFlag::new();
    let mut stream = thread
        .run_streamed_with("work", TurnOptions::new().with_signal(Arc::new(flag.clone())))
        .expect("stream should start");

    let first = stream.next().expect("first event").expect("event parses");
    assert_eq!(first.event_type(), "thread.started");

    flag.abort();
    let err = stream
        .next()
        .expect("abort should surface as an error")
        .expect_err("expected abort error");
    assert!(err.to_string().contains("aborted"), "{err}");
    assert!(stream.next().is_none(), "no events after abort");
}

#[test]
fn second_run_resumes_with_the_assigned_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let args_file = dir.path().join("args");
    let mut body = format!("cat >/dev/null\nprintf '%s\\n' \"$@\" > {}\n", args_file.display());
    for line in [
        r#"{"type":"thread.started","thread_id":"t-7"}"#,
        TURN_STARTED,
        COMPLETED,
    ] {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    thread.run("first").expect("first run");
    let first_args = fs::read_to_string(&args_file).expect("args recorded");
    assert!(!first_args.contains("resume"), "{first_args}");

    thread.run("second").expect("second run");
    let second_args: Vec<String> = fs::read_to_string(&args_file)
        .expect("args recorded")
        .lines()
        .map(str::to_string)
        .collect();
    let resume_at = second_args
        .iter()
        .position(|a| a == "resume")
        .expect("resume token present");
    assert_eq!(second_args.get(resume_at + 1).map(String::as_str), Some("t-7"));
}

#[test]
fn child_environment_carries_originator_and_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_file = dir.path().join("env");
    let mut body = format!(
        "cat >/dev/null\nprintf '%s\\n' \"$CODEX_INTERNAL_ORIGINATOR_OVERRIDE\" \"$OPENAI_BASE_URL\" \"$CODEX_API_KEY\" > {}\n",
        env_file.display()
    );
    for line in [STARTED, TURN_STARTED, COMPLETED] {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    let path = dir.path().join("codex");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake codex");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod fake codex");

    let client = Codex::new(
        CodexOptions::new()
            .with_codex_path(path)
            .with_base_url("https://proxy.example")
            .with_api_key("sk-test"),
    )
    .expect("build client");
    let mut thread = client.start_thread(ThreadOptions::new());
    thread.run("check env").expect("run should succeed");

    let recorded: Vec<String> = fs::read_to_string(&env_file)
        .expect("env recorded")
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        recorded,
        vec!["codex_sdk_rs", "https://proxy.example", "sk-test"]
    );
}

#[test]
fn prompt_is_written_whole_before_reading_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prompt_file = dir.path().join("prompt");
    let mut body = format!("cat > {}\n", prompt_file.display());
    for line in [STARTED, TURN_STARTED, COMPLETED] {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    use codex_driver::UserInput;
    thread
        .run(vec![
            UserInput::Text {
                text: "a".to_string(),
            },
            UserInput::Text {
                text: "b".to_string(),
            },
            UserInput::LocalImage {
                path: PathBuf::from("/x.png"),
            },
        ])
        .expect("run should succeed");

    assert_eq!(
        fs::read_to_string(&prompt_file).expect("prompt recorded"),
        "a\n\nb"
    );
}

#[test]
fn output_schema_file_exists_for_the_child_and_is_removed_after_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let copy_file = dir.path().join("schema-copy");
    let path_file = dir.path().join("schema-path");
    let mut body = String::from("cat >/dev/null\nschema=\"\"\nprev=\"\"\n");
    body.push_str("for a in \"$@\"; do\n");
    body.push_str("  if [ \"$prev\" = \"--output-schema\" ]; then schema=\"$a\"; fi\n");
    body.push_str("  prev=\"$a\"\n");
    body.push_str("done\n");
    body.push_str(&format!("cp \"$schema\" {}\n", copy_file.display()));
    body.push_str(&format!("printf '%s\\n' \"$schema\" > {}\n", path_file.display()));
    for line in [
        STARTED,
        TURN_STARTED,
        r#"{"type":"turn.failed","error":{"message":"no good"}}"#,
    ] {
        body.push_str(&format!("printf '%s\\n' '{line}'\n"));
    }
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    let schema = serde_json::json!({"type": "object", "properties": {"answer": {"type": "string"}}});
    let err = thread
        .run_with("answer", TurnOptions::new().with_output_schema(schema))
        .expect_err("turn should fail");
    assert!(err.to_string().contains("no good"), "{err}");

    // The child saw the schema while it ran.
    let copied = fs::read_to_string(&copy_file).expect("schema was readable by the child");
    assert!(copied.contains("\"answer\""), "{copied}");

    // The temp file (and its directory) are gone now that the run finished.
    let schema_path = fs::read_to_string(&path_file).expect("schema path recorded");
    assert!(!Path::new(schema_path.trim()).exists());
}

#[test]
fn dropping_the_stream_early_kills_the_child() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let mut body = format!("echo $$ > {}\ncat >/dev/null\n", pid_file.display());
    body.push_str(&format!("printf '%s\\n' '{STARTED}'\n"));
    body.push_str("sleep 30\n");
    let client = fake_codex(dir.path(), &body);
    let mut thread = client.start_thread(ThreadOptions::new());

    let mut stream = thread.run_streamed("work").expect("stream should start");
    let first = stream.next().expect("first event").expect("event parses");
    assert_eq!(first.event_type(), "thread.started");
    drop(stream);

    let pid = fs::read_to_string(&pid_file).expect("pid recorded");
    let probe = std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()
        .expect("kill probe");
    assert!(!probe.success(), "child {} still running", pid.trim());
}

/// Reports aborted from the third query onwards, so both pre-write checks
/// pass and the post-input-write check trips.
struct AbortFromThirdQuery {
    calls: AtomicU32,
}

impl AbortSignal for AbortFromThirdQuery {
    fn is_aborted(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) >= 2
    }
}

#[test]
fn abort_after_input_write_raises_the_bare_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = "cat >/dev/null\necho noisy >&2\nsleep 5";
    let client = fake_codex(dir.path(), body);
    let mut thread = client.start_thread(ThreadOptions::new());

    let signal = Arc::new(AbortFromThirdQuery {
        calls: AtomicU32::new(0),
    });
    let err = thread
        .run_with("work", TurnOptions::new().with_signal(signal))
        .expect_err("run should abort");
    // No stderr is attached at this checkpoint, whatever the child wrote.
    assert_eq!(err.to_string(), "codex exec aborted");
}

#[test]
fn turn_failed_with_malformed_error_payload_uses_generic_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = fake_codex(
        dir.path(),
        &emit_events(&[STARTED, TURN_STARTED, r#"{"type":"turn.failed","error":"boom"}"#]),
    );
    let mut thread = client.start_thread(ThreadOptions::new());
    let err = thread.run("work").expect_err("run should fail");
    assert_eq!(err.to_string(), "turn failed");
}
