//! End-to-end provider calls against stub CLI executables.

#![cfg(unix)]

use levitate_llm::{
    CallOutcome, ClientHandle, Message, ModelProvider, OutputFormat, PromptDelivery,
    ProviderConfig, ProviderContext, ProviderError, ProviderRegistry, RegistryError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};
use tempfile::TempDir;

// Serializes stub creation and exec; writing a script while another test
// forks can leave it busy (ETXTBSY).
fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn chmod_x(p: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(p).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(p, perms).unwrap();
}

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let bin_dir = dir.join("bin");
    fs::create_dir_all(&bin_dir).unwrap();
    let path = bin_dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    chmod_x(&path);
    path
}

fn connect(key: &str, config: ProviderConfig) -> (Box<dyn ModelProvider>, ClientHandle) {
    ProviderRegistry::global()
        .connect(key, ProviderContext::new(config))
        .unwrap()
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn claude_receives_combined_prompt_on_stdin() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let args_file = tmp.path().join("args.txt");
    let stub = write_stub(
        tmp.path(),
        "claude",
        &format!(
            "for a in \"$@\"; do printf '%s\\n' \"$a\" >> '{}'; done\ncat",
            args_file.display()
        ),
    );

    let config = ProviderConfig {
        bin: Some(stub.display().to_string()),
        allowed_tools: vec!["Read".to_owned(), "Edit".to_owned()],
        skip_permissions: true,
        ..ProviderConfig::default()
    };
    let ctx = ProviderContext::new(config).with_model("sonnet");
    let (provider, client) = ProviderRegistry::global()
        .connect("claude_cli", ctx)
        .unwrap();

    let conversation = vec![
        Message::system("be brief"),
        Message::user("hello"),
        Message::assistant("hi there"),
        Message::user("again"),
    ];
    let response = provider.call_model(&client, &conversation, &[]);

    assert_eq!(response.outcome, CallOutcome::Success);
    assert_eq!(
        response.content(),
        "<system>\nbe brief\n</system>\n\nhello\n\n[Previous Assistant Response]\nhi there\n\nagain"
    );
    assert_eq!(response.returncode(), Some(0));

    let args = fs::read_to_string(&args_file).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(
        args,
        vec![
            "-p",
            "--dangerously-skip-permissions",
            "--allowedTools",
            "Read,Edit",
            "--model",
            "sonnet",
        ]
    );
}

#[test]
fn nonzero_exit_becomes_application_error() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let stub = write_stub(tmp.path(), "claude", "cat > /dev/null\necho boom >&2\nexit 2");

    let (provider, client) = connect(
        "claude_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            ..ProviderConfig::default()
        },
    );
    let response = provider.call_model(&client, &[Message::user("go")], &[]);

    assert_eq!(response.outcome, CallOutcome::ApplicationError);
    let content = response.content();
    assert!(content.contains('2'), "{content}");
    assert!(content.contains("boom"), "{content}");
    assert_eq!(response.raw_response["returncode"], 2);
    assert_eq!(response.raw_response["stderr"], "boom\n");
}

#[test]
fn slow_child_times_out_with_response() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let stub = write_stub(tmp.path(), "codex", "sleep 30");

    let (provider, client) = connect(
        "codex_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            timeout: 1,
            ..ProviderConfig::default()
        },
    );

    let started = Instant::now();
    let response = provider.call_model(&client, &[Message::user("go")], &[]);
    let elapsed = started.elapsed();

    assert_eq!(response.outcome, CallOutcome::Timeout);
    assert_eq!(response.content(), "Codex CLI timed out after 1 seconds.");
    assert_eq!(response.raw_response["error"], "timeout");
    assert_eq!(response.raw_response["timeout"], 1);
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}

#[test]
fn background_helper_cannot_outlive_timeout() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    // The helper inherits stdout, so the pipe stays open after the CLI exits.
    let stub = write_stub(tmp.path(), "codex", "cat > /dev/null
sleep 8 &
echo started");

    let (provider, client) = connect(
        "codex_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            timeout: 1,
            ..ProviderConfig::default()
        },
    );

    let started = Instant::now();
    let response = provider.call_model(&client, &[Message::user("go")], &[]);
    let elapsed = started.elapsed();

    assert_eq!(response.outcome, CallOutcome::Timeout, "{}", response.content());
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
}

#[test]
fn codex_reads_stdin_and_gets_workspace_dir() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let workspace = tmp.path().join("workspace");
    fs::create_dir_all(&workspace).unwrap();
    let stub = write_stub(
        tmp.path(),
        "codex",
        "[ \"$1\" = exec ] || { echo \"not exec: $1\" >&2; exit 3; }\n\
         for a in \"$@\"; do last=\"$a\"; done\n\
         [ \"$last\" = - ] || { echo \"no stdin marker\" >&2; exit 4; }\n\
         printf 'cwd=%s\\n' \"$(pwd)\"\n\
         cat",
    );

    let ctx = ProviderContext::new(ProviderConfig {
        bin: Some(stub.display().to_string()),
        ..ProviderConfig::default()
    })
    .with_workspace_root(&workspace);
    let (provider, client) = ProviderRegistry::global()
        .connect("codex_cli", ctx)
        .unwrap();
    assert_eq!(client.working_directory(), Some(workspace.as_path()));

    let response = provider.call_model(&client, &[Message::user("task")], &[]);
    assert_eq!(response.outcome, CallOutcome::Success, "{}", response.content());

    let content = response.content();
    let mut lines = content.lines();
    let cwd = lines.next().unwrap().strip_prefix("cwd=").unwrap();
    assert_eq!(
        fs::canonicalize(cwd).unwrap(),
        fs::canonicalize(&workspace).unwrap()
    );
    assert_eq!(lines.next(), Some("task"));
}

#[test]
fn jsonl_output_is_extracted() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let stub = write_stub(
        tmp.path(),
        "codex",
        "cat > /dev/null\n\
         echo '{\"message\":\"a\"}'\n\
         echo 'not json'\n\
         echo '{\"result\":\"b\"}'",
    );

    let (provider, client) = connect(
        "codex_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            output_format: OutputFormat::Jsonl,
            ..ProviderConfig::default()
        },
    );
    let response = provider.call_model(&client, &[Message::user("go")], &[]);
    assert_eq!(response.outcome, CallOutcome::Success);
    assert_eq!(response.content(), "a\nnot json\nb");
}

#[test]
fn malformed_json_output_passes_through() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let stub = write_stub(tmp.path(), "claude", "cat > /dev/null\nprintf '{\"content\": oops'");

    let (provider, client) = connect(
        "claude_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            output_format: OutputFormat::Json,
            ..ProviderConfig::default()
        },
    );
    let response = provider.call_model(&client, &[Message::user("go")], &[]);
    assert_eq!(response.outcome, CallOutcome::Success);
    assert_eq!(response.content(), "{\"content\": oops");
}

fn gemini_client(stub: &Path, staging: &Path, timeout: u64) -> (Box<dyn ModelProvider>, ClientHandle) {
    connect(
        "gemini_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            temp_dir: Some(staging.to_path_buf()),
            timeout,
            ..ProviderConfig::default()
        },
    )
}

#[test]
fn gemini_gets_prompt_as_last_argument() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    let stub = write_stub(
        tmp.path(),
        "gemini",
        "for a in \"$@\"; do prev=\"$last\"; last=\"$a\"; done\n\
         [ \"$prev\" = --prompt ] || { echo \"prompt flag missing\" >&2; exit 5; }\n\
         printf '%s' \"$last\"",
    );

    let (provider, client) = gemini_client(&stub, &staging, 30);
    assert_eq!(client.delivery(), PromptDelivery::TempFileArgument);

    let response = provider.call_model(
        &client,
        &[Message::system("rules"), Message::user("say \"hi\"\n$HOME")],
        &[],
    );
    assert_eq!(response.outcome, CallOutcome::Success, "{}", response.content());
    assert_eq!(
        response.content(),
        "<system>\nrules\n</system>\n\nsay \"hi\"\n$HOME"
    );
    assert!(is_empty_dir(&staging));
}

#[test]
fn prompt_file_is_removed_on_every_outcome() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();

    let failing = write_stub(tmp.path(), "gemini-fail", "echo boom >&2\nexit 2");
    let (provider, client) = gemini_client(&failing, &staging, 30);
    let response = provider.call_model(&client, &[Message::user("x")], &[]);
    assert_eq!(response.outcome, CallOutcome::ApplicationError);
    assert!(is_empty_dir(&staging));

    let slow = write_stub(tmp.path(), "gemini-slow", "sleep 30");
    let (provider, client) = gemini_client(&slow, &staging, 1);
    let response = provider.call_model(&client, &[Message::user("x")], &[]);
    assert_eq!(response.outcome, CallOutcome::Timeout);
    assert!(is_empty_dir(&staging));

    // Spawn fails after the file is staged: the cwd does not exist.
    let ok = write_stub(tmp.path(), "gemini-ok", "echo fine");
    let (provider, client) = connect(
        "gemini_cli",
        ProviderConfig {
            bin: Some(ok.display().to_string()),
            temp_dir: Some(staging.clone()),
            working_directory: Some(tmp.path().join("does-not-exist")),
            ..ProviderConfig::default()
        },
    );
    let response = provider.call_model(&client, &[Message::user("x")], &[]);
    assert_eq!(response.outcome, CallOutcome::InternalError);
    assert!(response.content().starts_with("Gemini CLI execution error:"));
    assert!(response.raw_response["error"].is_string());
    assert!(is_empty_dir(&staging));
}

#[test]
fn delivery_override_switches_strategy() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let stub = write_stub(tmp.path(), "gemini", "cat");

    let (provider, client) = connect(
        "gemini_cli",
        ProviderConfig {
            bin: Some(stub.display().to_string()),
            prompt_delivery: Some(PromptDelivery::Stdin),
            ..ProviderConfig::default()
        },
    );
    let response = provider.call_model(&client, &[Message::user("via stdin")], &[]);
    assert_eq!(response.content(), "via stdin");
}

#[test]
fn concurrent_calls_share_one_handle() {
    let _guard = test_lock().lock().unwrap_or_else(|e| e.into_inner());
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    let stub = write_stub(
        tmp.path(),
        "gemini",
        "for a in \"$@\"; do last=\"$a\"; done\nsleep 0.2\nprintf '%s' \"$last\"",
    );
    let (provider, client) = gemini_client(&stub, &staging, 30);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let provider = &provider;
                let client = client.clone();
                scope.spawn(move || {
                    let prompt = format!("request {i}");
                    let response = provider.call_model(&client, &[Message::user(&prompt)], &[]);
                    (prompt, response)
                })
            })
            .collect();
        for handle in handles {
            let (prompt, response) = handle.join().unwrap();
            assert_eq!(response.content(), prompt);
        }
    });
    assert!(is_empty_dir(&staging));
}

#[test]
fn missing_executable_fails_at_client_creation() {
    let result = ProviderRegistry::global().connect(
        "claude_cli",
        ProviderContext::new(ProviderConfig {
            bin: Some("/nonexistent/levitate-llm/claude".to_owned()),
            ..ProviderConfig::default()
        }),
    );
    assert!(matches!(
        result,
        Err(RegistryError::Provider(ProviderError::ExecutableNotFound { .. }))
    ));
}

#[test]
fn unknown_provider_is_rejected() {
    let result = ProviderRegistry::global().connect("openai", ProviderContext::default());
    assert!(matches!(result, Err(RegistryError::UnknownProvider { .. })));
}
