//! `codex exec`, reading the prompt from stdin via the `-` argument.

use crate::command::push_opt;
use crate::config::OutputFormat;
use crate::provider::ClientHandle;

pub(crate) const COMMAND: &str = "codex";
pub(crate) const INSTALL_HINT: &str =
    "Please install Codex CLI first. See: https://openai.github.io/codex/";

/// Used when no sandbox is configured. An empty string omits the flag.
pub(crate) const DEFAULT_SANDBOX: &str = "workspace-write";

pub(crate) fn build_args(client: &ClientHandle) -> Vec<String> {
    let cfg = client.config();
    let mut args = vec!["exec".to_owned()];

    push_opt(
        &mut args,
        "--sandbox",
        Some(cfg.sandbox.as_deref().unwrap_or(DEFAULT_SANDBOX)),
    );
    // Overrides the sandbox when both are given; codex decides.
    if cfg.skip_permissions {
        args.push("--dangerously-bypass-approvals-and-sandbox".to_owned());
    }
    if cfg.full_auto {
        args.push("--full-auto".to_owned());
    }
    push_opt(&mut args, "--model", client.model());

    // codex has its own --cd; the launcher cwd is set as well.
    if let Some(dir) = client.working_directory() {
        args.push("--cd".to_owned());
        args.push(dir.display().to_string());
    }

    if cfg.output_format != OutputFormat::Text {
        args.push("--json".to_owned());
    }

    args.extend(cfg.extra_args.iter().cloned());

    // Read prompt from stdin
    args.push("-".to_owned());
    args
}
