//! `claude` (Claude Code) in print mode. The prompt arrives on stdin.

use crate::command::{push_opt, push_tool_list};
use crate::config::OutputFormat;
use crate::provider::ClientHandle;

pub(crate) const COMMAND: &str = "claude";
pub(crate) const INSTALL_HINT: &str =
    "Please install Claude Code CLI first. See: https://docs.anthropic.com/claude-code";

pub(crate) fn build_args(client: &ClientHandle) -> Vec<String> {
    let cfg = client.config();
    let mut args = vec!["-p".to_owned()];

    if cfg.skip_permissions {
        args.push("--dangerously-skip-permissions".to_owned());
    }
    push_opt(&mut args, "--permission-mode", cfg.permission_mode.as_deref());

    match cfg.output_format {
        OutputFormat::Text => {}
        OutputFormat::Json => args.extend(["--output-format".to_owned(), "json".to_owned()]),
        OutputFormat::Jsonl => {
            args.extend(["--output-format".to_owned(), "stream-json".to_owned()]);
        }
    }

    push_tool_list(&mut args, "--allowedTools", &cfg.allowed_tools);
    push_tool_list(&mut args, "--disallowedTools", &cfg.disallowed_tools);
    push_opt(&mut args, "--model", client.model());

    if cfg.verbose {
        args.push("--verbose".to_owned());
    }
    args.extend(cfg.extra_args.iter().cloned());
    args
}
