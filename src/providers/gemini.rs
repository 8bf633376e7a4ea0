//! `gemini` with the prompt passed on the command line.
//!
//! The prompt is staged in a temp file and its content becomes the value of
//! the trailing `--prompt`. Very large prompts can still exceed ARG_MAX.

use crate::command::{push_opt, push_tool_list};
use crate::config::OutputFormat;
use crate::provider::ClientHandle;

pub(crate) const COMMAND: &str = "gemini";
pub(crate) const INSTALL_HINT: &str =
    "Please install Gemini CLI first. See: https://github.com/google-gemini/gemini-cli";

pub(crate) fn build_args(client: &ClientHandle) -> Vec<String> {
    let cfg = client.config();
    let mut args = Vec::new();

    if cfg.skip_permissions {
        args.push("--yolo".to_owned());
    }
    push_opt(&mut args, "--approval-mode", cfg.permission_mode.as_deref());
    // gemini's sandbox is an on/off switch; the configured value only enables it.
    if cfg.sandbox.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        args.push("--sandbox".to_owned());
    }

    match cfg.output_format {
        OutputFormat::Text => {}
        OutputFormat::Json => args.extend(["--output-format".to_owned(), "json".to_owned()]),
        OutputFormat::Jsonl => {
            args.extend(["--output-format".to_owned(), "stream-json".to_owned()]);
        }
    }

    push_tool_list(&mut args, "--allowed-tools", &cfg.allowed_tools);
    push_opt(&mut args, "--model", client.model());
    if cfg.verbose {
        args.push("--debug".to_owned());
    }
    args.extend(cfg.extra_args.iter().cloned());

    // Non-interactive; the prompt content is appended after this flag.
    args.push("--prompt".to_owned());
    args
}
