//! Turning a resolved client into an [`Invocation`].
//!
//! Flag mapping is a pure function of the [`ClientHandle`]: the same handle
//! always yields the same argv.

use crate::providers::CliTarget;
use crate::provider::ClientHandle;
use crate::runner::Invocation;

/// Separator for allow/deny tool lists.
pub const TOOL_LIST_DELIMITER: &str = ",";

pub fn build_invocation(target: CliTarget, client: &ClientHandle) -> Invocation {
    Invocation {
        program: client.executable().to_path_buf(),
        args: target.build_args(client),
        delivery: client.delivery(),
        cwd: client.working_directory().map(|p| p.to_path_buf()),
        timeout_secs: client.timeout_secs(),
        temp_dir: client.config().temp_dir.clone(),
    }
}

/// `flag a,b,c`, or nothing for an empty list.
pub(crate) fn push_tool_list(args: &mut Vec<String>, flag: &str, tools: &[String]) {
    if tools.is_empty() {
        return;
    }
    args.push(flag.to_owned());
    args.push(tools.join(TOOL_LIST_DELIMITER));
}

/// `flag value` when the value is present and not blank.
pub(crate) fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        args.push(flag.to_owned());
        args.push(value.to_owned());
    }
}
