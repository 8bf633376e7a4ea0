//! Providers backed by local agent CLIs.

mod claude;
mod codex;
mod gemini;

use crate::command;
use crate::config::PromptDelivery;
use crate::error::{ExecError, ProviderError};
use crate::message::{Message, ToolSpec};
use crate::parse;
use crate::prompt;
use crate::provider::{ClientHandle, ModelProvider, ProviderContext};
use crate::response::{ModelResponse, TokenUsage};
use crate::runner;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CliTarget {
    Claude,
    Codex,
    Gemini,
}

impl CliTarget {
    pub const ALL: [CliTarget; 3] = [Self::Claude, Self::Codex, Self::Gemini];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude_cli" | "claude" => Some(Self::Claude),
            "codex_cli" | "codex" => Some(Self::Codex),
            "gemini_cli" | "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Claude => "claude_cli",
            Self::Codex => "codex_cli",
            Self::Gemini => "gemini_cli",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Claude => "Claude CLI",
            Self::Codex => "Codex CLI",
            Self::Gemini => "Gemini CLI",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::Claude => "Claude models via the Claude Code CLI command",
            Self::Codex => "OpenAI models via the `codex exec` CLI command",
            Self::Gemini => "Google Gemini models via the Gemini CLI command",
        }
    }

    /// Executable looked up on PATH unless the config names one.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Claude => claude::COMMAND,
            Self::Codex => codex::COMMAND,
            Self::Gemini => gemini::COMMAND,
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            Self::Claude => claude::INSTALL_HINT,
            Self::Codex => codex::INSTALL_HINT,
            Self::Gemini => gemini::INSTALL_HINT,
        }
    }

    /// Cargo feature that enables registration of this target.
    pub fn feature(&self) -> &'static str {
        match self {
            Self::Claude => "claude-cli",
            Self::Codex => "codex-cli",
            Self::Gemini => "gemini-cli",
        }
    }

    /// Whether this build can offer the target at all.
    pub fn probe(&self) -> Result<(), String> {
        let enabled = match self {
            Self::Claude => cfg!(feature = "claude-cli"),
            Self::Codex => cfg!(feature = "codex-cli"),
            Self::Gemini => cfg!(feature = "gemini-cli"),
        };
        if enabled {
            Ok(())
        } else {
            Err(format!("built without the `{}` feature", self.feature()))
        }
    }

    /// How this CLI prefers to receive the prompt.
    pub fn native_delivery(&self) -> PromptDelivery {
        match self {
            Self::Claude | Self::Codex => PromptDelivery::Stdin,
            Self::Gemini => PromptDelivery::TempFileArgument,
        }
    }

    pub fn build_args(&self, client: &ClientHandle) -> Vec<String> {
        match self {
            Self::Claude => claude::build_args(client),
            Self::Codex => codex::build_args(client),
            Self::Gemini => gemini::build_args(client),
        }
    }

    /// Model passed to the CLI: the explicit override, else the agent's
    /// model name unless it is just the CLI's own name.
    fn resolve_model(&self, ctx: &ProviderContext) -> Option<String> {
        let usable = |m: &&String| !m.trim().is_empty();
        ctx.config
            .model_override
            .as_ref()
            .filter(usable)
            .or_else(|| {
                ctx.model_name
                    .as_ref()
                    .filter(usable)
                    .filter(|m| m.as_str() != self.command())
            })
            .cloned()
    }
}

/// A [`ModelProvider`] that drives one of the [`CliTarget`]s.
#[derive(Debug, Clone)]
pub struct CliProvider {
    target: CliTarget,
    context: ProviderContext,
}

impl CliProvider {
    pub fn new(target: CliTarget, context: ProviderContext) -> Self {
        Self { target, context }
    }

    pub fn target(&self) -> CliTarget {
        self.target
    }

    fn run_pipeline(
        &self,
        client: &ClientHandle,
        conversation: &[Message],
        tool_specs: &[ToolSpec],
    ) -> ModelResponse {
        let label = self.target.label();
        let debug = client.config().debug;

        let flat = prompt::flatten(conversation);
        if debug {
            for (i, msg) in conversation.iter().enumerate() {
                let text = msg.text_content();
                tracing::debug!(
                    provider = self.target.key(),
                    index = i,
                    role = msg.role.as_str(),
                    content = %preview(&text, 200),
                    "conversation message"
                );
            }
            tracing::debug!(
                provider = self.target.key(),
                messages = conversation.len(),
                tool_specs = tool_specs.len(),
                system_prompt_len = flat.system.as_ref().map_or(0, |s| s.len()),
                user_prompt_len = flat.user.len(),
                "flattened conversation"
            );
        }
        let combined = flat.combined();

        let invocation = command::build_invocation(self.target, client);
        if debug {
            tracing::debug!(
                provider = self.target.key(),
                command = %invocation.display(),
                cwd = ?invocation.cwd,
                delivery = ?invocation.delivery,
                prompt_len = combined.len(),
                "built command"
            );
        }

        let output = match runner::run(&invocation, &combined) {
            Ok(output) => output,
            Err(ExecError::Timeout(secs)) => return ModelResponse::timeout(label, secs),
            Err(e) => return ModelResponse::internal_error(label, &e),
        };

        if output.exit_code != 0 {
            if debug {
                tracing::debug!(
                    provider = self.target.key(),
                    exit_code = output.exit_code,
                    "provider exited with an error"
                );
            }
            return ModelResponse::application_error(
                label,
                output.exit_code,
                output.stdout,
                output.stderr,
            );
        }

        let content = parse::parse_output(client.config().output_format, &output.stdout);
        ModelResponse::success(content, output.exit_code, output.stdout, output.stderr)
    }
}

impl ModelProvider for CliProvider {
    fn key(&self) -> &str {
        self.target.key()
    }

    fn create_client(&self) -> Result<ClientHandle, ProviderError> {
        let command = self
            .context
            .config
            .bin
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.target.command().to_owned());
        let executable =
            which::which(&command).map_err(|_| ProviderError::ExecutableNotFound {
                label: self.target.label(),
                command: command.clone(),
                hint: self.target.install_hint(),
            })?;

        let delivery = self
            .context
            .config
            .prompt_delivery
            .unwrap_or_else(|| self.target.native_delivery());

        Ok(ClientHandle::new(
            executable,
            self.context.config.clone(),
            self.context.resolve_working_directory(),
            self.target.resolve_model(&self.context),
            delivery,
        ))
    }

    fn call_model(
        &self,
        client: &ClientHandle,
        conversation: &[Message],
        tool_specs: &[ToolSpec],
    ) -> ModelResponse {
        catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(client, conversation, tool_specs)
        }))
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            ModelResponse::internal_error(self.target.label(), &reason)
        })
    }

    fn extract_token_usage(&self, _raw_response: &Value) -> TokenUsage {
        TokenUsage::unavailable(self.target.key())
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}
