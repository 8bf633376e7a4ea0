//! The contract every model provider satisfies.

use crate::config::{PromptDelivery, ProviderConfig};
use crate::error::ProviderError;
use crate::message::{Message, ToolSpec};
use crate::response::{ModelResponse, TokenUsage};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a provider is constructed from.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// Model name from the agent definition (`sonnet`, `o3`, ...).
    pub model_name: Option<String>,
    /// Workspace the agent runtime operates in.
    pub workspace_root: Option<PathBuf>,
    pub config: ProviderConfig,
}

impl ProviderContext {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Explicit `working_directory` wins over the workspace root; with
    /// neither the child inherits the caller's directory.
    pub fn resolve_working_directory(&self) -> Option<PathBuf> {
        self.config
            .working_directory
            .clone()
            .or_else(|| self.workspace_root.clone())
    }
}

/// Validated, immutable snapshot consumed by every `call_model`.
///
/// Cloning is cheap and clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    executable: PathBuf,
    config: ProviderConfig,
    working_directory: Option<PathBuf>,
    model: Option<String>,
    delivery: PromptDelivery,
}

impl ClientHandle {
    pub fn new(
        executable: PathBuf,
        config: ProviderConfig,
        working_directory: Option<PathBuf>,
        model: Option<String>,
        delivery: PromptDelivery,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                executable,
                config,
                working_directory,
                model,
                delivery,
            }),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.inner.executable
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.inner.working_directory.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.inner.model.as_deref()
    }

    pub fn delivery(&self) -> PromptDelivery {
        self.inner.delivery
    }

    /// Never zero.
    pub fn timeout_secs(&self) -> u64 {
        self.inner.config.timeout.max(1)
    }
}

/// A model backend reachable through one uniform call shape.
///
/// `call_model` must not fail: every problem is reported inside the returned
/// [`ModelResponse`]. The only error a caller ever handles comes from
/// `create_client`.
pub trait ModelProvider: Send + Sync {
    /// Registry key, e.g. `claude_cli`.
    fn key(&self) -> &str;

    fn create_client(&self) -> Result<ClientHandle, ProviderError>;

    fn call_model(
        &self,
        client: &ClientHandle,
        conversation: &[Message],
        tool_specs: &[ToolSpec],
    ) -> ModelResponse;

    fn extract_token_usage(&self, raw_response: &Value) -> TokenUsage;
}
