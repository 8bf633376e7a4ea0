//! Uniform model-provider contract over local agent CLIs
//!
//! An agent runtime talks to every model backend through [`ModelProvider`]:
//! `create_client` once, then `call_model` per turn. The providers in this
//! crate drive command-line agents (`claude`, `codex`, `gemini`) as child
//! processes:
//!
//! 1. the conversation is flattened into a single prompt ([`prompt`])
//! 2. an argv is built from the resolved client ([`command`])
//! 3. the child runs under a timeout, the prompt going in over stdin or as
//!    the last argument ([`runner`])
//! 4. stdout is reduced to the answer text ([`parse`])
//!
//! `call_model` never fails. Non-zero exits, timeouts and internal errors
//! all come back as a [`ModelResponse`] with a diagnostic message and an
//! [`CallOutcome`] tag. The only error a caller handles is
//! [`ProviderError::ExecutableNotFound`] from `create_client`.
//!
//! # Example
//!
//! ```no_run
//! use levitate_llm::{Message, ProviderConfig, ProviderContext, ProviderRegistry};
//!
//! let ctx = ProviderContext::new(ProviderConfig::default()).with_model("sonnet");
//! let (provider, client) = ProviderRegistry::global().connect("claude_cli", ctx)?;
//! let response = provider.call_model(
//!     &client,
//!     &[Message::system("Answer in one word."), Message::user("Capital of France?")],
//!     &[],
//! );
//! println!("{}", response.content());
//! # Ok::<(), levitate_llm::RegistryError>(())
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod output;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod response;
pub mod runner;

pub use config::{OutputFormat, PromptDelivery, ProviderConfig, Settings};
pub use error::{ConfigError, ExecError, ProviderError, RegistryError};
pub use message::{Content, ContentPart, Message, Role, ToolSpec};
pub use provider::{ClientHandle, ModelProvider, ProviderContext};
pub use providers::{CliProvider, CliTarget};
pub use registry::{ProviderEntry, ProviderRegistry, SkippedProvider};
pub use response::{CallOutcome, ModelResponse, TokenUsage};
