//! Provider registry.
//!
//! Maps a provider key to its constructor plus display metadata. Each entry
//! carries a capability probe; an entry whose probe fails is skipped with a
//! warning instead of aborting initialization, so a registry with only some
//! providers available is still usable.

use crate::error::RegistryError;
use crate::provider::{ClientHandle, ModelProvider, ProviderContext};
use crate::providers::{CliProvider, CliTarget};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub type ProviderConstructor = fn(ProviderContext) -> Box<dyn ModelProvider>;
pub type CapabilityProbe = fn() -> Result<(), String>;

#[derive(Debug, Clone)]
pub struct ProviderEntry {
    pub key: String,
    pub label: String,
    pub summary: String,
    pub probe: CapabilityProbe,
    pub constructor: ProviderConstructor,
}

/// A provider left out because its probe failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProvider {
    pub key: String,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<String, ProviderEntry>,
    skipped: Vec<SkippedProvider>,
}

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every CLI provider this build supports.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        for target in CliTarget::ALL {
            registry.register(builtin_entry(target));
        }
        registry
    }

    /// The process-wide registry, built with the builtin providers on first
    /// use unless [`ProviderRegistry::install_global`] ran earlier.
    pub fn global() -> &'static ProviderRegistry {
        GLOBAL.get_or_init(Self::with_builtin_providers)
    }

    /// Install `registry` as the process-wide one. Only possible once.
    pub fn install_global(registry: ProviderRegistry) -> Result<(), RegistryError> {
        GLOBAL
            .set(registry)
            .map_err(|_| RegistryError::AlreadyInitialized)
    }

    /// Register `entry` if its probe passes. Returns whether it was added.
    ///
    /// A later entry with the same key replaces the earlier one.
    pub fn register(&mut self, entry: ProviderEntry) -> bool {
        match (entry.probe)() {
            Ok(()) => {
                tracing::debug!(key = %entry.key, "registered provider");
                self.skipped.retain(|s| s.key != entry.key);
                self.entries.insert(entry.key.clone(), entry);
                true
            }
            Err(reason) => {
                tracing::warn!(
                    key = %entry.key,
                    reason = %reason,
                    "{} provider not registered",
                    entry.label
                );
                self.skipped.push(SkippedProvider {
                    key: entry.key,
                    label: entry.label,
                    reason,
                });
                false
            }
        }
    }

    pub fn lookup(&self, key: &str) -> Result<&ProviderEntry, RegistryError> {
        self.entries
            .get(key)
            .ok_or_else(|| RegistryError::UnknownProvider {
                key: key.to_owned(),
                known: self.known_keys(),
            })
    }

    pub fn create(
        &self,
        key: &str,
        context: ProviderContext,
    ) -> Result<Box<dyn ModelProvider>, RegistryError> {
        let entry = self.lookup(key)?;
        Ok((entry.constructor)(context))
    }

    /// Construct the provider and its client in one step.
    ///
    /// This is where a missing executable surfaces.
    pub fn connect(
        &self,
        key: &str,
        context: ProviderContext,
    ) -> Result<(Box<dyn ModelProvider>, ClientHandle), RegistryError> {
        let provider = self.create(key, context)?;
        let client = provider.create_client()?;
        Ok((provider, client))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.values()
    }

    pub fn skipped(&self) -> &[SkippedProvider] {
        &self.skipped
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn known_keys(&self) -> String {
        if self.entries.is_empty() {
            return "(none)".to_owned();
        }
        self.entries.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn builtin_entry(target: CliTarget) -> ProviderEntry {
    let probe: CapabilityProbe = match target {
        CliTarget::Claude => probe_claude,
        CliTarget::Codex => probe_codex,
        CliTarget::Gemini => probe_gemini,
    };
    let constructor: ProviderConstructor = match target {
        CliTarget::Claude => construct_claude,
        CliTarget::Codex => construct_codex,
        CliTarget::Gemini => construct_gemini,
    };
    ProviderEntry {
        key: target.key().to_owned(),
        label: target.label().to_owned(),
        summary: target.summary().to_owned(),
        probe,
        constructor,
    }
}

fn probe_claude() -> Result<(), String> {
    CliTarget::Claude.probe()
}

fn probe_codex() -> Result<(), String> {
    CliTarget::Codex.probe()
}

fn probe_gemini() -> Result<(), String> {
    CliTarget::Gemini.probe()
}

fn construct_claude(ctx: ProviderContext) -> Box<dyn ModelProvider> {
    Box::new(CliProvider::new(CliTarget::Claude, ctx))
}

fn construct_codex(ctx: ProviderContext) -> Box<dyn ModelProvider> {
    Box::new(CliProvider::new(CliTarget::Codex, ctx))
}

fn construct_gemini(ctx: ProviderContext) -> Box<dyn ModelProvider> {
    Box::new(CliProvider::new(CliTarget::Gemini, ctx))
}
