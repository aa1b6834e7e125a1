//! Model specifiers: `provider:model` strings and shortcuts.

use crate::config::DEFAULT_TEMPERATURE;
use crate::error::TranscribeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Anthropic,
    Google,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TranscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "google" => Ok(ProviderKind::Google),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(TranscribeError::InvalidConfig(format!(
                "Unknown provider: '{other}'. Valid providers: anthropic, google, ollama"
            ))),
        }
    }
}

/// Which default model to use when none is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelTier {
    /// Faster, cheaper model (Haiku, Flash).
    Fast,
    /// Most capable model (Sonnet, Pro).
    #[default]
    High,
}

/// Shortcut table: name, provider, explicit model, tier.
pub const SHORTCUTS: &[(&str, ProviderKind, Option<&str>, ModelTier)] = &[
    ("claude", ProviderKind::Anthropic, None, ModelTier::High),
    ("claude-sonnet", ProviderKind::Anthropic, None, ModelTier::High),
    ("claude-haiku", ProviderKind::Anthropic, None, ModelTier::Fast),
    ("gemini", ProviderKind::Google, Some("gemini-3-pro-preview"), ModelTier::High),
    ("gemini-pro", ProviderKind::Google, Some("gemini-3-pro-preview"), ModelTier::High),
    ("gemini-flash", ProviderKind::Google, Some("gemini-3-flash-preview"), ModelTier::Fast),
    ("ollama", ProviderKind::Ollama, None, ModelTier::High),
];

/// Default specifier used by the CLI.
pub const DEFAULT_MODEL_SPEC: &str = "gemini-flash";

/// A parsed model specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    /// Exact model name; `None` means the provider's default for `tier`.
    pub model: Option<String>,
    pub tier: ModelTier,
}

impl ModelSpec {
    /// Parse a shortcut (case-insensitive) or an explicit `provider:model`.
    ///
    /// Only the first colon separates provider and model, so Ollama tags such
    /// as `ollama:qwen2.5-vl:7b` keep their own colon.
    pub fn parse(spec: &str) -> Result<Self, TranscribeError> {
        let spec = spec.trim();
        let lower = spec.to_lowercase();
        if let Some((_, provider, model, tier)) =
            SHORTCUTS.iter().find(|(name, ..)| *name == lower)
        {
            return Ok(Self {
                provider: *provider,
                model: model.map(str::to_string),
                tier: *tier,
            });
        }

        let Some((provider, model)) = spec.split_once(':') else {
            let shortcuts: Vec<&str> = SHORTCUTS.iter().map(|(name, ..)| *name).collect();
            return Err(TranscribeError::InvalidConfig(format!(
                "Invalid model specification: '{spec}'. Use 'provider:model' \
                 (e.g. 'anthropic:claude-opus-4-1-20250805', 'google:gemini-2.5-pro', \
                 'ollama:qwen2.5-vl:7b') or a shortcut: {}",
                shortcuts.join(", ")
            )));
        };

        let provider: ProviderKind = provider.parse()?;
        let model = Some(model.trim()).filter(|m| !m.is_empty()).map(str::to_string);
        let tier = match provider {
            ProviderKind::Google
                if !model
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase().contains("pro")) =>
            {
                ModelTier::Fast
            }
            _ => ModelTier::High,
        };
        Ok(Self {
            provider,
            model,
            tier,
        })
    }

    /// Temperature to use when the caller did not choose one.
    ///
    /// Gemini 3 models are tuned for 1.0; everything else uses the library
    /// default.
    pub fn default_temperature(&self) -> f32 {
        let gemini3 = self.provider == ProviderKind::Google
            && self
                .model
                .as_deref()
                .is_some_and(|m| m.to_lowercase().starts_with("gemini-3"));
        if gemini3 {
            1.0
        } else {
            DEFAULT_TEMPERATURE
        }
    }
}

impl FromStr for ModelSpec {
    type Err = TranscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model.as_deref().unwrap_or(""))
    }
}
