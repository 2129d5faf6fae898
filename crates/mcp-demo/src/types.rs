//! Core capability kinds and error types.

use serde::{Deserialize, Serialize};

/// The three kinds of capability a server can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Side-effecting action invoked with arguments.
    Tool,
    /// Readable named content addressed by URI.
    Resource,
    /// Templated message generator.
    Prompt,
}

impl CapabilityKind {
    /// All kinds, in the order they are advertised.
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::Tool,
        CapabilityKind::Resource,
        CapabilityKind::Prompt,
    ];

    /// Plural label used in capability listings (`tools`, `resources`, `prompts`).
    pub fn plural(&self) -> &'static str {
        match self {
            CapabilityKind::Tool => "tools",
            CapabilityKind::Resource => "resources",
            CapabilityKind::Prompt => "prompts",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Tool => write!(f, "tool"),
            CapabilityKind::Resource => write!(f, "resource"),
            CapabilityKind::Prompt => write!(f, "prompt"),
        }
    }
}

/// Errors raised while registering or resolving capabilities.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CapabilityError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: CapabilityKind, name: String },

    #[error("Duplicate resource uri: {0}")]
    DuplicateUri(String),

    #[error("Unknown {kind}: {name}")]
    NotFound { kind: CapabilityKind, name: String },
}

/// Convenience result type.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
