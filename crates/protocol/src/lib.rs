//! Protocol definitions for research-study questionnaires.
//!
//! This crate provides:
//! - the domain model (protocol, modules, questions, conditions, actions)
//! - the strict YAML wire format used to store protocols, with translation helpers
//! - authoring-time validation of references and ordering
//!
//! Traversal and condition evaluation live in `study-core`; this crate only describes the
//! shape of a protocol.

pub mod model;
pub mod validation;
pub mod wire;

// Re-export facades
pub use wire::ProtocolFile;

// Re-export public domain-level types
pub use model::{
    ActionSpec, Condition, InputKind, Module, Operator, OutputKind, Position, Protocol,
    ProtocolOverview, Question,
};
pub use validation::{validate, ValidationIssue};

pub use study_types::{Identifier, IdentifierError};

/// Errors returned by the `protocol` crate.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`ProtocolError`].
pub type ProtocolResult<T> = Result<T, ProtocolError>;
