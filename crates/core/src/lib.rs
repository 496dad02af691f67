//! # Study Core
//!
//! Participant-run logic for research-study protocols.
//!
//! This crate contains:
//! - condition evaluation against a participant's answer log ([`evaluator`])
//! - resolution of condition outcomes into navigation directives ([`action`])
//! - the per-participant run state machine ([`navigator`])
//! - the protocol store and answer sink collaborators, with file-backed implementations ([`store`])
//!
//! **No presentation concerns**: rendering questions and collecting raw input belong to the
//! caller. Everything here is synchronous, in-memory and single-participant.

pub mod action;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod navigator;
pub mod store;

pub use action::{
    apply_action, resolve_action, Diagnostic, NavigationDirective, ReferenceTarget, Resolution,
};
pub use config::{core_config_from_env_values, CoreConfig};
pub use error::{CoreError, CoreResult};
pub use evaluator::{evaluate, evaluate_all};
pub use navigator::{
    summarize, AnswerRecord, AnsweredQuestion, CompletedRun, Navigator, Progress, RunState, Step,
};
pub use store::{AnswerSink, FileProtocolStore, JsonAnswerSink, ProtocolStore};

pub use protocol::{Identifier, Position, Protocol, Question};
