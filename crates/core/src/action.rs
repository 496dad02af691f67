//! Turning a condition outcome into a navigation directive.
//!
//! Nothing here mutates navigator state. Broken jump targets are reported as a
//! [`Diagnostic`] next to a `Continue` directive so a live run can never be stranded.

use protocol::{ActionSpec, Condition, Identifier, Position, Protocol};
use serde::Serialize;

/// What the navigator should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationDirective {
    /// Advance in ordinary module/question order.
    Continue,
    /// Move to this position (visibility still applies on arrival).
    Jump(Position),
    /// End the run.
    Terminate,
}

/// Which kind of id a jump destination refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTarget {
    Question,
    Module,
}

/// Data-integrity warnings raised during a live run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A jump destination does not exist in the protocol; treated as continue.
    #[error("condition {condition_id}: {target:?} '{destination_id}' not found, continuing in order")]
    BrokenReference {
        condition_id: Identifier,
        target: ReferenceTarget,
        destination_id: Identifier,
    },
}

/// A directive plus any warning raised while resolving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub directive: NavigationDirective,
    pub diagnostic: Option<Diagnostic>,
}

impl Resolution {
    fn clean(directive: NavigationDirective) -> Self {
        Self {
            directive,
            diagnostic: None,
        }
    }
}

/// Pick the action for a condition outcome.
pub fn resolve_action(condition: &Condition, outcome: bool) -> &ActionSpec {
    if outcome {
        &condition.on_true
    } else {
        &condition.on_false
    }
}

/// Resolve an action against the protocol.
///
/// `condition` is only used to label diagnostics.
pub fn apply_action(action: &ActionSpec, condition: &Condition, protocol: &Protocol) -> Resolution {
    match action {
        ActionSpec::Continue => Resolution::clean(NavigationDirective::Continue),
        ActionSpec::Terminate => Resolution::clean(NavigationDirective::Terminate),
        ActionSpec::GotoQuestion { question_id } => match protocol.find_question(question_id) {
            Some(position) => Resolution::clean(NavigationDirective::Jump(position)),
            None => broken(condition, ReferenceTarget::Question, question_id),
        },
        ActionSpec::GotoModule { module_id } => match protocol.find_module(module_id) {
            Some(module_index) => {
                Resolution::clean(NavigationDirective::Jump(Position::new(module_index, 0)))
            }
            None => broken(condition, ReferenceTarget::Module, module_id),
        },
    }
}

fn broken(condition: &Condition, target: ReferenceTarget, destination_id: &Identifier) -> Resolution {
    Resolution {
        directive: NavigationDirective::Continue,
        diagnostic: Some(Diagnostic::BrokenReference {
            condition_id: condition.id.clone(),
            target,
            destination_id: destination_id.clone(),
        }),
    }
}
