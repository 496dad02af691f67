//! Authoring-time protocol validation.
//!
//! These checks are meant to run before a protocol is published to participants. The
//! navigator never calls them; during a live run it degrades broken references to ordinary
//! advance instead.

use crate::model::{ActionSpec, Condition, Protocol};
use std::collections::{HashMap, HashSet};
use study_types::Identifier;

/// A problem found in a protocol definition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("module id '{0}' is used more than once")]
    DuplicateModuleId(Identifier),

    #[error("question id '{0}' is used more than once")]
    DuplicateQuestionId(Identifier),

    #[error("question '{question_id}' has more than one condition with id '{condition_id}'")]
    DuplicateConditionId {
        question_id: Identifier,
        condition_id: Identifier,
    },

    #[error("condition '{condition_id}' jumps to unknown question '{destination_id}'")]
    UnknownDestinationQuestion {
        condition_id: Identifier,
        destination_id: Identifier,
    },

    #[error("condition '{condition_id}' jumps to unknown module '{destination_id}'")]
    UnknownDestinationModule {
        condition_id: Identifier,
        destination_id: Identifier,
    },

    #[error("condition '{condition_id}' reads unknown question '{source_question_id}'")]
    UnknownSourceQuestion {
        condition_id: Identifier,
        source_question_id: Identifier,
    },

    #[error(
        "condition '{condition_id}' on question '{question_id}' reads '{source_question_id}', which is not asked before it"
    )]
    SourceNotBefore {
        condition_id: Identifier,
        question_id: Identifier,
        source_question_id: Identifier,
    },

    #[error("module orders must be 1..={expected_max} without gaps, found {found:?}")]
    NonContiguousModuleOrder { expected_max: usize, found: Vec<u32> },
}

/// Validate reference integrity and ordering of a protocol.
///
/// Returns every issue found, in traversal order. An empty vector means the protocol is
/// safe to publish.
pub fn validate(protocol: &Protocol) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let mut module_ids = HashSet::new();
    for module in protocol.modules() {
        if !module_ids.insert(&module.id) {
            issues.push(ValidationIssue::DuplicateModuleId(module.id.clone()));
        }
    }

    let found: Vec<u32> = protocol.modules().iter().map(|m| m.order).collect();
    let contiguous = found
        .iter()
        .enumerate()
        .all(|(index, order)| usize::try_from(*order).ok() == Some(index + 1));
    if !contiguous {
        issues.push(ValidationIssue::NonContiguousModuleOrder {
            expected_max: found.len(),
            found,
        });
    }

    // Traversal index of the first occurrence of each question id.
    let mut question_index: HashMap<&Identifier, usize> = HashMap::new();
    for (index, (_, question)) in protocol.questions().enumerate() {
        if question_index.contains_key(&question.id) {
            issues.push(ValidationIssue::DuplicateQuestionId(question.id.clone()));
        } else {
            question_index.insert(&question.id, index);
        }
    }

    for (index, (_, question)) in protocol.questions().enumerate() {
        let mut condition_ids = HashSet::new();
        for condition in &question.conditions {
            if !condition_ids.insert(&condition.id) {
                issues.push(ValidationIssue::DuplicateConditionId {
                    question_id: question.id.clone(),
                    condition_id: condition.id.clone(),
                });
            }

            match question_index.get(&condition.source_question_id) {
                None => issues.push(ValidationIssue::UnknownSourceQuestion {
                    condition_id: condition.id.clone(),
                    source_question_id: condition.source_question_id.clone(),
                }),
                // A question's own answer is in the log when its conditions route, but
                // visibility is decided before it is asked, so it never sees itself.
                Some(source_index) if *source_index >= index => {
                    issues.push(ValidationIssue::SourceNotBefore {
                        condition_id: condition.id.clone(),
                        question_id: question.id.clone(),
                        source_question_id: condition.source_question_id.clone(),
                    })
                }
                Some(_) => {}
            }

            check_destination(protocol, condition, &condition.on_true, &mut issues);
            check_destination(protocol, condition, &condition.on_false, &mut issues);
        }
    }

    issues
}

fn check_destination(
    protocol: &Protocol,
    condition: &Condition,
    action: &ActionSpec,
    issues: &mut Vec<ValidationIssue>,
) {
    match action {
        ActionSpec::GotoQuestion { question_id } if protocol.find_question(question_id).is_none() => {
            issues.push(ValidationIssue::UnknownDestinationQuestion {
                condition_id: condition.id.clone(),
                destination_id: question_id.clone(),
            });
        }
        ActionSpec::GotoModule { module_id } if protocol.find_module(module_id).is_none() => {
            issues.push(ValidationIssue::UnknownDestinationModule {
                condition_id: condition.id.clone(),
                destination_id: module_id.clone(),
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{id, module, question};
    use crate::model::Operator;

    fn condition(cid: &str, source: &str, on_true: ActionSpec) -> Condition {
        Condition {
            id: id(cid),
            source_question_id: id(source),
            operator: Operator::Equals,
            value: "yes".into(),
            on_true,
            on_false: ActionSpec::Continue,
        }
    }

    #[test]
    fn well_formed_protocol_has_no_issues() {
        let mut q2 = question("q2", "Smoker?");
        q2.conditions.push(condition(
            "c1",
            "q1",
            ActionSpec::GotoModule { module_id: id("b") },
        ));
        let protocol = Protocol::new(
            id("p"),
            "P",
            vec![
                module("a", 1, vec![question("q1", "Age"), q2]),
                module("b", 2, vec![question("q3", "Follow-up")]),
            ],
        );

        assert!(validate(&protocol).is_empty());
    }

    #[test]
    fn reports_broken_destinations() {
        let mut q2 = question("q2", "Smoker?");
        q2.conditions.push(condition(
            "c1",
            "q1",
            ActionSpec::GotoQuestion {
                question_id: id("ghost"),
            },
        ));
        q2.conditions.push(condition(
            "c2",
            "q1",
            ActionSpec::GotoModule {
                module_id: id("nowhere"),
            },
        ));
        let protocol = Protocol::new(
            id("p"),
            "P",
            vec![module("a", 1, vec![question("q1", "Age"), q2])],
        );

        let issues = validate(&protocol);
        assert_eq!(
            issues,
            vec![
                ValidationIssue::UnknownDestinationQuestion {
                    condition_id: id("c1"),
                    destination_id: id("ghost"),
                },
                ValidationIssue::UnknownDestinationModule {
                    condition_id: id("c2"),
                    destination_id: id("nowhere"),
                },
            ]
        );
    }

    #[test]
    fn reports_duplicate_ids_across_modules() {
        let protocol = Protocol::new(
            id("p"),
            "P",
            vec![
                module("a", 1, vec![question("q1", "One")]),
                module("a", 2, vec![question("q1", "Again")]),
            ],
        );

        let issues = validate(&protocol);
        assert!(issues.contains(&ValidationIssue::DuplicateModuleId(id("a"))));
        assert!(issues.contains(&ValidationIssue::DuplicateQuestionId(id("q1"))));
    }

    #[test]
    fn reports_sources_that_are_unknown_or_not_earlier() {
        let mut q1 = question("q1", "First");
        q1.conditions.push(condition("c-self", "q1", ActionSpec::Continue));
        q1.conditions.push(condition("c-later", "q2", ActionSpec::Continue));
        q1.conditions.push(condition("c-missing", "q9", ActionSpec::Continue));
        let protocol = Protocol::new(
            id("p"),
            "P",
            vec![module("a", 1, vec![q1, question("q2", "Second")])],
        );

        let issues = validate(&protocol);
        assert_eq!(issues.len(), 3);
        assert!(matches!(&issues[0], ValidationIssue::SourceNotBefore { condition_id, .. } if condition_id == "c-self"));
        assert!(matches!(&issues[1], ValidationIssue::SourceNotBefore { condition_id, .. } if condition_id == "c-later"));
        assert!(matches!(&issues[2], ValidationIssue::UnknownSourceQuestion { condition_id, .. } if condition_id == "c-missing"));
    }

    #[test]
    fn reports_gaps_in_module_order() {
        let protocol = Protocol::new(
            id("p"),
            "P",
            vec![module("a", 1, vec![]), module("b", 3, vec![])],
        );

        let issues = validate(&protocol);
        assert_eq!(
            issues,
            vec![ValidationIssue::NonContiguousModuleOrder {
                expected_max: 2,
                found: vec![1, 3]
            }]
        );
    }

    #[test]
    fn issues_render_readable_messages() {
        let issue = ValidationIssue::UnknownDestinationModule {
            condition_id: id("c1"),
            destination_id: id("b"),
        };
        assert_eq!(
            issue.to_string(),
            "condition 'c1' jumps to unknown module 'b'"
        );
    }
}
