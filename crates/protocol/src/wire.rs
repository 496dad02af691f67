//! YAML wire format for protocol definitions and translation to domain types.
//!
//! Responsibilities:
//! - Define a strict wire model for serialisation/deserialisation
//! - Translate between the wire model and [`Protocol`]
//! - Turn `action` + optional `destination_id` pairs into [`ActionSpec`] variants
//!
//! Notes:
//! - Unknown keys are rejected at every level
//! - Reference integrity (do jump destinations exist?) is checked by [`crate::validation`],
//!   not here; a protocol with broken references still parses

use crate::model::{
    ActionSpec, Condition, InputKind, Module, Operator, OutputKind, Protocol, Question,
};
use crate::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use study_types::Identifier;

// ============================================================================
// Public ProtocolFile operations
// ============================================================================

/// Protocol file operations.
///
/// This is a zero-sized type used for namespacing protocol file operations.
pub struct ProtocolFile;

impl ProtocolFile {
    /// Parse a protocol from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `modules[0].questions[1].operator`)
    /// to the failing field when the YAML does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if:
    /// - the YAML does not match the wire schema or contains unknown keys,
    /// - any id is not a valid [`Identifier`],
    /// - a `goto_question`/`goto_module` action has no `destination_id`.
    pub fn parse(yaml_text: &str) -> ProtocolResult<Protocol> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, ProtocolWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(ProtocolError::Translation(format!(
                    "Protocol schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Render a protocol as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if serialisation fails.
    pub fn render(protocol: &Protocol) -> ProtocolResult<String> {
        let wire = domain_to_wire(protocol);
        serde_yaml::to_string(&wire)
            .map_err(|e| ProtocolError::Translation(format!("Failed to serialize protocol: {e}")))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ProtocolWire {
    id: Identifier,
    name: String,
    #[serde(default)]
    modules: Vec<ModuleWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ModuleWire {
    id: Identifier,
    name: String,
    order: u32,
    #[serde(default)]
    questions: Vec<QuestionWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct QuestionWire {
    id: Identifier,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    input_kind: InputKind,
    #[serde(default)]
    output_kind: OutputKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<ConditionWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConditionWire {
    id: Identifier,
    source_question_id: Identifier,
    operator: Operator,
    value: String,
    on_true: ActionWire,
    on_false: ActionWire,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ActionKindWire {
    Continue,
    GotoQuestion,
    GotoModule,
    Terminate,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ActionWire {
    action: ActionKindWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination_id: Option<Identifier>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: ProtocolWire) -> ProtocolResult<Protocol> {
    let modules = wire
        .modules
        .into_iter()
        .map(|module| -> ProtocolResult<Module> {
            let questions = module
                .questions
                .into_iter()
                .map(question_to_domain)
                .collect::<ProtocolResult<Vec<_>>>()?;
            Ok(Module {
                id: module.id,
                name: module.name,
                order: module.order,
                questions,
            })
        })
        .collect::<ProtocolResult<Vec<_>>>()?;

    Ok(Protocol::new(wire.id, wire.name, modules))
}

fn question_to_domain(wire: QuestionWire) -> ProtocolResult<Question> {
    let conditions = wire
        .conditions
        .into_iter()
        .map(|c| -> ProtocolResult<Condition> {
            Ok(Condition {
                on_true: action_to_domain(&c.id, "on_true", c.on_true)?,
                on_false: action_to_domain(&c.id, "on_false", c.on_false)?,
                id: c.id,
                source_question_id: c.source_question_id,
                operator: c.operator,
                value: c.value,
            })
        })
        .collect::<ProtocolResult<Vec<_>>>()?;

    Ok(Question {
        id: wire.id,
        title: wire.title,
        description: wire.description,
        required: wire.required,
        input_kind: wire.input_kind,
        output_kind: wire.output_kind,
        conditions,
    })
}

fn action_to_domain(
    condition_id: &Identifier,
    branch: &str,
    wire: ActionWire,
) -> ProtocolResult<ActionSpec> {
    let missing = || {
        ProtocolError::Translation(format!(
            "condition {condition_id}: {branch} action requires a destination_id"
        ))
    };

    match wire.action {
        ActionKindWire::GotoQuestion => Ok(ActionSpec::GotoQuestion {
            question_id: wire.destination_id.ok_or_else(missing)?,
        }),
        ActionKindWire::GotoModule => Ok(ActionSpec::GotoModule {
            module_id: wire.destination_id.ok_or_else(missing)?,
        }),
        kind @ (ActionKindWire::Continue | ActionKindWire::Terminate) => {
            if let Some(destination) = wire.destination_id {
                tracing::debug!(
                    "condition {condition_id}: ignoring destination_id {destination} on {branch} {kind:?} action"
                );
            }
            Ok(match kind {
                ActionKindWire::Terminate => ActionSpec::Terminate,
                _ => ActionSpec::Continue,
            })
        }
    }
}

fn action_to_wire(action: &ActionSpec) -> ActionWire {
    match action {
        ActionSpec::Continue => ActionWire {
            action: ActionKindWire::Continue,
            destination_id: None,
        },
        ActionSpec::GotoQuestion { question_id } => ActionWire {
            action: ActionKindWire::GotoQuestion,
            destination_id: Some(question_id.clone()),
        },
        ActionSpec::GotoModule { module_id } => ActionWire {
            action: ActionKindWire::GotoModule,
            destination_id: Some(module_id.clone()),
        },
        ActionSpec::Terminate => ActionWire {
            action: ActionKindWire::Terminate,
            destination_id: None,
        },
    }
}

fn domain_to_wire(protocol: &Protocol) -> ProtocolWire {
    ProtocolWire {
        id: protocol.id().clone(),
        name: protocol.name().to_owned(),
        modules: protocol
            .modules()
            .iter()
            .map(|module| ModuleWire {
                id: module.id.clone(),
                name: module.name.clone(),
                order: module.order,
                questions: module
                    .questions
                    .iter()
                    .map(|q| QuestionWire {
                        id: q.id.clone(),
                        title: q.title.clone(),
                        description: q.description.clone(),
                        required: q.required,
                        input_kind: q.input_kind,
                        output_kind: q.output_kind,
                        conditions: q
                            .conditions
                            .iter()
                            .map(|c| ConditionWire {
                                id: c.id.clone(),
                                source_question_id: c.source_question_id.clone(),
                                operator: c.operator,
                                value: c.value.clone(),
                                on_true: action_to_wire(&c.on_true),
                                on_false: action_to_wire(&c.on_false),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    const SAMPLE: &str = r#"id: smoking-study
name: Smoking study
modules:
  - id: follow-up
    name: Follow-up
    order: 2
    questions:
      - id: q3
        title: Anything else?
  - id: intake
    name: Intake
    order: 1
    questions:
      - id: q1
        title: How old are you?
        description: In whole years.
        required: true
        input_kind: text
        output_kind: free_text
      - id: q2
        title: Do you smoke?
        required: true
        output_kind: single_choice
        conditions:
          - id: c-age
            source_question_id: q1
            operator: greater_than
            value: "65"
            on_true: { action: goto_module, destination_id: follow-up }
            on_false: { action: continue }
"#;

    #[test]
    fn parses_sample_protocol() {
        let protocol = ProtocolFile::parse(SAMPLE).expect("parse yaml");

        assert_eq!(protocol.id(), &Identifier::new("smoking-study").unwrap());
        assert_eq!(protocol.modules()[0].id, "intake");
        assert_eq!(protocol.modules()[1].id, "follow-up");

        let q2 = protocol
            .question_at(Position::new(0, 1))
            .expect("q2 exists");
        assert_eq!(q2.output_kind, OutputKind::SingleChoice);
        assert_eq!(q2.input_kind, InputKind::Text);
        assert_eq!(q2.conditions.len(), 1);
        assert_eq!(q2.conditions[0].operator, Operator::GreaterThan);
        assert_eq!(
            q2.conditions[0].on_true,
            ActionSpec::GotoModule {
                module_id: Identifier::new("follow-up").unwrap()
            }
        );
        assert_eq!(q2.conditions[0].on_false, ActionSpec::Continue);

        let q3 = protocol.question_by_id(&Identifier::new("q3").unwrap()).unwrap();
        assert!(!q3.required, "required defaults to false");
        assert_eq!(q3.description, None);

        let q1 = protocol.question_by_id(&Identifier::new("q1").unwrap()).unwrap();
        assert_eq!(q1.description.as_deref(), Some("In whole years."));
    }

    #[test]
    fn rendered_yaml_parses_back_to_same_protocol() {
        let protocol = ProtocolFile::parse(SAMPLE).expect("parse yaml");
        let output = ProtocolFile::render(&protocol).expect("render protocol");
        let reparsed = ProtocolFile::parse(&output).expect("reparse yaml");
        assert_eq!(protocol, reparsed);

        assert!(output.contains("description: In whole years."), "{output}");
        assert_eq!(output.matches("description:").count(), 1, "absent descriptions are omitted");
    }

    #[test]
    fn rejects_unknown_keys_with_path() {
        let input = SAMPLE.replace("        required: true\n        input_kind", "        mandatory: true\n        input_kind");

        let err = ProtocolFile::parse(&input).expect_err("should reject unknown key");
        match err {
            ProtocolError::Translation(msg) => {
                assert!(msg.contains("mandatory"), "{msg}");
                assert!(msg.contains("modules[1].questions[0]"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_operator() {
        let input = SAMPLE.replace("operator: greater_than", "operator: superieur");

        let err = ProtocolFile::parse(&input).expect_err("should reject operator");
        match err {
            ProtocolError::Translation(msg) => assert!(msg.contains("operator"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_jump_without_destination() {
        let input = SAMPLE.replace(
            "{ action: goto_module, destination_id: follow-up }",
            "{ action: goto_module }",
        );

        let err = ProtocolFile::parse(&input).expect_err("should reject missing destination");
        match err {
            ProtocolError::Translation(msg) => {
                assert!(msg.contains("c-age"), "{msg}");
                assert!(msg.contains("on_true"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn ignores_destination_on_terminate() {
        let input = SAMPLE.replace(
            "on_false: { action: continue }",
            "on_false: { action: terminate, destination_id: q3 }",
        );

        let protocol = ProtocolFile::parse(&input).expect("parse yaml");
        let q2 = protocol.question_at(Position::new(0, 1)).unwrap();
        assert_eq!(q2.conditions[0].on_false, ActionSpec::Terminate);
    }

    #[test]
    fn rejects_invalid_identifier() {
        let input = SAMPLE.replace("id: q1\n", "id: \"q 1\"\n");

        let err = ProtocolFile::parse(&input).expect_err("should reject invalid id");
        match err {
            ProtocolError::Translation(msg) => assert!(msg.contains("invalid characters"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
