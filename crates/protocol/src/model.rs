//! Domain-level protocol types.
//!
//! A protocol is the full questionnaire definition for one study: an ordered sequence of
//! modules, each holding an ordered sequence of questions. Questions may carry conditions
//! that both gate their visibility and route the participant after they answer.
//!
//! These types are read-only inputs during a participant run. Authoring tools build and
//! mutate them; the navigator in `study-core` only reads them.

use serde::{Deserialize, Serialize};
use study_types::Identifier;

// ============================================================================
// Kinds and operators
// ============================================================================

/// How the participant is prompted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    File,
    Ai,
}

impl InputKind {
    /// Human-readable label for the presentation layer.
    pub fn label(self) -> &'static str {
        match self {
            InputKind::Text => "Text input",
            InputKind::Image => "Image upload",
            InputKind::Video => "Video upload",
            InputKind::Audio => "Audio recording",
            InputKind::File => "File upload",
            InputKind::Ai => "AI interaction",
        }
    }
}

/// What kind of answer the participant gives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    #[default]
    FreeText,
    SingleChoice,
    MultiChoice,
    Video,
    Audio,
    File,
    Ai,
}

impl OutputKind {
    /// Human-readable label for the presentation layer.
    pub fn label(self) -> &'static str {
        match self {
            OutputKind::FreeText => "Free text",
            OutputKind::SingleChoice => "Single choice",
            OutputKind::MultiChoice => "Multiple choice",
            OutputKind::Video => "Video recording",
            OutputKind::Audio => "Audio recording",
            OutputKind::File => "File upload",
            OutputKind::Ai => "AI response",
        }
    }
}

/// Comparison applied between a prior answer and a condition's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

// ============================================================================
// Actions and conditions
// ============================================================================

/// What to do once a condition has been evaluated.
///
/// Jump variants carry their destination, so a jump without a target cannot be represented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionSpec {
    /// Advance in ordinary module/question order.
    Continue,
    /// Jump to the question with this id, wherever it lives in the protocol.
    GotoQuestion { question_id: Identifier },
    /// Jump to the first question of the module with this id.
    GotoModule { module_id: Identifier },
    /// End the run immediately.
    Terminate,
}

/// A rule comparing a prior answer against a value, with distinct true/false actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub id: Identifier,
    /// Question whose latest answer is compared.
    pub source_question_id: Identifier,
    pub operator: Operator,
    pub value: String,
    pub on_true: ActionSpec,
    pub on_false: ActionSpec,
}

// ============================================================================
// Structure
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// Unique across the whole protocol; jump destinations are resolved globally.
    pub id: Identifier,
    pub title: String,
    /// Optional text shown to the participant under the title.
    pub description: Option<String>,
    pub required: bool,
    pub input_kind: InputKind,
    pub output_kind: OutputKind,
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub id: Identifier,
    pub name: String,
    /// 1-based traversal order.
    pub order: u32,
    pub questions: Vec<Question>,
}

/// Location of a question inside a protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub module_index: usize,
    pub question_index: usize,
}

impl Position {
    pub fn new(module_index: usize, question_index: usize) -> Self {
        Self {
            module_index,
            question_index,
        }
    }
}

/// Counts shown to a researcher before a simulated run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtocolOverview {
    pub modules: usize,
    pub questions: usize,
    pub conditions: usize,
}

/// The full questionnaire definition for one study.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocol {
    id: Identifier,
    name: String,
    modules: Vec<Module>,
}

impl Protocol {
    /// Build a protocol. Modules are stably sorted by `order`, so traversal always follows
    /// the authored order even if the list was supplied out of sequence.
    pub fn new(id: Identifier, name: impl Into<String>, mut modules: Vec<Module>) -> Self {
        modules.sort_by_key(|m| m.order);
        Self {
            id,
            name: name.into(),
            modules,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Iterate every question with its position, in traversal order.
    pub fn questions(&self) -> impl Iterator<Item = (Position, &Question)> {
        self.modules.iter().enumerate().flat_map(|(mi, module)| {
            module
                .questions
                .iter()
                .enumerate()
                .map(move |(qi, question)| (Position::new(mi, qi), question))
        })
    }

    pub fn question_at(&self, position: Position) -> Option<&Question> {
        self.modules
            .get(position.module_index)?
            .questions
            .get(position.question_index)
    }

    /// Position of the first question with this id, in traversal order.
    pub fn find_question(&self, question_id: &Identifier) -> Option<Position> {
        self.questions()
            .find(|(_, q)| &q.id == question_id)
            .map(|(position, _)| position)
    }

    pub fn question_by_id(&self, question_id: &Identifier) -> Option<&Question> {
        self.questions()
            .find(|(_, q)| &q.id == question_id)
            .map(|(_, q)| q)
    }

    /// Index of the first module with this id.
    pub fn find_module(&self, module_id: &Identifier) -> Option<usize> {
        self.modules.iter().position(|m| &m.id == module_id)
    }

    pub fn question_count(&self) -> usize {
        self.modules.iter().map(|m| m.questions.len()).sum()
    }

    pub fn overview(&self) -> ProtocolOverview {
        ProtocolOverview {
            modules: self.modules.len(),
            questions: self.question_count(),
            conditions: self.questions().map(|(_, q)| q.conditions.len()).sum(),
        }
    }

    /// Remove a module and renumber the remainder.
    pub fn remove_module(&mut self, module_id: &Identifier) -> Option<Module> {
        let index = self.find_module(module_id)?;
        let removed = self.modules.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Reassign module `order` values to `1..=n` in the current sequence.
    pub fn renumber(&mut self) {
        for (index, module) in self.modules.iter_mut().enumerate() {
            module.order = u32::try_from(index + 1).unwrap_or(u32::MAX);
        }
    }
}
