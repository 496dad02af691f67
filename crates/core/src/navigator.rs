//! The participant-run state machine.
//!
//! A [`Navigator`] owns one participant's run over one protocol: the current position, the
//! append-only answer log and every diagnostic raised along the way. It is a plain instance
//! object; each session builds its own.
//!
//! ```text
//! NotStarted --start()--> InProgress --submit()--> InProgress
//!                              |                       |
//!                              +------submit()-------> Completed --restart()--> InProgress
//! ```
//!
//! Routing after a submission:
//! 1. the answer is appended to the log;
//! 2. the answered question's conditions are evaluated in list order against the updated
//!    log, and the first one whose resolved action is not `continue` decides the move;
//! 3. otherwise the run advances to the next visible question in module/question order.
//!
//! Visibility is the AND of a question's conditions; hidden questions are skipped both on
//! ordinary advance and on arrival at a jump target.

use crate::action::{apply_action, resolve_action, Diagnostic, NavigationDirective};
use crate::evaluator::{evaluate, evaluate_all};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use protocol::{Identifier, Position, Protocol, Question};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Label used in summaries for answers whose question is no longer in the protocol.
pub const DELETED_QUESTION_TITLE: &str = "Deleted question";

/// One submitted answer. Records are only ever appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: Identifier,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    InProgress(Position),
    Completed,
}

/// The path taken by one submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Ordinary advance to the next visible question.
    Advanced {
        to: Identifier,
        skipped: Vec<Identifier>,
    },
    /// A condition redirected the run.
    Jumped {
        condition_id: Identifier,
        to: Identifier,
        skipped: Vec<Identifier>,
    },
    /// A condition ended the run.
    Terminated { condition_id: Identifier },
    /// No visible question remained. `condition_id` is set when a jump led past the end.
    Completed { condition_id: Option<Identifier> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Distinct questions answered so far.
    pub answered: usize,
    /// Questions in the protocol, visible or not.
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnsweredQuestion {
    pub question_id: Identifier,
    pub title: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything handed to the answer sink once a run is complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub protocol_id: Identifier,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Join an answer log with question titles, in submission order.
pub fn summarize(protocol: &Protocol, answers: &[AnswerRecord]) -> Vec<AnsweredQuestion> {
    answers
        .iter()
        .map(|answer| AnsweredQuestion {
            question_id: answer.question_id.clone(),
            title: protocol
                .question_by_id(&answer.question_id)
                .map(|q| q.title.clone())
                .unwrap_or_else(|| DELETED_QUESTION_TITLE.to_owned()),
            value: answer.value.clone(),
            timestamp: answer.timestamp,
        })
        .collect()
}

pub struct Navigator {
    protocol: Protocol,
    state: RunState,
    run_id: Uuid,
    answers: Vec<AnswerRecord>,
    diagnostics: Vec<Diagnostic>,
    history: Vec<Step>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Navigator {
    /// Creates a navigator in the `NotStarted` state.
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            state: RunState::NotStarted,
            run_id: Uuid::new_v4(),
            answers: Vec::new(),
            diagnostics: Vec::new(),
            history: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Starts the run from the first visible question, discarding any previous progress.
    ///
    /// A protocol with no visible question completes immediately.
    pub fn start(&mut self) -> Option<&Question> {
        self.run_id = Uuid::new_v4();
        self.answers.clear();
        self.diagnostics.clear();
        self.history.clear();
        self.started_at = Some(Utc::now());
        self.completed_at = None;

        let (first, _) = self.settle(Position::default());
        match first {
            Some((position, _)) => self.state = RunState::InProgress(position),
            None => self.complete(),
        }

        tracing::debug!("run {} started on protocol {}", self.run_id, self.protocol.id());
        self.current_question()
    }

    /// Explicit restart out of any state, including `Completed`.
    pub fn restart(&mut self) -> Option<&Question> {
        tracing::debug!("run {} restarted", self.run_id);
        self.start()
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Data-integrity warnings raised during this run.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every step taken during this run, in order.
    pub fn history(&self) -> &[Step] {
        &self.history
    }

    pub fn current_position(&self) -> Option<Position> {
        match self.state {
            RunState::InProgress(position) => Some(position),
            _ => None,
        }
    }

    /// The question to display, or `None` before start and after completion.
    pub fn current_question(&self) -> Option<&Question> {
        self.current_position()
            .and_then(|position| self.protocol.question_at(position))
    }

    pub fn progress(&self) -> Progress {
        let answered: HashSet<&Identifier> = self.answers.iter().map(|a| &a.question_id).collect();
        Progress {
            answered: answered.len(),
            total: self.protocol.question_count(),
        }
    }

    pub fn answer_summary(&self) -> Vec<AnsweredQuestion> {
        summarize(&self.protocol, &self.answers)
    }

    /// The finished run, once `Completed`.
    pub fn finish(&self) -> Option<CompletedRun> {
        if !self.is_completed() {
            return None;
        }
        Some(CompletedRun {
            run_id: self.run_id,
            protocol_id: self.protocol.id().clone(),
            started_at: self.started_at?,
            completed_at: self.completed_at?,
            answers: self.answers.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Submit an answer to the current question and move on.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the run untouched, when there is no current question
    /// (`RunNotStarted`, `RunCompleted`) or when the value is blank (`AnswerRequired`). Every
    /// question needs a non-blank answer to move on; `required` is a display hint only. Routing itself never fails: broken jump targets are recorded as
    /// diagnostics and treated as `continue`.
    pub fn submit(&mut self, value: impl Into<String>) -> CoreResult<Step> {
        let position = match self.state {
            RunState::InProgress(position) => position,
            RunState::NotStarted => return Err(CoreError::RunNotStarted),
            RunState::Completed => return Err(CoreError::RunCompleted),
        };
        let value = value.into();

        let (directive, fired_by) = {
            let question = self.protocol.question_at(position).ok_or_else(|| {
                CoreError::InvalidInput(format!("no question at {position:?}"))
            })?;

            if value.trim().is_empty() {
                return Err(CoreError::AnswerRequired(question.id.clone()));
            }

            self.answers.push(AnswerRecord {
                question_id: question.id.clone(),
                value,
                timestamp: Utc::now(),
            });

            let mut decided = (NavigationDirective::Continue, None);
            for condition in &question.conditions {
                let outcome = evaluate(condition, &self.answers);
                let action = resolve_action(condition, outcome);
                let resolution = apply_action(action, condition, &self.protocol);

                if let Some(diagnostic) = resolution.diagnostic {
                    tracing::warn!("run {}: {diagnostic}", self.run_id);
                    self.diagnostics.push(diagnostic);
                }

                if resolution.directive != NavigationDirective::Continue {
                    decided = (resolution.directive, Some(condition.id.clone()));
                    break;
                }
            }
            decided
        };

        let step = match (directive, fired_by) {
            (NavigationDirective::Terminate, Some(condition_id)) => {
                self.complete();
                Step::Terminated { condition_id }
            }
            (NavigationDirective::Jump(target), Some(condition_id)) => {
                let (landed, skipped) = self.settle(target);
                match landed {
                    Some((position, to)) => {
                        self.state = RunState::InProgress(position);
                        Step::Jumped {
                            condition_id,
                            to,
                            skipped,
                        }
                    }
                    None => {
                        self.complete();
                        Step::Completed {
                            condition_id: Some(condition_id),
                        }
                    }
                }
            }
            _ => {
                let next = Position::new(position.module_index, position.question_index + 1);
                let (landed, skipped) = self.settle(next);
                match landed {
                    Some((position, to)) => {
                        self.state = RunState::InProgress(position);
                        Step::Advanced { to, skipped }
                    }
                    None => {
                        self.complete();
                        Step::Completed { condition_id: None }
                    }
                }
            }
        };

        tracing::debug!("run {}: {step:?}", self.run_id);
        self.history.push(step.clone());
        Ok(step)
    }

    /// First visible question at or after `from`, plus the ids of hidden questions passed.
    fn settle(&self, from: Position) -> (Option<(Position, Identifier)>, Vec<Identifier>) {
        let mut skipped = Vec::new();
        let mut question_index = from.question_index;

        for (module_index, module) in self
            .protocol
            .modules()
            .iter()
            .enumerate()
            .skip(from.module_index)
        {
            for (index, question) in module.questions.iter().enumerate().skip(question_index) {
                if evaluate_all(&question.conditions, &self.answers) {
                    let position = Position::new(module_index, index);
                    return (Some((position, question.id.clone())), skipped);
                }
                skipped.push(question.id.clone());
            }
            question_index = 0;
        }

        (None, skipped)
    }

    fn complete(&mut self) {
        self.state = RunState::Completed;
        self.completed_at = Some(Utc::now());
        tracing::debug!(
            "run {} completed with {} answers",
            self.run_id,
            self.answers.len()
        );
    }
}
