//! Condition evaluation against a participant's answer log.
//!
//! Pure functions: no state, no side effects. Comparison is case-insensitive and never
//! fails; a comparison that cannot be performed evaluates to `false`. Numeric operators read
//! the leading number of each side and ignore anything after it.

use crate::navigator::AnswerRecord;
use protocol::{Condition, Identifier, Operator};

/// Numeric operator applied to a value that does not parse as a number.
///
/// Internal and non-fatal: [`evaluate`] maps it to `false`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot compare '{answer}' and '{expected}' numerically")]
pub struct UnparsableComparison {
    pub answer: String,
    pub expected: String,
}

/// Most recently recorded answer to `question_id`, if any.
pub fn latest_answer<'a>(
    answers: &'a [AnswerRecord],
    question_id: &Identifier,
) -> Option<&'a AnswerRecord> {
    answers.iter().rev().find(|a| &a.question_id == question_id)
}

/// Compare an answer value against an expected value with the given operator.
///
/// Both sides are lowercased first.
pub fn compare(
    operator: Operator,
    answer: &str,
    expected: &str,
) -> Result<bool, UnparsableComparison> {
    let answer = answer.to_lowercase();
    let expected = expected.to_lowercase();

    match operator {
        Operator::Equals => Ok(answer == expected),
        Operator::NotEquals => Ok(answer != expected),
        Operator::Contains => Ok(answer.contains(&expected)),
        Operator::GreaterThan | Operator::LessThan => {
            let (Some(lhs), Some(rhs)) = (parse_number(&answer), parse_number(&expected)) else {
                return Err(UnparsableComparison { answer, expected });
            };
            Ok(if operator == Operator::GreaterThan {
                lhs > rhs
            } else {
                lhs < rhs
            })
        }
    }
}

/// Longest leading decimal number in `value`, after leading whitespace.
///
/// Trailing text is ignored, so "70 years" reads as 70 and "1,5" as 1. `None` when no
/// digits lead the value.
fn parse_number(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Whether a single condition is currently satisfied.
///
/// An unanswered source question makes the condition `false`, whatever the operator.
pub fn evaluate(condition: &Condition, answers: &[AnswerRecord]) -> bool {
    let Some(answer) = latest_answer(answers, &condition.source_question_id) else {
        return false;
    };

    match compare(condition.operator, &answer.value, &condition.value) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!("condition {}: {err}", condition.id);
            false
        }
    }
}

/// Logical AND over `conditions`; an empty list is `true`.
///
/// This decides whether a question is shown.
pub fn evaluate_all(conditions: &[Condition], answers: &[AnswerRecord]) -> bool {
    conditions.iter().all(|c| evaluate(c, answers))
}
