//! Shape checks applied before anything is written.
//!
//! The store runs these ahead of every write, so the gateway and direct
//! callers see the same rules and the same messages.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Assessment, NewAssessment, NewCandidate, NewJob, NewNote, NewResponse, Question,
    QuestionResponse, QuestionType, Section,
};

pub trait Validate {
    fn validate(&self) -> StoreResult<()>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl Validate for NewJob {
    fn validate(&self) -> StoreResult<()> {
        if is_blank(&self.title) {
            return Err(StoreError::validation("Title is required"));
        }
        Ok(())
    }
}

impl Validate for NewCandidate {
    fn validate(&self) -> StoreResult<()> {
        if is_blank(&self.name) || is_blank(&self.email) || is_blank(&self.job_id) {
            return Err(StoreError::validation(
                "Name, email, and jobId are required",
            ));
        }
        Ok(())
    }
}

impl Validate for NewNote {
    fn validate(&self) -> StoreResult<()> {
        if is_blank(&self.content) {
            return Err(StoreError::validation("Note content is required"));
        }
        if is_blank(&self.author_id) {
            return Err(StoreError::validation("Note authorId is required"));
        }
        Ok(())
    }
}

impl Validate for NewAssessment {
    fn validate(&self) -> StoreResult<()> {
        if is_blank(&self.job_id) || is_blank(&self.title) {
            return Err(StoreError::validation("Title and jobId are required"));
        }
        validate_sections(&self.sections)
    }
}

impl Validate for NewResponse {
    fn validate(&self) -> StoreResult<()> {
        if is_blank(&self.assessment_id) || is_blank(&self.candidate_id) {
            return Err(StoreError::validation(
                "assessmentId and candidateId are required",
            ));
        }
        Ok(())
    }
}

/// Structural rules for an assessment body.
///
/// Question ids must be unique, choice questions need options, and every
/// `dependsOn` must name another question of the same assessment without
/// forming a cycle.
pub fn validate_sections(sections: &[Section]) -> StoreResult<()> {
    let mut ids = HashSet::new();
    let mut depends_on: HashMap<&str, &str> = HashMap::new();

    for section in sections {
        if is_blank(&section.title) {
            return Err(StoreError::validation("Section title is required"));
        }
        for question in &section.questions {
            if is_blank(&question.title) {
                return Err(StoreError::validation("Question title is required"));
            }
            if question.kind.is_choice()
                && question.options.as_ref().is_none_or(|options| options.is_empty())
            {
                return Err(StoreError::validation(format!(
                    "Question '{}' needs at least one option",
                    question.title
                )));
            }
            if let Some(bounds) = &question.validation {
                if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                    if min > max {
                        return Err(StoreError::validation(format!(
                            "Question '{}' has min greater than max",
                            question.title
                        )));
                    }
                }
            }
            if question.id.is_empty() {
                if question.conditional_logic.is_some() {
                    return Err(StoreError::validation(format!(
                        "Question '{}' needs an id to use conditional logic",
                        question.title
                    )));
                }
                continue;
            }
            if !ids.insert(question.id.as_str()) {
                return Err(StoreError::validation(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            if let Some(logic) = &question.conditional_logic {
                depends_on.insert(question.id.as_str(), logic.depends_on.as_str());
            }
        }
    }

    for (&question, &target) in &depends_on {
        if question == target {
            return Err(StoreError::validation(format!(
                "Question '{}' cannot depend on itself",
                question
            )));
        }
        if !ids.contains(target) {
            return Err(StoreError::validation(format!(
                "Question '{}' depends on unknown question '{}'",
                question, target
            )));
        }
    }

    // Each question has at most one dependency, so following the chain either
    // leaves the map or comes back around.
    for &start in depends_on.keys() {
        let mut seen = HashSet::from([start]);
        let mut current = start;
        while let Some(&next) = depends_on.get(current) {
            if !seen.insert(next) {
                return Err(StoreError::validation(format!(
                    "Conditional logic starting at question '{}' forms a cycle",
                    start
                )));
            }
            current = next;
        }
    }

    Ok(())
}

/// Check submitted answers against the assessment they belong to.
pub fn validate_answers(assessment: &Assessment, answers: &[QuestionResponse]) -> StoreResult<()> {
    let questions: HashMap<&str, _> = assessment
        .questions()
        .map(|question| (question.id.as_str(), question))
        .collect();

    let mut by_question: HashMap<&str, &QuestionResponse> = HashMap::new();
    for answer in answers {
        if !questions.contains_key(answer.question_id.as_str()) {
            return Err(StoreError::validation(format!(
                "Unknown question '{}'",
                answer.question_id
            )));
        }
        if by_question.insert(answer.question_id.as_str(), answer).is_some() {
            return Err(StoreError::validation(format!(
                "Question '{}' answered more than once",
                answer.question_id
            )));
        }
    }

    for question in assessment.questions() {
        let visible = match &question.conditional_logic {
            Some(logic) => by_question
                .get(logic.depends_on.as_str())
                .is_some_and(|answer| !answer.skipped && answer.value == logic.show_if),
            None => true,
        };
        let answer = by_question
            .get(question.id.as_str())
            .filter(|answer| !answer.skipped && !is_empty_value(&answer.value));

        let Some(answer) = answer else {
            if visible && question.required {
                return Err(StoreError::validation(format!(
                    "Question '{}' is required",
                    question.title
                )));
            }
            continue;
        };

        check_value(question, &answer.value)?;
    }

    Ok(())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_value(question: &Question, value: &Value) -> StoreResult<()> {
    let invalid = |reason: &str| -> StoreResult<()> {
        Err(StoreError::validation(format!(
            "Answer to '{}' {}",
            question.title, reason
        )))
    };
    let options = question.options.as_deref().unwrap_or_default();
    let bounds = question.validation.clone().unwrap_or_default();

    match question.kind {
        QuestionType::SingleChoice => match value.as_str() {
            Some(choice) if options.iter().any(|option| option == choice) => Ok(()),
            _ => invalid("must be one of the listed options"),
        },
        QuestionType::MultiChoice => {
            let Some(choices) = value.as_array() else {
                return invalid("must be a list of options");
            };
            let all_known = choices.iter().all(|choice| {
                choice
                    .as_str()
                    .is_some_and(|choice| options.iter().any(|option| option == choice))
            });
            if all_known { Ok(()) } else { invalid("must only use listed options") }
        }
        QuestionType::ShortText | QuestionType::LongText => {
            let Some(text) = value.as_str() else {
                return invalid("must be text");
            };
            match bounds.max_length {
                Some(max) if text.chars().count() > max => {
                    invalid(&format!("must be at most {} characters", max))
                }
                _ => Ok(()),
            }
        }
        QuestionType::Numeric => {
            let Some(number) = value.as_f64() else {
                return invalid("must be a number");
            };
            if bounds.min.is_some_and(|min| number < min) {
                return invalid("is below the minimum");
            }
            if bounds.max.is_some_and(|max| number > max) {
                return invalid("is above the maximum");
            }
            Ok(())
        }
        QuestionType::FileUpload => {
            if value.is_string() { Ok(()) } else { invalid("must be a file reference") }
        }
    }
}
