use crate::answers::AnswerRecord;
use crate::condition::applicable;
use crate::spec::step::{SectionStep, SubQuestion};

/// Result of scanning a section for its next sub-question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionCursor<'a> {
    Ask {
        index: usize,
        question: &'a SubQuestion,
    },
    Complete,
}

/// Finds the first applicable sub-question after `from`.
///
/// `from` is the index of the sub-question just answered; `None` scans from
/// the start of the section.
pub fn next_sub_question<'a>(
    section: &'a SectionStep,
    from: Option<usize>,
    answers: &AnswerRecord,
) -> SectionCursor<'a> {
    let start = from.map_or(0, |index| index + 1);
    section
        .questions
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, question)| applicable(question.condition.as_ref(), answers))
        .map_or(SectionCursor::Complete, |(index, question)| {
            SectionCursor::Ask { index, question }
        })
}

pub fn first_sub_question<'a>(
    section: &'a SectionStep,
    answers: &AnswerRecord,
) -> SectionCursor<'a> {
    next_sub_question(section, None, answers)
}

/// True while a required, currently applicable sub-question remains after
/// `current`. Re-evaluated against the latest answers on every call.
pub fn has_pending_required(
    section: &SectionStep,
    current: Option<usize>,
    answers: &AnswerRecord,
) -> bool {
    let start = current.map_or(0, |index| index + 1);
    section
        .questions
        .iter()
        .skip(start)
        .any(|question| question.required && applicable(question.condition.as_ref(), answers))
}
