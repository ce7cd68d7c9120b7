use crate::answers::AnswerRecord;
use crate::condition::applicable;
use crate::section::has_pending_required;
use crate::spec::catalog::{Catalog, FlowPolicy};
use crate::spec::step::{Step, StepId};

/// Decision of the flow resolver for the top-level sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextStep<'a> {
    /// The current section still has a required question to ask.
    Stay(&'a Step),
    Advance(&'a Step),
    /// No later step applies.
    End,
}

/// Resolves the step that follows `current`.
///
/// Later ids are scanned strictly ascending and the first admissible step
/// wins; missing ids are skipped. `sub_index` is the position of the last
/// sub-question asked when `current` is a section.
pub fn next_step<'a>(
    catalog: &'a Catalog,
    current: StepId,
    sub_index: Option<usize>,
    answers: &AnswerRecord,
) -> NextStep<'a> {
    if let Some(step) = catalog.step(current)
        && let Step::Section(section) = step
        && has_pending_required(section, sub_index, answers)
    {
        return NextStep::Stay(step);
    }

    catalog
        .steps_after(current)
        .into_iter()
        .find(|step| admits(&catalog.policy, step, answers))
        .map_or(NextStep::End, NextStep::Advance)
}

fn admits(policy: &FlowPolicy, step: &Step, answers: &AnswerRecord) -> bool {
    match step {
        Step::Section(_) if !policy.gate_sections => true,
        _ => applicable(step.condition(), answers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(policy: serde_json::Value) -> Catalog {
        Catalog::from_value(json!({
            "id": "skip",
            "title": "Skip",
            "version": "1.0",
            "policy": policy,
            "steps": [
                { "kind": "question", "id": 14, "content": "Pick", "input": { "type": "single_choice", "options": ["a", "b"] } },
                { "kind": "question", "id": 15, "content": "Only for a", "input": { "type": "text" },
                  "condition": { "field": "step14", "value": "a" } },
                { "kind": "question", "id": 16, "content": "Everyone", "input": { "type": "text" } },
                { "kind": "section", "id": 18, "content": "Only for b",
                  "condition": { "field": "step14", "value": "b" }, "questions": [] },
                { "kind": "question", "id": 20, "content": "Bye", "terminal": true, "buttons": ["Again"] }
            ]
        }))
        .expect("catalog")
    }

    fn ids(next: NextStep<'_>) -> Option<StepId> {
        match next {
            NextStep::Advance(step) | NextStep::Stay(step) => Some(step.id()),
            NextStep::End => None,
        }
    }

    #[test]
    fn immediate_successor_wins_when_applicable() {
        let catalog = catalog(json!({}));
        let answers: AnswerRecord = [("step14", "a")].into_iter().collect();
        assert_eq!(ids(next_step(&catalog, 14, None, &answers)), Some(15));
    }

    #[test]
    fn false_condition_skips_to_next_unconditional_step() {
        let catalog = catalog(json!({}));
        let answers: AnswerRecord = [("step14", "b")].into_iter().collect();
        let next = next_step(&catalog, 14, None, &answers);
        assert!(matches!(next, NextStep::Advance(step) if step.id() == 16));
    }

    #[test]
    fn gaps_in_ids_are_tolerated() {
        let catalog = catalog(json!({}));
        let answers = AnswerRecord::new();
        assert_eq!(ids(next_step(&catalog, 16, None, &answers)), Some(18));
        assert_eq!(ids(next_step(&catalog, 18, None, &answers)), Some(20));
    }

    #[test]
    fn sections_are_admitted_unless_gated() {
        let answers: AnswerRecord = [("step14", "a")].into_iter().collect();
        let open = catalog(json!({}));
        assert_eq!(ids(next_step(&open, 16, None, &answers)), Some(18));
        let gated = catalog(json!({ "gate_sections": true }));
        assert_eq!(ids(next_step(&gated, 16, None, &answers)), Some(20));
    }

    #[test]
    fn end_of_catalog_resolves_to_end() {
        let catalog = catalog(json!({}));
        assert_eq!(
            next_step(&catalog, 20, None, &AnswerRecord::new()),
            NextStep::End
        );
    }

    #[test]
    fn never_moves_backwards() {
        let catalog = catalog(json!({}));
        let answers: AnswerRecord = [("step14", "a")].into_iter().collect();
        for step in &catalog.steps {
            if let Some(next) = ids(next_step(&catalog, step.id(), None, &answers)) {
                assert!(next >= step.id());
            }
        }
    }
}
