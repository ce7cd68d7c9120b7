use serde::Serialize;

use crate::answers::AnswerRecord;
use crate::condition::applicable;
use crate::spec::catalog::Catalog;
use crate::spec::step::Step;

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

/// Counts the questions that currently apply and how many of them have an answer.
///
/// Terminal steps are not counted. Sections follow the catalog's gating policy.
pub fn progress(catalog: &Catalog, answers: &AnswerRecord) -> Progress {
    let mut counters = Progress::default();
    let mut tally = |answered: bool| {
        counters.total += 1;
        if answered {
            counters.answered += 1;
        }
    };

    for step in &catalog.steps {
        match step {
            Step::Question(question) => {
                if question.terminal || !applicable(question.condition.as_ref(), answers) {
                    continue;
                }
                tally(answers.contains(question.field_key().as_str()));
            }
            Step::Section(section) => {
                if catalog.policy.gate_sections
                    && !applicable(section.condition.as_ref(), answers)
                {
                    continue;
                }
                for question in &section.questions {
                    if applicable(question.condition.as_ref(), answers) {
                        tally(answers.contains(section.field_key(question).as_str()));
                    }
                }
            }
        }
    }

    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_only_applicable_questions() {
        let catalog = Catalog::from_value(json!({
            "id": "p",
            "title": "P",
            "version": "1.0",
            "steps": [
                { "kind": "question", "id": 1, "content": "Hi", "field": "intro", "buttons": ["Go"] },
                { "kind": "section", "id": 2, "content": "S", "questions": [
                    { "id": 1, "content": "Bus?", "input": { "type": "single_choice", "options": ["Yes", "No"] }, "required": true },
                    { "id": 2, "content": "When?", "input": { "type": "time" }, "required": true,
                      "condition": { "field": "2_1", "value": "Yes" } }
                ]},
                { "kind": "question", "id": 3, "content": "Bye", "terminal": true, "buttons": ["Again"] }
            ]
        }))
        .expect("catalog");

        let start = progress(&catalog, &AnswerRecord::new());
        assert_eq!(start, Progress { answered: 0, total: 2 });

        let answers: AnswerRecord = [("intro", "Go"), ("2_1", "Yes")].into_iter().collect();
        assert_eq!(progress(&catalog, &answers), Progress { answered: 2, total: 3 });
    }
}
