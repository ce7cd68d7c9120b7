use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use chatflow_spec::{
    AnswerRecord, Catalog, CatalogError, InputError, NextStep, Progress, QuestionStep,
    SectionCursor, SectionStep, Step, StepDescriptor, StepId, first_sub_question, lint,
    next_step, next_sub_question, progress, validate_button, validate_input,
};

use crate::error::EngineError;
use crate::submit::Submitter;

/// Coarse state exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Asking,
    /// A section boundary was just crossed.
    Transitioning,
    /// Nothing left to ask. Also reported for an exhausted catalog.
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Asking,
    Terminal,
    Exhausted,
}

/// Per-conversation state. Owned by the caller and passed to every engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    step_id: StepId,
    sub_index: Option<usize>,
    answers: AnswerRecord,
    status: Status,
}

impl EngineState {
    fn fresh(step_id: StepId) -> Self {
        Self {
            step_id,
            sub_index: None,
            answers: AnswerRecord::new(),
            status: Status::Asking,
        }
    }

    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    /// Index of the sub-question being asked when the current step is a section.
    pub fn sub_index(&self) -> Option<usize> {
        self.sub_index
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn phase(&self) -> Phase {
        match self.status {
            Status::Asking => Phase::Asking,
            Status::Terminal | Status::Exhausted => Phase::Terminal,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.status == Status::Exhausted
    }
}

/// What the caller should display after an engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Asking {
        descriptor: StepDescriptor,
    },
    Transitioning {
        from: StepId,
        next: StepDescriptor,
    },
    /// The answer was refused; nothing was recorded and the same prompt stands.
    Rejected {
        descriptor: StepDescriptor,
        error: InputError,
    },
    Terminal {
        descriptor: StepDescriptor,
    },
    /// No later step applies and no terminal step was reached.
    Exhausted {
        after: StepId,
    },
}

impl Outcome {
    pub fn phase(&self) -> Phase {
        match self {
            Outcome::Asking { .. } | Outcome::Rejected { .. } => Phase::Asking,
            Outcome::Transitioning { .. } => Phase::Transitioning,
            Outcome::Terminal { .. } | Outcome::Exhausted { .. } => Phase::Terminal,
        }
    }

    pub fn descriptor(&self) -> Option<&StepDescriptor> {
        match self {
            Outcome::Asking { descriptor }
            | Outcome::Rejected { descriptor, .. }
            | Outcome::Terminal { descriptor } => Some(descriptor),
            Outcome::Transitioning { next, .. } => Some(next),
            Outcome::Exhausted { .. } => None,
        }
    }

    fn crossing(self, from: StepId) -> Self {
        match self {
            Outcome::Asking { descriptor } => Outcome::Transitioning {
                from,
                next: descriptor,
            },
            other => other,
        }
    }
}

/// Drives conversations over one catalog.
///
/// The engine holds no per-conversation data: every conversation owns an
/// [`EngineState`], so independent conversations never share mutable state.
pub struct Engine {
    catalog: Arc<Catalog>,
    submitter: Arc<dyn Submitter>,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>, submitter: Arc<dyn Submitter>) -> Result<Self, EngineError> {
        if catalog.steps.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        let issues = lint(&catalog);
        if !issues.is_empty() {
            return Err(CatalogError::Invalid(issues).into());
        }
        Ok(Self { catalog, submitter })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Starts a conversation and returns what to display first.
    pub fn initialize(&self) -> (EngineState, Outcome) {
        let first = self.catalog.first_step().map_or(0, Step::id);
        let mut state = EngineState::fresh(first);
        let outcome = self.start(&mut state);
        (state, outcome)
    }

    /// Discards all answers and returns to the first step.
    pub fn reset(&self, state: &mut EngineState) -> Outcome {
        let first = self.catalog.first_step().map_or(0, Step::id);
        *state = EngineState::fresh(first);
        info!(step = first, "conversation reset");
        self.start(state)
    }

    /// Records one answer and advances to whatever comes next.
    pub fn submit_answer(&self, state: &mut EngineState, raw: &str) -> Outcome {
        match state.status {
            Status::Exhausted => {
                return Outcome::Exhausted {
                    after: state.step_id,
                };
            }
            Status::Terminal => return self.answer_terminal(state, raw),
            Status::Asking => {}
        }

        match self.catalog.step(state.step_id) {
            Some(Step::Question(step)) => self.answer_question(state, step, raw),
            Some(Step::Section(section)) => self.answer_section(state, section, raw),
            None => {
                warn!(step = state.step_id, "current step is missing from the catalog");
                state.status = Status::Exhausted;
                Outcome::Exhausted {
                    after: state.step_id,
                }
            }
        }
    }

    /// Descriptor of the prompt the state is currently waiting on.
    pub fn current(&self, state: &EngineState) -> Option<StepDescriptor> {
        if state.status == Status::Exhausted {
            return None;
        }
        match self.catalog.step(state.step_id)? {
            Step::Question(step) => Some(StepDescriptor::for_question_step(step)),
            Step::Section(section) => {
                let question = section.question(state.sub_index?)?;
                Some(StepDescriptor::for_sub_question(section, question))
            }
        }
    }

    pub fn progress(&self, state: &EngineState) -> Progress {
        progress(&self.catalog, &state.answers)
    }

    fn start(&self, state: &mut EngineState) -> Outcome {
        match self.catalog.step(state.step_id) {
            Some(step) => self.enter(state, step),
            None => {
                state.status = Status::Exhausted;
                Outcome::Exhausted { after: 0 }
            }
        }
    }

    fn answer_question(&self, state: &mut EngineState, step: &QuestionStep, raw: &str) -> Outcome {
        let value = match accept_question(step, raw) {
            Ok(value) => value,
            Err(error) => {
                debug!(step = step.id, code = error.code(), "answer rejected");
                return Outcome::Rejected {
                    descriptor: StepDescriptor::for_question_step(step),
                    error,
                };
            }
        };

        let field = step.field_key();
        debug!(step = step.id, field = %field, "answer recorded");
        state.answers.record(field, value);
        self.checkpoint(state, step.id, None);
        self.advance(state, false, step.id, None)
    }

    fn answer_section(&self, state: &mut EngineState, section: &SectionStep, raw: &str) -> Outcome {
        let Some((index, question)) = state
            .sub_index
            .and_then(|index| section.question(index).map(|question| (index, question)))
        else {
            warn!(step = section.id, "no sub-question is pending; resolving next step");
            let sub_index = state.sub_index;
            return self.advance(state, true, section.id, sub_index);
        };

        let value = match validate_input(&question.input, question.required, raw) {
            Ok(value) => value,
            Err(error) => {
                debug!(
                    step = section.id,
                    question = question.id,
                    code = error.code(),
                    "answer rejected"
                );
                return Outcome::Rejected {
                    descriptor: StepDescriptor::for_sub_question(section, question),
                    error,
                };
            }
        };

        let field = section.field_key(question);
        debug!(step = section.id, question = question.id, field = %field, "answer recorded");
        state.answers.record(field, value);
        self.checkpoint(state, section.id, Some(question.id));

        match next_sub_question(section, Some(index), &state.answers) {
            SectionCursor::Ask { index, question } => {
                state.sub_index = Some(index);
                Outcome::Asking {
                    descriptor: StepDescriptor::for_sub_question(section, question),
                }
            }
            SectionCursor::Complete => {
                debug!(step = section.id, "section complete");
                self.advance(state, true, section.id, Some(index))
            }
        }
    }

    fn answer_terminal(&self, state: &mut EngineState, raw: &str) -> Outcome {
        let Some(Step::Question(step)) = self.catalog.step(state.step_id) else {
            return self.reset(state);
        };
        if step.buttons.is_empty() {
            return self.reset(state);
        }
        match validate_button(&step.buttons, raw) {
            Ok(_) => self.reset(state),
            Err(error) => Outcome::Rejected {
                descriptor: StepDescriptor::for_question_step(step),
                error,
            },
        }
    }

    fn checkpoint(&self, state: &EngineState, step: StepId, question: Option<u32>) {
        if self.catalog.is_checkpoint(step, question) {
            info!(
                step,
                question,
                fields = state.answers.len(),
                "checkpoint reached; submitting answers"
            );
            self.submitter.dispatch(state.answers.clone());
        }
    }

    fn advance(
        &self,
        state: &mut EngineState,
        from_section: bool,
        from: StepId,
        sub_index: Option<usize>,
    ) -> Outcome {
        match next_step(&self.catalog, from, sub_index, &state.answers) {
            NextStep::Stay(Step::Section(section)) => {
                match next_sub_question(section, sub_index, &state.answers) {
                    SectionCursor::Ask { index, question } => {
                        state.sub_index = Some(index);
                        Outcome::Asking {
                            descriptor: StepDescriptor::for_sub_question(section, question),
                        }
                    }
                    SectionCursor::Complete => self.exhaust(state, from),
                }
            }
            NextStep::Stay(step) => self.enter(state, step),
            NextStep::Advance(step) => {
                debug!(from, to = step.id(), "advancing to next step");
                let outcome = self.enter(state, step);
                if from_section || step.is_section() {
                    outcome.crossing(from)
                } else {
                    outcome
                }
            }
            NextStep::End => self.exhaust(state, from),
        }
    }

    fn enter(&self, state: &mut EngineState, step: &Step) -> Outcome {
        state.step_id = step.id();
        state.sub_index = None;
        match step {
            Step::Question(question) if question.terminal => {
                state.status = Status::Terminal;
                info!(step = question.id, "dialogue reached its terminal step");
                Outcome::Terminal {
                    descriptor: StepDescriptor::for_question_step(question),
                }
            }
            Step::Question(question) => {
                state.status = Status::Asking;
                Outcome::Asking {
                    descriptor: StepDescriptor::for_question_step(question),
                }
            }
            Step::Section(section) => match first_sub_question(section, &state.answers) {
                SectionCursor::Ask { index, question } => {
                    state.status = Status::Asking;
                    state.sub_index = Some(index);
                    Outcome::Asking {
                        descriptor: StepDescriptor::for_sub_question(section, question),
                    }
                }
                SectionCursor::Complete => {
                    debug!(step = section.id, "section has no applicable questions");
                    self.advance(state, true, section.id, None)
                }
            },
        }
    }

    fn exhaust(&self, state: &mut EngineState, after: StepId) -> Outcome {
        warn!(after, "no next step and no terminal step reached; check the catalog");
        state.status = Status::Exhausted;
        Outcome::Exhausted { after }
    }
}

/// Buttons take precedence; free input is checked when no button matches.
fn accept_question(step: &QuestionStep, raw: &str) -> Result<String, InputError> {
    match (&step.input, step.buttons.is_empty()) {
        (None, _) => validate_button(&step.buttons, raw),
        (Some(input), true) => validate_input(input, step.required, raw),
        (Some(input), false) => validate_button(&step.buttons, raw)
            .or_else(|_| validate_input(input, step.required, raw)),
    }
}
