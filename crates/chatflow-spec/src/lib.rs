#![allow(missing_docs)]

pub mod answers;
pub mod condition;
pub mod lint;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod section;
pub mod spec;
pub mod validate;

pub use answers::{AnswerRecord, FieldKey, MULTI_VALUE_DELIMITER};
pub use condition::{Condition, ConditionMode, Expectation, Expected, FieldSelector, applicable};
pub use lint::{CatalogIssue, lint};
pub use progress::{Progress, progress};
pub use render::{InputView, SectionHeader, StepDescriptor, render_json_ui, render_text};
pub use resolver::{NextStep, next_step};
pub use section::{SectionCursor, first_sub_question, has_pending_required, next_sub_question};
pub use spec::{
    Catalog, CatalogError, Checkpoint, Constraint, FlowPolicy, InputKind, InputSpec, QuestionId,
    QuestionStep, SectionStep, Step, StepId, SubQuestion,
};
pub use validate::{InputError, validate_button, validate_input};
