pub mod catalog;
pub mod input;
pub mod step;

pub use catalog::{Catalog, CatalogError, Checkpoint, FlowPolicy};
pub use input::{Constraint, InputKind, InputSpec};
pub use step::{QuestionId, QuestionStep, SectionStep, Step, StepId, SubQuestion};
