//! Wizard steps and the ordered sequence that holds them.

pub mod sequence;
pub mod step;

pub use sequence::StepSequence;
pub use step::{
    ConfiguredStep, FieldText, LoggedSave, Rules, SaveStep, Step, StepKind, StepSource,
};
