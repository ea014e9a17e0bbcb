mod access;
mod models;
pub mod omics;
mod reference;

pub use access::{AccessMode, GroupRelation};
pub use models::*;
pub use omics::{
    OmicSequence, SequenceStep, StepTable, are_valid_sequence_step, get_reference_tables,
};
pub use reference::{QueryTable, RangeTable, ReferenceTable};
