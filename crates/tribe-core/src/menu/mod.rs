//! Menu engine: eligibility rules, weighted selection and generation.

mod eligibility;
mod generator;
mod selector;

pub use eligibility::{Candidate, EligibilityFilter};
pub use generator::MenuGenerator;
pub use selector::{cumulative_weights, pick_index, WeightedSelector};
