mod orchestrator;
pub mod plan;
mod types;

pub use orchestrator::Orchestrator;
pub use types::{
    AllChecksArgs, AllChecksOutcome, CheckOutcome, StyleCheckArgs, TestCheckArgs, TypeCheckArgs,
};
