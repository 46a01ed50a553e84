pub mod proposal;
pub mod simulation;
pub mod submission;
pub mod validation;
