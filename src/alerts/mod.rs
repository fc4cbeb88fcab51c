// Alert evaluation module
pub mod evaluator;
pub mod message;

pub use evaluator::{evaluate, Alert, AlertRules, Evaluation, NextState};
