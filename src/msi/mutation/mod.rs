mod decision;
mod support;

pub use decision::{aic, cross_model_separation, decide, Decision, DecisionParams};
pub use support::{check_read_support, ReadSupport};
