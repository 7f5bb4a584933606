pub mod batch;
pub mod matcher;

pub use batch::{
    ReconcileError, ReconcileReport, Reconciler, SkipReason, SkippedStatement, StatementInput,
};
pub use matcher::CrossReferenceMatcher;
