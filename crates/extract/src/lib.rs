pub mod anchor;
pub mod builder;
pub mod classify;
pub mod extractor;
pub mod names;
pub mod rules;

pub use anchor::{AnchorResolver, Anchoring};
pub use builder::StatementBuilder;
pub use classify::classify;
pub use extractor::ValueExtractor;
pub use names::{
    ChainResolver, HttpNameResolver, LookupError, NameResolver, NoNames, StaticNameResolver,
    TimeoutResolver,
};
pub use rules::{Boundary, ExtractionRule, KeywordWindow, RuleSpec, RuleTable};
