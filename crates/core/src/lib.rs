pub mod config;
pub mod layout;
pub mod money;
pub mod statement;

pub use config::{ConfigError, LedgermarkConfig, MatcherConfig, NamesConfig, OcrConfig};
pub use layout::{DocumentError, HighlightColor, Rect, TargetDocument};
pub use money::{normalize, ValueToken};
pub use statement::{AnchorDescriptor, Issuer, MatchRecord, Statement};
