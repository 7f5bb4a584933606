use std::collections::BTreeSet;

use ledgermark_core::{normalize, Issuer, ValueToken};

use crate::rules::RuleTable;

/// Runs an issuer's rule list over statement text.
#[derive(Debug, Clone, Copy)]
pub struct ValueExtractor {
    table: &'static RuleTable,
}

impl Default for ValueExtractor {
    fn default() -> Self {
        Self::new(RuleTable::standard())
    }
}

impl ValueExtractor {
    pub fn new(table: &'static RuleTable) -> Self {
        Self { table }
    }

    /// Raw candidate tokens from every rule, rule order first, then text
    /// order. Duplicates are kept.
    pub fn raw_values(&self, issuer: Issuer, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for rule in self.table.rules_for(issuer) {
            rule.apply(text, &mut out);
        }
        out
    }

    /// Normalized, de-duplicated values. Zero and unparseable tokens are dropped.
    pub fn values(&self, issuer: Issuer, text: &str) -> BTreeSet<ValueToken> {
        self.raw_values(issuer, text)
            .iter()
            .filter_map(|raw| normalize(raw))
            .collect()
    }
}
