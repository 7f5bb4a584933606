use std::sync::Arc;

use ledgermark_core::{Issuer, Statement};

use crate::anchor::AnchorResolver;
use crate::classify::classify;
use crate::extractor::ValueExtractor;
use crate::names::NameResolver;

/// Classifier -> extractor -> normalizer -> anchor resolver for one statement.
///
/// Holds no mutable state; one builder can serve many threads.
#[derive(Clone)]
pub struct StatementBuilder {
    extractor: ValueExtractor,
    anchors: AnchorResolver,
}

impl StatementBuilder {
    pub fn new(names: Arc<dyn NameResolver>) -> Self {
        Self {
            extractor: ValueExtractor::default(),
            anchors: AnchorResolver::new(names),
        }
    }

    pub fn with_extractor(mut self, extractor: ValueExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Build a statement from its file name and full text (pages in order).
    pub fn build(&self, name: &str, text: &str) -> Statement {
        let issuer = classify(text);
        if issuer == Issuer::Unknown {
            tracing::debug!("{name}: no issuer keyword, using generic rules");
        }

        let values = self.extractor.values(issuer, text);
        let anchoring = self.anchors.resolve(issuer, text, Some(name));

        tracing::info!(
            "{name}: issuer={issuer} anchor={} values={}",
            anchoring.anchor,
            values.len()
        );

        Statement {
            name: name.to_string(),
            issuer,
            raw_text: text.to_string(),
            anchor: anchoring.anchor,
            entity_name: anchoring.entity_name,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{NoNames, StaticNameResolver};
    use ledgermark_core::AnchorDescriptor;

    #[test]
    fn builds_complete_statement() {
        let names = Arc::new(StaticNameResolver::new([("12.345.678/0001-90", "FUNDO ALFA RF")]));
        let builder = StatementBuilder::new(names);
        let text = "BANCO DO BRASIL\nFundo CNPJ 12.345.678/0001-90\nConta: 25165-8\n\
                    SALDO ATUAL = 10.045,32";
        let s = builder.build("bb.pdf", text);

        assert_eq!(s.issuer, Issuer::BancoDoBrasil);
        assert_eq!(s.anchor, AnchorDescriptor::AccountNumber("25165-8".into()));
        assert_eq!(s.entity_name.as_deref(), Some("FUNDO ALFA RF"));
        assert_eq!(s.values.len(), 1);
        assert_eq!(s.values.iter().next().unwrap().as_str(), "10.045,32");
        assert!(s.is_matchable());
    }

    #[test]
    fn statement_without_anchor_is_not_matchable() {
        let builder = StatementBuilder::new(Arc::new(NoNames));
        let s = builder.build("x.pdf", "SALDO 1.000,00");
        assert_eq!(s.anchor, AnchorDescriptor::Unresolved);
        assert!(!s.is_matchable());
    }

    #[test]
    fn unknown_issuer_uses_generic_rules() {
        let builder = StatementBuilder::new(Arc::new(NoNames));
        let s = builder.build("extrato_777-1.pdf", "SALDO ATUAL = 10.000,00");
        assert_eq!(s.issuer, Issuer::Unknown);
        assert_eq!(s.values.iter().map(|v| v.as_str()).collect::<Vec<_>>(), vec!["10.000,00"]);
        assert_eq!(s.anchor, AnchorDescriptor::AccountNumber("777-1".into()));
    }
}
