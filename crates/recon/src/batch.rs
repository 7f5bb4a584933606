use std::fmt;
use std::sync::Arc;

use ledgermark_core::{AnchorDescriptor, DocumentError, MatchRecord, Statement, TargetDocument};
use ledgermark_extract::StatementBuilder;
use ledgermark_pdf::TextSource;
use serde::Serialize;
use thiserror::Error;

use crate::matcher::CrossReferenceMatcher;

/// One uploaded statement document.
#[derive(Debug, Clone)]
pub struct StatementInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StatementInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

/// Why a statement took no part in matching. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    DocumentUnreadable(String),
    NoValuesExtracted,
    AnchorUnresolved,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DocumentUnreadable(e) => write!(f, "document unreadable: {e}"),
            SkipReason::NoValuesExtracted => write!(f, "no values extracted"),
            SkipReason::AnchorUnresolved => write!(f, "no account or tax identifier found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStatement {
    pub name: String,
    pub reason: SkipReason,
}

/// Failures of the master document. These abort the batch.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Master document unreadable: {0}")]
    MasterUnreadable(#[source] DocumentError),
    #[error("Could not write the annotated document: {0}")]
    AnnotationWriteFailure(#[source] DocumentError),
}

#[derive(Debug)]
pub struct ReconcileReport {
    pub matches: Vec<MatchRecord>,
    pub skipped: Vec<SkippedStatement>,
    /// The annotated master document.
    pub document: Vec<u8>,
}

impl ReconcileReport {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Extracts statements in parallel, then matches them one by one against
/// the master document.
#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn TextSource>,
    builder: StatementBuilder,
    matcher: CrossReferenceMatcher,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn TextSource>,
        builder: StatementBuilder,
        matcher: CrossReferenceMatcher,
    ) -> Self {
        Self { source, builder, matcher }
    }

    /// Extract one statement, or say why it can't be matched.
    pub fn extract(&self, input: &StatementInput) -> Result<Statement, SkipReason> {
        let text = self
            .source
            .read_text(&input.bytes)
            .map_err(|e| SkipReason::DocumentUnreadable(e.to_string()))?;
        let statement = self.builder.build(&input.name, &text);

        if statement.anchor == AnchorDescriptor::Unresolved {
            return Err(SkipReason::AnchorUnresolved);
        }
        if statement.values.is_empty() {
            return Err(SkipReason::NoValuesExtracted);
        }
        Ok(statement)
    }

    /// Extract every input on the blocking pool. Output keeps input order.
    pub async fn extract_all(
        &self,
        inputs: Vec<StatementInput>,
    ) -> (Vec<Statement>, Vec<SkippedStatement>) {
        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let this = self.clone();
                let name = input.name.clone();
                (name, tokio::task::spawn_blocking(move || this.extract(&input)))
            })
            .collect();

        let mut statements = Vec::new();
        let mut skipped = Vec::new();
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    Err(SkipReason::DocumentUnreadable(format!("extraction task failed: {e}")))
                }
            };
            match outcome {
                Ok(statement) => statements.push(statement),
                Err(reason) => {
                    tracing::warn!("Skipping {name}: {reason}");
                    skipped.push(SkippedStatement { name, reason });
                }
            }
        }
        (statements, skipped)
    }

    /// Full pass: extract, match, save the annotated master.
    pub async fn reconcile<D: TargetDocument>(
        &self,
        master: &mut D,
        inputs: Vec<StatementInput>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let total = inputs.len();
        let (statements, skipped) = self.extract_all(inputs).await;
        tracing::info!("{} of {total} statement(s) ready for matching", statements.len());

        let matches = self
            .matcher
            .run(master, &statements)
            .map_err(ReconcileError::MasterUnreadable)?;
        let document = master.save().map_err(ReconcileError::AnnotationWriteFailure)?;

        tracing::info!("{} item(s) confirmed", matches.len());
        Ok(ReconcileReport { matches, skipped, document })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermark_extract::NoNames;

    /// Treats the bytes as the document's text; empty input is unreadable.
    struct PlainText;

    impl TextSource for PlainText {
        fn read_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
            if bytes.is_empty() {
                return Err(DocumentError::Unreadable("empty file".into()));
            }
            String::from_utf8(bytes.to_vec()).map_err(|e| DocumentError::Unreadable(e.to_string()))
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Arc::new(PlainText),
            StatementBuilder::new(Arc::new(NoNames)),
            CrossReferenceMatcher::default(),
        )
    }

    #[test]
    fn extract_reports_skip_reasons() {
        let r = reconciler();
        let unreadable = r.extract(&StatementInput::new("a.pdf", vec![])).unwrap_err();
        assert!(matches!(unreadable, SkipReason::DocumentUnreadable(_)));

        let no_anchor = r.extract(&StatementInput::new("b.pdf", b"SALDO 1.000,00".to_vec()));
        assert_eq!(no_anchor.unwrap_err(), SkipReason::AnchorUnresolved);

        let zero = StatementInput::new("c.pdf", b"Conta: 25165-8\nSALDO 0,00".to_vec());
        let no_values = r.extract(&zero);
        assert_eq!(no_values.unwrap_err(), SkipReason::NoValuesExtracted);
    }

    #[tokio::test]
    async fn extract_all_keeps_input_order_and_isolates_failures() {
        let inputs = vec![
            StatementInput::new("one.pdf", b"Conta: 111-1\nSALDO 1.000,00".to_vec()),
            StatementInput::new("broken.pdf", vec![]),
            StatementInput::new("two.pdf", b"Conta: 222-2\nSALDO 2.000,00".to_vec()),
        ];
        let (statements, skipped) = reconciler().extract_all(inputs).await;
        let names: Vec<_> = statements.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["one.pdf", "two.pdf"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "broken.pdf");
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::NoValuesExtracted.to_string(), "no values extracted");
    }
}
