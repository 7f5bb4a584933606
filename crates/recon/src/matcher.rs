use ledgermark_core::{
    AnchorDescriptor, DocumentError, HighlightColor, MatchRecord, MatcherConfig, Rect, Statement,
    TargetDocument,
};

/// Locates each statement's anchor in the master document and confirms its
/// values inside the band around every qualifying anchor occurrence.
///
/// Highlights are written as matches are found; run it once per master
/// document, from a single thread.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceMatcher {
    config: MatcherConfig,
}

impl CrossReferenceMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match every statement in order. Only document errors abort the pass.
    pub fn run<D: TargetDocument + ?Sized>(
        &self,
        doc: &mut D,
        statements: &[Statement],
    ) -> Result<Vec<MatchRecord>, DocumentError> {
        let mut records = Vec::new();
        for statement in statements {
            records.extend(self.match_statement(doc, statement)?);
        }
        Ok(records)
    }

    pub fn match_statement<D: TargetDocument + ?Sized>(
        &self,
        doc: &mut D,
        statement: &Statement,
    ) -> Result<Vec<MatchRecord>, DocumentError> {
        let mut records = Vec::new();
        if !statement.is_matchable() {
            tracing::debug!("{}: nothing to match ({})", statement.name, statement.anchor);
            return Ok(records);
        }

        let account = match &statement.anchor {
            AnchorDescriptor::AccountNumber(a)
                if a.chars().count() >= self.config.min_account_len =>
            {
                Some(a.as_str())
            }
            _ => None,
        };
        let name = statement
            .fallback_name()
            .filter(|n| n.chars().count() >= self.config.min_name_len);

        // Once the account is seen on any page, the name fallback is off for
        // the rest of the document.
        let mut found_account = false;

        for page in 0..doc.page_count() {
            let width = doc.page_width(page)?;
            let cutoff = width * self.config.column_cutoff_ratio;

            if let Some(account) = account {
                let anchors = left_column(doc.search(page, account, None)?, cutoff);
                if !anchors.is_empty() {
                    tracing::info!("{}: account {account} found on page {page}", statement.name);
                    found_account = true;
                    for anchor in anchors {
                        self.confirm_values(
                            doc,
                            statement,
                            page,
                            width,
                            anchor,
                            HighlightColor::ACCOUNT_ANCHOR,
                            &mut records,
                        )?;
                    }
                }
            }

            if found_account {
                continue;
            }
            let Some(name) = name else { continue };

            let anchors = self.find_name(doc, page, name, cutoff)?;
            if !anchors.is_empty() {
                tracing::info!("{}: located by name '{name}' on page {page}", statement.name);
            }
            for anchor in anchors {
                self.confirm_values(
                    doc,
                    statement,
                    page,
                    width,
                    anchor,
                    HighlightColor::NAME_ANCHOR,
                    &mut records,
                )?;
            }
        }

        tracing::info!("{}: {} value(s) confirmed", statement.name, records.len());
        Ok(records)
    }

    /// Exact name first; a long name that isn't found is retried by its prefix.
    fn find_name<D: TargetDocument + ?Sized>(
        &self,
        doc: &D,
        page: usize,
        name: &str,
        cutoff: f32,
    ) -> Result<Vec<Rect>, DocumentError> {
        let hits = left_column(doc.search(page, name, None)?, cutoff);
        if !hits.is_empty() || name.chars().count() <= self.config.name_prefix_len {
            return Ok(hits);
        }

        let prefix: String = name.chars().take(self.config.name_prefix_len).collect();
        let prefix = prefix.trim_end();
        tracing::debug!("Retrying name search with prefix '{prefix}'");
        Ok(left_column(doc.search(page, prefix, None)?, cutoff))
    }

    #[allow(clippy::too_many_arguments)]
    fn confirm_values<D: TargetDocument + ?Sized>(
        &self,
        doc: &mut D,
        statement: &Statement,
        page: usize,
        page_width: f32,
        anchor: Rect,
        anchor_color: HighlightColor,
        records: &mut Vec<MatchRecord>,
    ) -> Result<(), DocumentError> {
        doc.highlight(page, anchor, anchor_color)?;
        let band = anchor.band(self.config.band_margin, page_width);

        for value in &statement.values {
            for hit in doc.search(page, value.as_str(), Some(&band))? {
                doc.highlight(page, hit, HighlightColor::CONFIRMED_VALUE)?;
                tracing::debug!("{}: value {value} confirmed on page {page}", statement.name);
                records.push(MatchRecord {
                    statement: statement.name.clone(),
                    page,
                    anchor_rect: anchor,
                    value_rect: hit,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

fn left_column(hits: Vec<Rect>, cutoff: f32) -> Vec<Rect> {
    hits.into_iter().filter(|r| r.x0 < cutoff).collect()
}
