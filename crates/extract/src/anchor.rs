use std::path::Path;
use std::sync::{Arc, OnceLock};

use ledgermark_core::{AnchorDescriptor, Issuer};
use regex::Regex;

use crate::names::NameResolver;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_account,
    r"(?i)\bconta(?:\s+corrente)?(?:\s+n[º°o.]*)?\s*[:.\-]?\s*(\d{2,12}(?:-[0-9xX])?)\b");
re!(re_cnpj,
    r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}");
re!(re_itau_inline_cnpj,
    r"CNPJ\s+(\S+)\s+Taxa");
re!(re_file_account,
    r"(?i)(\d+-[0-9x])$");

/// The resolved anchor plus the entity name kept for the matcher's fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchoring {
    pub anchor: AnchorDescriptor,
    pub entity_name: Option<String>,
}

/// Determines what identifies a statement in the master document.
///
/// An account number found in the text (or, failing that, at the end of the
/// file name) is the anchor and is never looked up. Tax identifiers are looked
/// up through the name resolver; the first that resolves names the entity,
/// otherwise the first raw identifier stands in for the name.
#[derive(Clone)]
pub struct AnchorResolver {
    names: Arc<dyn NameResolver>,
}

impl AnchorResolver {
    pub fn new(names: Arc<dyn NameResolver>) -> Self {
        Self { names }
    }

    pub fn resolve(&self, issuer: Issuer, text: &str, file_name: Option<&str>) -> Anchoring {
        let account = find_account(text).or_else(|| file_name.and_then(account_from_file_name));
        let tax_ids = find_tax_ids(issuer, text);
        let entity_name = self.entity_name(&tax_ids);

        let anchor = match (&account, &entity_name) {
            (Some(acct), _) => AnchorDescriptor::account(acct),
            (None, Some(name)) => AnchorDescriptor::EntityName(name.clone()),
            (None, None) => AnchorDescriptor::Unresolved,
        };
        Anchoring { anchor, entity_name }
    }

    fn entity_name(&self, tax_ids: &[String]) -> Option<String> {
        for id in tax_ids {
            match self.names.resolve(id) {
                Ok(Some(name)) => {
                    tracing::debug!("Tax id {id} resolved to '{name}'");
                    return Some(name);
                }
                Ok(None) => tracing::debug!("No directory entry for tax id {id}"),
                Err(e) => tracing::warn!("Name lookup for {id} failed, using raw identifier: {e}"),
            }
        }
        tax_ids.first().cloned()
    }
}

/// The labelled "Conta" field, e.g. `Conta: 25165-8` or `Conta corrente nº 1234-X`.
pub fn find_account(text: &str) -> Option<String> {
    re_account()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .next()
}

/// Account hint at the end of the file stem: `extrato_25165-8.pdf` -> `25165-8`.
pub fn account_from_file_name(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    re_file_account()
        .captures(stem)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// Distinct tax identifiers in document order.
pub fn find_tax_ids(issuer: Issuer, text: &str) -> Vec<String> {
    let mut ids: Vec<String> = re_cnpj()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    // Itaú prints the fund's CNPJ between the "CNPJ" and "Taxa" column labels,
    // sometimes without punctuation.
    if issuer == Issuer::Itau {
        ids.extend(
            re_itau_inline_cnpj()
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|s| s.chars().any(|c| c.is_ascii_digit())),
        );
    }

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}
