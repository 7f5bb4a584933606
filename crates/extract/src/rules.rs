use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use ledgermark_core::Issuer;
use regex::Regex;

/// What must surround a rule's whole match for it to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// No check beyond the pattern itself.
    Free,
    /// Whitespace or the start/end of the text on both sides.
    Whitespace,
    /// Not glued to further digits or separators, so `1234,56` never yields `234,56`.
    Numeric,
}

impl Boundary {
    fn admits(self, text: &str, start: usize, end: usize) -> bool {
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        match self {
            Boundary::Free => true,
            Boundary::Whitespace => {
                before.map_or(true, char::is_whitespace) && after.map_or(true, char::is_whitespace)
            }
            Boundary::Numeric => {
                !before.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ',')
                    && !after.is_some_and(|c| c.is_ascii_digit())
            }
        }
    }
}

/// Requires one of `keywords` between the start of the line `lines` above the
/// match and the match itself. Comparison is case-insensitive; keywords are
/// written upper-case.
#[derive(Debug, Clone, Copy)]
pub struct KeywordWindow {
    pub keywords: &'static [&'static str],
    pub lines: usize,
}

impl KeywordWindow {
    fn admits(&self, text: &str, pos: usize) -> bool {
        let before = &text[..pos];
        let window_start = before
            .char_indices()
            .rev()
            .filter(|(_, c)| *c == '\n')
            .nth(self.lines)
            .map_or(0, |(i, _)| i + 1);
        let window = before[window_start..].to_uppercase();
        self.keywords.iter().any(|k| window.contains(k))
    }
}

/// Declarative description of one extraction rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub name: &'static str,
    pub pattern: &'static str,
    /// Capture groups emitted per match, in order.
    pub captures: &'static [usize],
    pub boundary: Boundary,
    pub context: Option<KeywordWindow>,
    /// Match against the text with line breaks turned into spaces.
    pub join_lines: bool,
}

impl RuleSpec {
    const fn labelled(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            captures: &[1],
            boundary: Boundary::Free,
            context: None,
            join_lines: true,
        }
    }
}

/// A rule paired with its compiled pattern.
#[derive(Debug)]
pub struct ExtractionRule {
    spec: RuleSpec,
    regex: Regex,
}

impl ExtractionRule {
    pub fn compile(spec: RuleSpec) -> Result<Self, regex::Error> {
        Ok(Self { regex: Regex::new(spec.pattern)?, spec })
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Appends every raw token this rule captures in `text`, in text order.
    pub fn apply(&self, text: &str, out: &mut Vec<String>) {
        let haystack: Cow<'_, str> = if self.spec.join_lines {
            // One byte for one byte, so offsets stay valid against `text`.
            Cow::Owned(text.replace(|c: char| c == '\n' || c == '\r', " "))
        } else {
            Cow::Borrowed(text)
        };

        for caps in self.regex.captures_iter(&haystack) {
            let Some(whole) = caps.get(0) else { continue };
            if !self.spec.boundary.admits(&haystack, whole.start(), whole.end()) {
                continue;
            }
            for &idx in self.spec.captures {
                let Some(m) = caps.get(idx) else { continue };
                if let Some(window) = &self.spec.context {
                    if !window.admits(text, m.start()) {
                        continue;
                    }
                }
                out.push(m.as_str().to_string());
            }
        }
    }
}

// ── Rule data ────────────────────────────────────────────────────────────────

pub const GENERIC_KEYWORDS: &[&str] = &[
    "SALDO", "TOTAL", "VALOR", "BRUTO", "LÍQUIDO", "LIQUIDO", "ATUAL", "FINAL", "RESGATADO",
    "APLICADO",
];

// Suffix letters vs. isolation: a token glued to its C/D suffix (`1.000,00C`)
// fails the isolated rule and is caught only by the suffix rule, whose
// boundary applies to token plus suffix. A token followed by a spaced suffix
// (`1.000,00 C`) satisfies both; the duplicate collapses after normalization,
// which also drops the letter.
const GENERIC_RULES: &[RuleSpec] = &[
    RuleSpec {
        name: "isolated_value",
        pattern: r"(\d{1,3}(?:\.\d{3})*,\d{2})",
        captures: &[1],
        boundary: Boundary::Whitespace,
        context: None,
        join_lines: false,
    },
    RuleSpec {
        name: "credit_debit_suffix",
        pattern: r"(\d{1,3}(?:\.\d{3})*,\d{2})[ \t]*[CDcd]",
        captures: &[1],
        boundary: Boundary::Whitespace,
        context: None,
        join_lines: false,
    },
    RuleSpec {
        name: "keyword_context",
        pattern: r"(\d{1,3}(?:\.\d{3})*,\d{2})",
        captures: &[1],
        boundary: Boundary::Numeric,
        context: Some(KeywordWindow { keywords: GENERIC_KEYWORDS, lines: 1 }),
        join_lines: false,
    },
];

const XP_RULES: &[RuleSpec] = &[
    // Treasury bonds print previous and current balance side by side,
    // followed by the unit price.
    RuleSpec {
        name: "xp_bond_balances",
        pattern: concat!(
            r"(\d{1,3}(?:\.\d{3})*,\d{2})\s+",
            r"(\d{1,3}(?:\.\d{3})*,\d{2})\s+",
            r"\d{1,3}(?:\.\d{3})*,\d+",
        ),
        captures: &[1, 2],
        boundary: Boundary::Free,
        context: None,
        join_lines: false,
    },
    RuleSpec::labelled("xp_gross_balance", r"Saldo bruto atual:\s*R\$\s*([\d.,]+)"),
    RuleSpec::labelled("xp_total_applied", r"Total aplicado:\s*R\$\s*([\d.,]+)"),
    RuleSpec::labelled("xp_total_redeemed", r"Total resgatado:\s*R\$\s*([\d.,]+)"),
    RuleSpec::labelled("xp_final_balance", r"SALDO FINAL\s+[\d,.]+\s+([\d.,]+)"),
    RuleSpec::labelled("xp_gross_yield", r"Rendimento Bruto\s+([\d.,]+)"),
];

const BANCO_DO_BRASIL_RULES: &[RuleSpec] = &[
    RuleSpec::labelled("bb_current_balance", r"SALDO ATUAL\s*=\s*([\d.,]+)"),
    RuleSpec::labelled("bb_applications", r"APLICAÇÕES\s*\(\+\)\s*([\d.,]+)"),
    RuleSpec::labelled("bb_redemptions", r"RESGATES\s*\(-\)\s*([\d.,]+)"),
    RuleSpec::labelled("bb_gross_yield", r"RENDIMENTO BRUTO\s*\(\+\)\s*([\d.,]+)"),
];

const CAIXA_RULES: &[RuleSpec] = &[
    RuleSpec::labelled("caixa_applications", r"Aplicações\s+([\d.,]+C?)"),
    RuleSpec::labelled("caixa_redemptions", r"Resgates\s+([\d.,]+D?)"),
    RuleSpec::labelled("caixa_gross_balance", r"Saldo Bruto\*\s+([\d.,]+C?)"),
    RuleSpec::labelled("caixa_monthly_yield", r"Rendimento Bruto no Mês\s+([\d.,]+C?)"),
    RuleSpec::labelled("caixa_gross_yield", r"Rendimento Bruto\s+R\$\s*([\d.,]+)"),
    RuleSpec::labelled("caixa_final_balance", r"Saldo Bruto Final\s+R\$\s*([\d.,]+)"),
];

const BRADESCO_RULES: &[RuleSpec] = &[
    RuleSpec::labelled("bradesco_dated_balance", r"Saldo em\s+\d{2}/\d{2}/\d{4}\s+([\d.,]+)"),
    RuleSpec::labelled("bradesco_final_balance", r"Saldo Final\s+[\d.,]+\s+[\d,.]+\s+([\d.,]+)"),
    RuleSpec::labelled("bradesco_gross_yield", r"Rendimento\s+Bruto\s+([\d.,]+)"),
    RuleSpec::labelled("bradesco_applications", r"Aplicações no Período\s+([\d.,]+)"),
    RuleSpec::labelled("bradesco_redemptions", r"Resgates no Período\s+[\d,.]+\s+([\d.,]+)"),
];

const ITAU_RULES: &[RuleSpec] = &[
    RuleSpec::labelled("itau_gross_balance", r"SALDO BRUTO ATUAL\s+[\d,.]+\s+([\d.,]+)"),
    RuleSpec::labelled("itau_applications", r"APLICACOES\s+([\d.,]+)"),
    RuleSpec::labelled("itau_redemptions", r"RESGATES\s+([\d.,]+)"),
    RuleSpec::labelled("itau_monthly_yield", r"RENDIMENTO BRUTO NO MES\s+([\d.,]+)"),
];

/// Issuer-specific rules. Issuers absent here (and `Unknown`) run the
/// generic rules only.
const ISSUER_RULES: &[(Issuer, &[RuleSpec])] = &[
    (Issuer::Xp, XP_RULES),
    (Issuer::BancoDoBrasil, BANCO_DO_BRASIL_RULES),
    (Issuer::Caixa, CAIXA_RULES),
    (Issuer::Bradesco, BRADESCO_RULES),
    (Issuer::Itau, ITAU_RULES),
];

// ── Compiled table ───────────────────────────────────────────────────────────

/// Issuer tag -> ordered rule list. Each issuer runs its own rules first and
/// the shared generic rules after them.
#[derive(Debug)]
pub struct RuleTable {
    by_issuer: HashMap<Issuer, Vec<ExtractionRule>>,
    generic: Vec<ExtractionRule>,
}

impl RuleTable {
    pub fn new(
        issuer_rules: &[(Issuer, &[RuleSpec])],
        generic_rules: &[RuleSpec],
    ) -> Result<Self, regex::Error> {
        let mut by_issuer = HashMap::new();
        for (issuer, specs) in issuer_rules {
            let compiled = specs
                .iter()
                .map(|s| ExtractionRule::compile(*s))
                .collect::<Result<Vec<_>, _>>()?;
            by_issuer.insert(*issuer, compiled);
        }
        let generic = generic_rules
            .iter()
            .map(|s| ExtractionRule::compile(*s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { by_issuer, generic })
    }

    /// The built-in table, compiled once.
    pub fn standard() -> &'static RuleTable {
        static TABLE: OnceLock<RuleTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            RuleTable::new(ISSUER_RULES, GENERIC_RULES).expect("invalid built-in rule pattern")
        })
    }

    pub fn rules_for(&self, issuer: Issuer) -> impl Iterator<Item = &ExtractionRule> {
        self.by_issuer
            .get(&issuer)
            .into_iter()
            .flatten()
            .chain(self.generic.iter())
    }
}
