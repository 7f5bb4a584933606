use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A positive monetary value written the way the master ledger prints it:
/// grouping dots and a decimal comma, e.g. `1.234,56`.
///
/// Two tokens are equal iff their strings are equal. The string is also the
/// literal searched for in the master document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValueToken {
    text: String,
    amount: Decimal,
}

impl ValueToken {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

impl fmt::Display for ValueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for ValueToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).ok_or_else(|| format!("Not a positive monetary value: '{s}'"))
    }
}

impl TryFrom<String> for ValueToken {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ValueToken> for String {
    fn from(token: ValueToken) -> Self {
        token.text
    }
}

/// Canonicalise a raw value token pulled from statement text.
///
/// Currency symbols, credit/debit suffix letters and other noise are dropped.
/// Returns `None` when nothing numeric remains or the value is not positive.
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> Option<ValueToken> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.trim_end_matches(|c| c == ',' || c == '.');
    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let text = group_thousands(&decimal_comma(&zero_integer_part(cleaned)));
    let amount = parse_amount(&text)?;
    if amount <= Decimal::ZERO {
        return None;
    }
    Some(ValueToken { text, amount })
}

/// A bare fraction keeps its separator and gains a zero integer part:
/// `,50` and `.50` become `0,50` and `0.50`.
fn zero_integer_part(s: &str) -> String {
    let digits = s.trim_start_matches(|c| c == ',' || c == '.');
    match s[..s.len() - digits.len()].chars().last() {
        Some(sep) => format!("0{sep}{digits}"),
        None => s.to_string(),
    }
}

/// Turns a dot used as decimal separator into a comma.
///
/// A string holding both separators is already formatted and is left alone.
/// Without a comma, a final dot-segment of exactly two digits is the fraction:
/// `1234.56` and the OCR grouping slip `1.234.56` both become `1234,56`.
fn decimal_comma(s: &str) -> String {
    if s.contains(',') {
        return s.to_string();
    }
    match s.rsplit_once('.') {
        Some((head, tail)) if tail.len() == 2 => format!("{},{}", head.replace('.', ""), tail),
        _ => s.to_string(),
    }
}

/// Inserts grouping dots into an ungrouped integer part: `1234,56` -> `1.234,56`.
fn group_thousands(s: &str) -> String {
    let Some((int, frac)) = s.split_once(',') else {
        return s.to_string();
    };
    if int.len() <= 3 || int.contains('.') || frac.contains(&['.', ','][..]) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out.push(',');
    out.push_str(frac);
    out
}

fn parse_amount(text: &str) -> Option<Decimal> {
    let plain = text.replace('.', "").replace(',', ".");
    Decimal::from_str(&plain).ok()
}
