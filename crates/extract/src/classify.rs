use ledgermark_core::Issuer;

/// Issuers in priority order with the upper-case keywords that identify them.
/// The first issuer with any keyword present in the text wins.
const ISSUER_KEYWORDS: &[(Issuer, &[&str])] = &[
    (Issuer::Itau, &["ITAÚ", "ITAU"]),
    (Issuer::Caixa, &["CAIXA", "CEF"]),
    (Issuer::BancoDoBrasil, &["BANCO DO BRASIL", "BB PREVID"]),
    (Issuer::Bradesco, &["BRADESCO"]),
    (Issuer::Safra, &["SAFRA"]),
    (Issuer::Xp, &["XP INVESTIMENTOS"]),
];

/// Pick the issuer whose rule set applies to `text`. Total and deterministic:
/// text with no known keyword is `Issuer::Unknown`.
pub fn classify(text: &str) -> Issuer {
    let upper = text.to_uppercase();
    ISSUER_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
        .map_or(Issuer::Unknown, |(issuer, _)| *issuer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn detects_each_issuer() {
        assert_eq!(classify("Banco Itaú S.A. - extrato mensal"), Issuer::Itau);
        assert_eq!(classify("CAIXA ECONOMICA FEDERAL"), Issuer::Caixa);
        assert_eq!(classify("Banco do Brasil S.A."), Issuer::BancoDoBrasil);
        assert_eq!(classify("BB Previdência RF"), Issuer::BancoDoBrasil);
        assert_eq!(classify("bradesco asset"), Issuer::Bradesco);
        assert_eq!(classify("Banco Safra"), Issuer::Safra);
        assert_eq!(classify("XP Investimentos CCTVM"), Issuer::Xp);
    }

    #[test]
    fn lowercase_accented_name_matches() {
        assert_eq!(classify("itaú unibanco"), Issuer::Itau);
    }

    #[test]
    fn priority_order_breaks_ties() {
        // Custody at Itaú of a fund administered by Bradesco.
        assert_eq!(classify("BRADESCO ... custodiante ITAU"), Issuer::Itau);
    }

    #[test]
    fn no_keyword_is_unknown() {
        assert_eq!(classify("Extrato de conta"), Issuer::Unknown);
        assert_eq!(classify(""), Issuer::Unknown);
    }

    proptest! {
        #[test]
        fn classify_is_deterministic(text in "\\PC{0,200}") {
            prop_assert_eq!(classify(&text), classify(&text));
        }
    }
}
