use std::sync::LazyLock;

use regex::Regex;

use super::PhiKind;

/// A compiled substitution with its placeholder.
pub struct RedactionRule {
    pub regex: Regex,
    pub replacement: &'static str,
    pub kind: PhiKind,
}

fn rule(pattern: &str, replacement: &'static str, kind: PhiKind) -> RedactionRule {
    RedactionRule {
        regex: Regex::new(pattern).expect("valid redaction regex"),
        replacement,
        kind,
    }
}

/// A capitalized name token ("Jane", "O'Brien", "SMITH").
const NAME_WORD: &str = r"[A-Z][A-Za-z'\-]+";

/// Gap between name tokens: spaces, or one line break from OCR/PDF wrapping.
const NAME_GAP: &str = r"(?:[ \t]*\n[ \t]*|[ \t]+)";

/// Pass 1: labelled patient and clinician names.
pub static NAME_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        rule(
            &format!(r"\b(?i:patient|name)\s*:?\s*{NAME_WORD}(?:{NAME_GAP}{NAME_WORD})+"),
            "Patient: [REDACTED]",
            PhiKind::Name,
        ),
        rule(
            &format!(r"\b(?i:dr\.|doctor\b)\s*:?\s*{NAME_WORD}(?:{NAME_GAP}{NAME_WORD})*"),
            "Doctor: [REDACTED]",
            PhiKind::Name,
        ),
    ]
});

/// Pass 2: identifiers. SSN first, long digit runs last.
pub static ID_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        rule(r"\b\d{3}-\d{2}-\d{4}\b", "[ID_REDACTED]", PhiKind::Identifier),
        rule(r"(?i)\bMRN\s*[:#]?\s*\d+\b", "MRN: [REDACTED]", PhiKind::Identifier),
        rule(r"(?i)\bID\b\s*[:#]?\s*\w+\b", "ID: [REDACTED]", PhiKind::Identifier),
        rule(r"\b\d{10,}\b", "[ID_REDACTED]", PhiKind::Identifier),
    ]
});

/// Pass 3: date of birth. Keeps the label, replaces the date.
pub static DOB_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![rule(
        r"(?i)\b(DOB|Birth|Born)[:\s]*\d{1,2}[/-]\d{1,2}[/-]\d{4}\b",
        "${1}: [DATE_REDACTED]",
        PhiKind::DateOfBirth,
    )]
});

/// Pass 4: street addresses ("221 Baker Street", "5 Elm Ave.").
pub static ADDRESS_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![rule(
        r"\b\d+\s+[A-Z][a-z]+\s+(?i:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln)\b\.?",
        "[ADDRESS_REDACTED]",
        PhiKind::Address,
    )]
});

/// Pass 5: phone numbers and email addresses.
pub static CONTACT_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        rule(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b", "[PHONE_REDACTED]", PhiKind::Contact),
        rule(
            r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b",
            "[EMAIL_REDACTED]",
            PhiKind::Contact,
        ),
    ]
});

/// Redaction passes in the order they must run.
pub fn redaction_passes() -> [&'static [RedactionRule]; 5] {
    [
        NAME_RULES.as_slice(),
        ID_RULES.as_slice(),
        DOB_RULES.as_slice(),
        ADDRESS_RULES.as_slice(),
        CONTACT_RULES.as_slice(),
    ]
}

/// Shapes that only the detector looks for (no substitution).
pub static DETECTION_ONLY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Patient:\s*[A-Z][a-z]+\s+[A-Z][a-z]+").expect("valid detection regex"),
        Regex::new(r"(?i)\bDOB\s*:?\s*\d{1,2}[/-]\d{1,2}[/-]\d{4}\b")
            .expect("valid detection regex"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        let total: usize = redaction_passes().iter().map(|p| p.len()).sum();
        assert_eq!(total, 10);
        assert_eq!(DETECTION_ONLY.len(), 2);
    }

    #[test]
    fn passes_are_ordered_name_first_contact_last() {
        let passes = redaction_passes();
        assert_eq!(passes[0][0].kind, PhiKind::Name);
        assert_eq!(passes[1][0].kind, PhiKind::Identifier);
        assert_eq!(passes[2][0].kind, PhiKind::DateOfBirth);
        assert_eq!(passes[3][0].kind, PhiKind::Address);
        assert_eq!(passes[4][0].kind, PhiKind::Contact);
    }

    #[test]
    fn id_label_needs_word_boundary() {
        let id = &ID_RULES[2].regex;
        assert!(id.is_match("ID: A12345"));
        assert!(id.is_match("id 889"));
        assert!(!id.is_match("Idiopathic thrombocytopenia"));
        assert!(!id.is_match("[ID_REDACTED]"));
    }
}
