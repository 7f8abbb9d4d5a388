//! Work-journal keyword classification (French and English).
//!
//! Free text is split into sentences and each sentence is given the highest
//! priority category whose keywords it contains.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::shared::sanitize::sanitize_text;

/// Sentence category, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalCategory {
    Safety,
    Issue,
    Accomplishment,
    Objective,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalLine {
    pub category: JournalCategory,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalAnalysis {
    pub lines: Vec<JournalLine>,
    pub safety: Vec<String>,
    pub issues: Vec<String>,
    pub accomplishments: Vec<String>,
    pub objectives: Vec<String>,
    pub notes: Vec<String>,
    /// Every hour amount mentioned, in order
    pub hours_mentioned: Vec<f64>,
    pub total_hours_mentioned: f64,
    pub safety_flag: bool,
}

static SAFETY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:s[ée]curit[ée]|safety|danger\w*|hazard\w*|risques?|risks?|incidents?|accidents?|quasi-accident|near[ -]miss|bless\w*|injur\w*|[ée]pi|ppe|cadenass\w*|lockout|loto|d[ée]versement|spill\w*|fuite|leak\w*|chute|fall\w*|harnais|harness)\b",
    )
    .expect("valid regex")
});

static ISSUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:probl[èe]mes?|problems?|issues?|bris|panne|broken|breakdown|d[ée]fauts?|defects?|d[ée]fectueu\w*|faulty|retards?|delay\w*|manqu\w*|missing|bloqu[ée]e?s?|blocked|erreurs?|errors?|bris[ée]e?s?)\b",
    )
    .expect("valid regex")
});

static ACCOMPLISHMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:termin[ée]e?s?|compl[ée]t[ée]e?s?|completed?|finished|finis?|r[ée]alis[ée]e?s?|install[ée]e?s?|installed|done|livr[ée]e?s?|delivered|r[ée]par[ée]e?s?|repaired|fixed|achev[ée]e?s?)\b",
    )
    .expect("valid regex")
});

static OBJECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:demain|tomorrow|prochaine?s?|next|objectifs?|goals?|pr[ée]vu[e]?s?|pr[ée]voir|planned|planifi[ée]e?s?|[àa] faire|to ?do|semaine prochaine|next week)\b",
    )
    .expect("valid regex")
});

static HOURS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?:[.,]\d+)?)\s*(?:h(\d{2})?|hrs?|hours?|heures?)\b")
        .expect("valid regex")
});

/// Classify one sentence.
pub fn classify(sentence: &str) -> JournalCategory {
    if SAFETY.is_match(sentence) {
        JournalCategory::Safety
    } else if ISSUE.is_match(sentence) {
        JournalCategory::Issue
    } else if ACCOMPLISHMENT.is_match(sentence) {
        JournalCategory::Accomplishment
    } else if OBJECTIVE.is_match(sentence) {
        JournalCategory::Objective
    } else {
        JournalCategory::Note
    }
}

/// Split on `!`, `?`, newlines, and periods that are not decimal separators.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let boundary = match c {
            '!' | '?' | '\n' => true,
            '.' => {
                let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                !(prev_digit && next_digit)
            }
            _ => false,
        };
        if boundary {
            push_sentence(&mut sentences, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

/// Hour amounts mentioned in the text (`7.5h`, `8 heures`, `3 hrs`, `7h30`).
pub fn extract_hours(text: &str) -> Vec<f64> {
    HOURS
        .captures_iter(text)
        .filter_map(|caps| {
            let whole: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
            let minutes = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|m| *m < 60.0)
                .unwrap_or(0.0);
            Some(whole + minutes / 60.0)
        })
        .collect()
}

/// Sanitize, split and classify a journal entry.
pub fn process(text: &str) -> JournalAnalysis {
    let clean = sanitize_text(text);
    let mut analysis = JournalAnalysis::default();

    for sentence in split_sentences(&clean) {
        analysis.hours_mentioned.extend(extract_hours(&sentence));
        let category = classify(&sentence);
        let bucket = match category {
            JournalCategory::Safety => &mut analysis.safety,
            JournalCategory::Issue => &mut analysis.issues,
            JournalCategory::Accomplishment => &mut analysis.accomplishments,
            JournalCategory::Objective => &mut analysis.objectives,
            JournalCategory::Note => &mut analysis.notes,
        };
        bucket.push(sentence.clone());
        analysis.lines.push(JournalLine {
            category,
            text: sentence,
        });
    }

    let total: f64 = analysis.hours_mentioned.iter().sum();
    analysis.total_hours_mentioned = (total * 100.0).round() / 100.0;
    analysis.safety_flag = !analysis.safety.is_empty();
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("Fuite d'huile sur la pompe P-3", JournalCategory::Safety ; "fr safety")]
    #[test_case("Near miss with the forklift", JournalCategory::Safety ; "en safety")]
    #[test_case("Panne du compresseur ce matin", JournalCategory::Issue ; "fr issue")]
    #[test_case("Delivery delayed by two days", JournalCategory::Issue ; "en issue")]
    #[test_case("Câblage du panneau terminé", JournalCategory::Accomplishment ; "fr done")]
    #[test_case("Installed the new valve", JournalCategory::Accomplishment ; "en done")]
    #[test_case("Demain on coule la dalle", JournalCategory::Objective ; "fr plan")]
    #[test_case("Weather was sunny", JournalCategory::Note ; "note")]
    fn test_classify(sentence: &str, expected: JournalCategory) {
        assert_eq!(classify(sentence), expected);
    }

    #[test]
    fn test_safety_outranks_other_categories() {
        assert_eq!(
            classify("Problème de harnais réparé"),
            JournalCategory::Safety
        );
        assert_eq!(classify("Broken pump repaired"), JournalCategory::Issue);
    }

    #[test]
    fn test_split_keeps_decimals() {
        assert_eq!(
            split_sentences("Worked 7.5h on site. All good!\nNext: roof"),
            vec!["Worked 7.5h on site", "All good", "Next: roof"]
        );
    }

    #[test_case("7.5h", vec![7.5] ; "decimal")]
    #[test_case("8 heures puis 2 hrs", vec![8.0, 2.0] ; "mixed")]
    #[test_case("3,5 heures", vec![3.5] ; "comma")]
    #[test_case("de 7h30", vec![7.5] ; "clock style")]
    #[test_case("room 12 has 3 doors", vec![] ; "no hours")]
    fn test_extract_hours(text: &str, expected: Vec<f64>) {
        assert_eq!(extract_hours(text), expected);
    }

    #[test]
    fn test_process_full_entry() {
        let text = "Installation des conduits terminée en 6h. \
                    <script>alert(1)</script>Bris de la scie. \
                    Incident: chute d'outil sans blessure. \
                    Demain: finition.";
        let analysis = process(text);

        assert!(analysis.safety_flag);
        assert_eq!(analysis.safety.len(), 1);
        assert_eq!(analysis.issues, vec!["Bris de la scie"]);
        assert_eq!(analysis.accomplishments.len(), 1);
        assert_eq!(analysis.objectives, vec!["Demain: finition"]);
        assert_eq!(analysis.hours_mentioned, vec![6.0]);
        assert_eq!(analysis.total_hours_mentioned, 6.0);
        assert!(analysis.lines.iter().all(|l| !l.text.contains("alert")));
    }

    #[test]
    fn test_empty_text() {
        let analysis = process("   ");
        assert!(analysis.lines.is_empty());
        assert!(!analysis.safety_flag);
    }
}
