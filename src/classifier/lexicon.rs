//! Cue-counting classifier backend
//!
//! Encodes text at character level and scores each label by the number of
//! country cues found in the (truncated) input: country names, legal footers,
//! currency codes, tax-id types and phone prefixes. It needs no model
//! artifacts, which makes it the default backend and a stand-in when no
//! trained model is deployed.

use super::backend::{ClassifierError, InferenceBackend, ModelInput};
use super::labels::LabelMapping;
use regex::Regex;
use tracing::warn;

/// Lower-case cues per country label
const COUNTRY_CUES: &[(&str, &[&str])] = &[
    ("India", &["india", "indian jurisdiction", "inr", "gstin", "+91"]),
    (
        "China",
        &["china", "中华人民共和国", "增值税", "cny", "unified social credit code", "+86"],
    ),
    ("United States", &["united states", "u.s. law", "usd", "+1"]),
    ("Germany", &["germany", "deutschem recht", "ust-idnr", "+49"]),
    ("France", &["france", "droit français", "tva", "+33"]),
    ("United Kingdom", &["united kingdom", "uk law", "gbp", "+44"]),
    ("Italy", &["italy", "legge italiana", "partita iva", "+39"]),
    ("Spain", &["spain", "ley española", "cif", "+34"]),
    ("Netherlands", &["netherlands", "nederlands recht", "btw", "+31"]),
    ("Poland", &["poland", "prawem polskim", "pln", "nip", "+48"]),
    ("Czech Republic", &["czech republic", "českého práva", "czk", "dič", "+420"]),
    ("Brazil", &["brazil", "legislação brasileira", "brl", "cnpj", "+55"]),
    ("Mexico", &["mexico", "ley mexicana", "mxn", "rfc", "+52"]),
    ("Canada", &["canada", "canadian law", "cad"]),
    ("Japan", &["japan", "日本国法", "jpy", "corporate number", "+81"]),
    (
        "South Korea",
        &["south korea", "대한민국", "krw", "business registration number", "+82"],
    ),
    ("Vietnam", &["vietnam", "pháp luật việt nam", "vnd", "mst", "+84"]),
    ("Thailand", &["thailand", "กฎหมายไทย", "thb", "+66"]),
    ("Indonesia", &["indonesia", "hukum indonesia", "idr", "npwp", "+62"]),
    ("Australia", &["australia", "australian law", "aud", "abn", "+61"]),
    (
        "United Arab Emirates",
        &["united arab emirates", "uae law", "aed", "trn", "+971"],
    ),
    (
        "Saudi Arabia",
        &["saudi arabia", "المملكة العربية السعودية", "sar", "vat registration number", "+966"],
    ),
];

/// Score added per cue occurrence
const CUE_WEIGHT: f32 = 1.0;

/// Character-level cue counting backend
pub struct LexiconBackend {
    /// Compiled cue patterns per logit slot; empty for unmapped slots
    slots: Vec<Vec<Regex>>,
}

impl LexiconBackend {
    /// Build cue patterns aligned with the label mapping's index space
    pub fn new(labels: &LabelMapping) -> Self {
        let mut slots: Vec<Vec<Regex>> = vec![Vec::new(); labels.index_space()];

        for (index, label) in labels.iter() {
            match COUNTRY_CUES.iter().find(|(country, _)| *country == label) {
                Some((_, cues)) => {
                    slots[index] = cues.iter().filter_map(|cue| cue_pattern(cue)).collect();
                }
                None => warn!(label, "No lexicon cues for label; it can only win ties"),
            }
        }

        Self { slots }
    }
}

/// Compile a cue into a regex, anchoring word boundaries on alphanumeric ends
fn cue_pattern(cue: &str) -> Option<Regex> {
    let starts_alnum = cue.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_alnum = cue.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    let pattern = format!(
        "{}{}{}",
        if starts_alnum { r"\b" } else { "" },
        regex::escape(cue),
        if ends_alnum { r"\b" } else { "" }
    );
    Regex::new(&pattern).ok()
}

impl InferenceBackend for LexiconBackend {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn num_classes(&self) -> usize {
        self.slots.len()
    }

    fn encode(&self, text: &str) -> Result<Vec<i64>, ClassifierError> {
        Ok(text.chars().map(|c| c as i64).collect())
    }

    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        let text: String = input
            .active_ids()
            .map(|id| {
                u32::try_from(id)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ClassifierError::Tokenization(format!("invalid char id {id}")))
            })
            .collect::<Result<String, _>>()?
            .to_lowercase();

        Ok(self
            .slots
            .iter()
            .map(|patterns| {
                let hits: usize = patterns.iter().map(|p| p.find_iter(&text).count()).sum();
                hits as f32 * CUE_WEIGHT
            })
            .collect())
    }
}
