use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

const KJ_PER_KCAL: f64 = 4.184;

/// OCR vocabulary for energy units. Tokens are matched case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelPatterns {
    pub kcal_tokens: Vec<String>,
    pub kj_tokens: Vec<String>,
}

impl Default for LabelPatterns {
    fn default() -> Self {
        Self {
            // "wcal" and "kcl" are common misreads of "kcal"
            kcal_tokens: ["kcal", "cal", "wcal", "kcl"].map(String::from).to_vec(),
            kj_tokens: ["kj", "ki"].map(String::from).to_vec(),
        }
    }
}

/// Extracts a calorie value from raw nutrition-label text.
#[derive(Debug, Clone)]
pub struct LabelParser {
    paired: Regex,
    kcal: Option<Regex>,
    kj: Option<Regex>,
}

lazy_static! {
    static ref DEFAULT_PARSER: LabelParser =
        LabelParser::new(&LabelPatterns::default()).expect("built-in label patterns compile");
}

impl Default for LabelParser {
    fn default() -> Self {
        DEFAULT_PARSER.clone()
    }
}

impl LabelParser {
    pub fn new(patterns: &LabelPatterns) -> Result<Self, regex::Error> {
        Ok(Self {
            // "2190 / 524", "2190kJ|524"
            paired: Regex::new(r"(\d{3,4})\s*[a-zA-Z]*\s*[/|]\s*(\d{2,3})")?,
            kcal: unit_regex(&patterns.kcal_tokens)?,
            kj: unit_regex(&patterns.kj_tokens)?,
        })
    }

    /// Returns the energy in kcal, or `None` when no strategy is confident.
    pub fn parse(&self, text: &str) -> Option<i32> {
        self.paired_pair(text)
            .or_else(|| self.explicit_kcal(text))
            .or_else(|| self.explicit_kj(text))
    }

    fn paired_pair(&self, text: &str) -> Option<i32> {
        let caps = self.paired.captures(text)?;
        let first: i32 = caps[1].parse().ok()?;
        let second: i32 = caps[2].parse().ok()?;
        // the larger number is the kJ figure, roughly 4.2x the kcal one
        (first > second && first < second * 5).then_some(second)
    }

    fn explicit_kcal(&self, text: &str) -> Option<i32> {
        let value = first_number(&self.kcal, text)?;
        plausible(value.round())
    }

    fn explicit_kj(&self, text: &str) -> Option<i32> {
        let kj = first_number(&self.kj, text)?;
        plausible((kj / KJ_PER_KCAL).round())
    }
}

fn unit_regex(tokens: &[String]) -> Result<Option<Regex>, regex::Error> {
    let mut tokens: Vec<&str> = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    // longest first so "kcal" wins over "cal"
    tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"(\d+(?:[.,]\d+)?)\s*(?:{alternation})"))
        .case_insensitive(true)
        .build()
        .map(Some)
}

fn first_number(re: &Option<Regex>, text: &str) -> Option<f64> {
    let caps = re.as_ref()?.captures(text)?;
    caps[1].replace(',', ".").parse().ok()
}

fn plausible(kcal: f64) -> Option<i32> {
    (kcal >= 1.0 && kcal <= f64::from(i32::MAX)).then(|| kcal as i32)
}

/// Parses with the built-in vocabulary.
pub fn parse_label_calories(text: &str) -> Option<i32> {
    DEFAULT_PARSER.parse(text)
}
