use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Errors raised while loading lexicon extensions.
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lexicon: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("polarity for {word:?} must lie in [-1, 1], got {value}")]
    OutOfRange { word: String, value: f64 },
}

const NEGATION_FACTOR: f64 = -0.5;

const BUILTIN: &[(&str, f64)] = &[
    ("good", 0.7),
    ("great", 0.8),
    ("nice", 0.6),
    ("happy", 0.8),
    ("glad", 0.5),
    ("joy", 0.8),
    ("joyful", 0.8),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("beautiful", 0.85),
    ("wonderful", 1.0),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("excellent", 1.0),
    ("perfect", 1.0),
    ("best", 1.0),
    ("better", 0.5),
    ("fantastic", 0.4),
    ("brilliant", 0.9),
    ("fun", 0.3),
    ("funny", 0.25),
    ("kind", 0.6),
    ("warm", 0.6),
    ("sweet", 0.35),
    ("calm", 0.3),
    ("peaceful", 0.25),
    ("grateful", 0.6),
    ("thankful", 0.5),
    ("proud", 0.8),
    ("hope", 0.4),
    ("hopeful", 0.5),
    ("free", 0.4),
    ("safe", 0.5),
    ("bright", 0.7),
    ("delightful", 1.0),
    ("pleasant", 0.73),
    ("cheerful", 0.8),
    ("excited", 0.4),
    ("exciting", 0.3),
    ("incredible", 0.9),
    ("magnificent", 1.0),
    ("fine", 0.4),
    ("cool", 0.35),
    ("comfortable", 0.4),
    ("friendly", 0.4),
    ("gentle", 0.5),
    ("successful", 0.75),
    ("special", 0.36),
    ("unforgettable", 0.5),
    ("blessed", 0.6),
    ("smile", 0.5),
    ("laugh", 0.5),
    ("together", 0.2),
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("sad", -0.5),
    ("unhappy", -0.6),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("hate", -0.8),
    ("hated", -0.9),
    ("angry", -0.5),
    ("afraid", -0.6),
    ("scared", -0.5),
    ("fear", -0.6),
    ("lonely", -0.6),
    ("alone", -0.3),
    ("tired", -0.4),
    ("sick", -0.71),
    ("pain", -0.6),
    ("painful", -0.7),
    ("hurt", -0.6),
    ("cry", -0.5),
    ("cried", -0.5),
    ("miss", -0.2),
    ("lost", -0.5),
    ("dead", -0.2),
    ("death", -0.6),
    ("dark", -0.15),
    ("cold", -0.6),
    ("poor", -0.4),
    ("ugly", -0.7),
    ("boring", -1.0),
    ("stupid", -0.8),
    ("wrong", -0.5),
    ("difficult", -0.5),
    ("hard", -0.29),
    ("broken", -0.4),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("miserable", -1.0),
    ("depressed", -0.7),
    ("anxious", -0.5),
    ("worried", -0.5),
    ("upset", -0.6),
    ("annoying", -0.8),
    ("nervous", -0.3),
    ("guilty", -0.5),
    ("empty", -0.1),
    ("heavy", -0.2),
    ("sorry", -0.5),
    ("tragic", -0.75),
    ("cruel", -1.0),
    ("dangerous", -0.6),
    ("nostalgic", -0.1),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("so", 1.3),
    ("too", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("absolutely", 1.5),
    ("truly", 1.3),
    ("quite", 1.1),
    ("pretty", 1.1),
    ("somewhat", 0.7),
    ("slightly", 0.5),
    ("bit", 0.6),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "hardly", "without", "nor"];

#[derive(Deserialize)]
struct LexiconFile {
    #[serde(default)]
    words: HashMap<String, f64>,
}

/// English word-polarity lexicon with simple intensifier and negation rules.
///
/// The score of a text is the mean polarity of the words it contains that
/// appear in the lexicon. A preceding intensifier scales the word and a
/// negation within the two previous tokens flips and halves it.
#[derive(Debug, Clone)]
pub struct Lexicon {
    words: HashMap<String, f64>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::english()
    }
}

impl Lexicon {
    /// Lexicon seeded with the built-in English word list.
    pub fn english() -> Self {
        Self {
            words: BUILTIN
                .iter()
                .map(|(w, p)| ((*w).to_string(), *p))
                .collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    /// Number of scored words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Add or replace a single word.
    pub fn insert(&mut self, word: &str, polarity: f64) -> Result<(), LexiconError> {
        if !(-1.0..=1.0).contains(&polarity) {
            return Err(LexiconError::OutOfRange {
                word: word.to_string(),
                value: polarity,
            });
        }
        self.words.insert(word.to_lowercase(), polarity);
        Ok(())
    }

    /// Merge entries from a TOML document of the form `[words] calm = 0.3`.
    pub fn merge_toml(&mut self, text: &str) -> Result<usize, LexiconError> {
        let file: LexiconFile = toml::from_str(text)?;
        let count = file.words.len();
        for (word, polarity) in file.words {
            self.insert(&word, polarity)?;
        }
        Ok(count)
    }

    /// Merge entries from a TOML file on disk.
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<usize, LexiconError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.merge_toml(&text)
    }

    /// Polarity of `text` in `[-1, 1]`; `0.0` when no word is known.
    pub fn polarity(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut total = 0.0;
        let mut scored = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            let Some(base) = self.words.get(token.as_str()) else {
                continue;
            };
            let mut score = *base;
            if let Some(prev) = i.checked_sub(1).map(|j| tokens[j].as_str()) {
                if let Some(factor) = self.intensifiers.get(prev) {
                    score *= factor;
                }
            }
            let window = &tokens[i.saturating_sub(2)..i];
            if window.iter().any(|t| is_negation(t)) {
                score *= NEGATION_FACTOR;
            }
            total += score.clamp(-1.0, 1.0);
            scored += 1;
        }
        if scored == 0 {
            return 0.0;
        }
        (total / scored as f64).clamp(-1.0, 1.0)
    }
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn unknown_words_are_neutral() {
        let lex = Lexicon::english();
        assert_eq!(lex.polarity(""), 0.0);
        assert_eq!(lex.polarity("the river runs east"), 0.0);
    }

    #[test]
    fn averages_known_words() {
        let lex = Lexicon::english();
        assert!(close(lex.polarity("a good day"), 0.7));
        assert!(close(lex.polarity("good and bad"), 0.0));
    }

    #[test]
    fn intensifier_scales_next_word() {
        let lex = Lexicon::english();
        assert!(close(lex.polarity("very good"), 0.91));
    }

    #[test]
    fn intensified_score_is_capped() {
        let lex = Lexicon::english();
        assert!(close(lex.polarity("extremely wonderful"), 1.0));
    }

    #[test]
    fn negation_flips_and_halves() {
        let lex = Lexicon::english();
        assert!(close(lex.polarity("it was not good"), -0.35));
        assert!(close(lex.polarity("I don't feel happy"), -0.4));
        assert!(close(lex.polarity("I don\u{2019}t feel happy"), -0.4));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let lex = Lexicon::english();
        assert!(close(lex.polarity("GREAT!!!"), 0.8));
    }

    #[test]
    fn merge_adds_and_overrides_words() {
        let mut lex = Lexicon::english();
        let before = lex.len();
        let n = lex
            .merge_toml("[words]\nsaudade = -0.3\ngood = 0.9\n")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(lex.len(), before + 1);
        assert!(close(lex.polarity("saudade"), -0.3));
        assert!(close(lex.polarity("good"), 0.9));
    }

    #[test]
    fn merge_rejects_out_of_range_values() {
        let mut lex = Lexicon::english();
        let err = lex.merge_toml("[words]\nsuper = 2.0\n").unwrap_err();
        assert!(matches!(err, LexiconError::OutOfRange { .. }));
    }

    #[test]
    fn merge_file_reports_missing_path() {
        let mut lex = Lexicon::english();
        let err = lex.merge_file("/no/such/lexicon.toml").unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }
}
