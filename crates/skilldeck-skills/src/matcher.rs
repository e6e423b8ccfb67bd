//! Keyword scoring of a free-text query against skill metadata.

use crate::error::SkillError;
use crate::types::SkillMetadata;

/// Scoring constants for [`find_best_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWeights {
    /// Added for every query word found in the skill name.
    pub name_weight: u32,
    /// Added for every long-enough query word found in the description.
    pub description_weight: u32,
    /// Minimum word length (in chars) for description matches.
    pub description_min_word_len: usize,
    /// Best scores below this are not reported.
    pub min_score: u32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name_weight: 3,
            description_weight: 1,
            description_min_word_len: 3,
            min_score: 2,
        }
    }
}

impl MatchWeights {
    /// # Errors
    ///
    /// Returns [`SkillError::Config`] when every match would score zero.
    pub fn validate(&self) -> Result<(), SkillError> {
        if self.name_weight == 0 && self.description_weight == 0 {
            return Err(SkillError::Config(
                "name_weight and description_weight cannot both be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Score one skill against already lower-cased query words.
#[must_use]
pub fn score(words: &[&str], meta: &SkillMetadata, weights: &MatchWeights) -> u32 {
    let name = meta.name.to_lowercase();
    let description = meta.description.to_lowercase();

    let mut total = 0;
    for word in words {
        if name.contains(word) {
            total += weights.name_weight;
        }
        if word.chars().count() >= weights.description_min_word_len && description.contains(word)
        {
            total += weights.description_weight;
        }
    }
    total
}

/// Best-scoring skill for `query`. Ties keep the first entry seen; scores below
/// `weights.min_score` yield `None`.
#[must_use]
pub fn find_best_match<'a>(
    skills: &'a [SkillMetadata],
    query: &str,
    weights: &MatchWeights,
) -> Option<&'a SkillMetadata> {
    let query = query.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let mut best: Option<(&SkillMetadata, u32)> = None;
    for meta in skills {
        let s = score(&words, meta, weights);
        if s > best.map_or(0, |(_, b)| b) {
            best = Some((meta, s));
        }
    }

    best.filter(|&(_, s)| s >= weights.min_score)
        .map(|(meta, _)| meta)
}
