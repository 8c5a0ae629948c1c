use crate::core::error::{GenerationError, Result};
use crate::core::model::StoryRecord;
use crate::utils::text::{char_bigrams, jaccard, normalize_for_similarity};
use log::debug;
use std::collections::HashSet;

pub const DEFAULT_THRESHOLD: f64 = 0.78;
pub const DEFAULT_MIN_SIGNATURE_LEN: usize = 24;

/// Rejects batches where two stories are near copies of each other.
#[derive(Debug, Clone)]
pub struct SimilarityGuard {
    threshold: f64,
    min_signature_len: usize,
}

impl Default for SimilarityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_MIN_SIGNATURE_LEN)
    }
}

impl SimilarityGuard {
    pub fn new(threshold: f64, min_signature_len: usize) -> Self {
        Self {
            threshold,
            min_signature_len,
        }
    }

    /// Normalized text that identifies a story: the headline fields plus the
    /// opening and closing lines.
    pub fn signature(story: &StoryRecord) -> String {
        let first = story.dialog.first().map(String::as_str).unwrap_or_default();
        let last = story.dialog.last().map(String::as_str).unwrap_or_default();
        let joined = [
            story.title.as_str(),
            story.desc.as_str(),
            story.kick.as_str(),
            story.summary.as_str(),
            first,
            last,
        ]
        .join(" ");
        normalize_for_similarity(&joined)
    }

    pub fn similarity(a: &StoryRecord, b: &StoryRecord) -> f64 {
        jaccard(
            &char_bigrams(&Self::signature(a)),
            &char_bigrams(&Self::signature(b)),
        )
    }

    /// Fails on the first pair at or above the threshold.
    pub fn check(&self, stories: &[StoryRecord]) -> Result<()> {
        let prepared: Vec<Option<HashSet<(char, char)>>> = stories
            .iter()
            .map(|story| {
                let signature = Self::signature(story);
                (signature.chars().count() >= self.min_signature_len)
                    .then(|| char_bigrams(&signature))
            })
            .collect();

        for (i, left) in prepared.iter().enumerate() {
            let Some(left) = left else { continue };
            for (j, right) in prepared.iter().enumerate().skip(i + 1) {
                let Some(right) = right else { continue };
                let similarity = jaccard(left, right);
                if similarity >= self.threshold {
                    debug!("Stories {} and {} overlap at {:.3}", i, j, similarity);
                    return Err(GenerationError::DuplicateDetected {
                        first: i,
                        second: j,
                        similarity,
                    });
                }
            }
        }
        Ok(())
    }
}
