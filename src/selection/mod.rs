//! Difficulty-aware case selection.
//!
//! Scenario ids encode their difficulty in a suffix (`-simple`, `-medium`,
//! `-complex`/`-hard`). A ten-case run is drawn with a fixed 7/2/1 mix so it
//! resembles the full suite; every other size is sampled uniformly.

use std::collections::HashSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Run size that gets the stratified mix.
pub const MIXED_RUN_SIZE: usize = 10;

/// Per-bucket targets for a [`MIXED_RUN_SIZE`] run.
const MIX_TARGETS: [(DifficultyBucket, usize); 3] = [
    (DifficultyBucket::Simple, 7),
    (DifficultyBucket::Medium, 2),
    (DifficultyBucket::Hard, 1),
];

/// Difficulty inferred from a case id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyBucket {
    Simple,
    Medium,
    Hard,
    Unknown,
}

impl DifficultyBucket {
    /// Classifies a case id.
    ///
    /// `basic-shapes-test-1-simple` is simple, `pptc-test-37c-medium` is
    /// medium, and `pptc-test-10d-complex` is hard. Matching ignores case.
    pub fn of(case_id: &str) -> Self {
        let lower = case_id.to_lowercase();
        if lower.ends_with("-simple") {
            DifficultyBucket::Simple
        } else if lower.ends_with("-medium") {
            DifficultyBucket::Medium
        } else if lower.ends_with("-complex") || lower.ends_with("-hard") {
            DifficultyBucket::Hard
        } else {
            DifficultyBucket::Unknown
        }
    }
}

impl fmt::Display for DifficultyBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyBucket::Simple => write!(f, "simple"),
            DifficultyBucket::Medium => write!(f, "medium"),
            DifficultyBucket::Hard => write!(f, "hard"),
            DifficultyBucket::Unknown => write!(f, "unknown"),
        }
    }
}

/// How many selected cases fall in each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyCounts {
    pub simple: usize,
    pub medium: usize,
    pub hard: usize,
    pub unknown: usize,
}

impl DifficultyCounts {
    pub fn tally<S: AsRef<str>>(case_ids: &[S]) -> Self {
        let mut counts = Self::default();
        for id in case_ids {
            match DifficultyBucket::of(id.as_ref()) {
                DifficultyBucket::Simple => counts.simple += 1,
                DifficultyBucket::Medium => counts.medium += 1,
                DifficultyBucket::Hard => counts.hard += 1,
                DifficultyBucket::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}

/// Picks the cases for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct CaseSelector {
    /// Random seed for reproducibility (None = non-deterministic).
    seed: Option<u64>,
}

impl CaseSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Selects `min(count, ids.len())` distinct ids from `ids`.
    ///
    /// Duplicate input ids count once. Only a run of exactly
    /// [`MIXED_RUN_SIZE`] is stratified; buckets that come up short are
    /// backfilled uniformly from whatever has not been picked yet.
    pub fn select(&self, ids: &[String], count: usize) -> Vec<String> {
        let pool = dedup(ids);
        if pool.is_empty() || count == 0 {
            return Vec::new();
        }

        let k = count.min(pool.len());
        let mut rng = self.create_rng();

        if k != MIXED_RUN_SIZE {
            return uniform_sample(&pool, k, &mut rng);
        }

        let mut chosen: Vec<String> = Vec::with_capacity(k);
        for (bucket, target) in MIX_TARGETS {
            let members: Vec<String> = pool
                .iter()
                .filter(|id| DifficultyBucket::of(id) == bucket)
                .cloned()
                .collect();
            chosen.extend(uniform_sample(&members, target.min(members.len()), &mut rng));
        }

        // Backfill short buckets (or a pool heavy in unknown ids).
        if chosen.len() < k {
            let taken: HashSet<&str> = chosen.iter().map(String::as_str).collect();
            let remaining: Vec<String> = pool
                .iter()
                .filter(|id| !taken.contains(id.as_str()))
                .cloned()
                .collect();
            let needed = (k - chosen.len()).min(remaining.len());
            let backfill = uniform_sample(&remaining, needed, &mut rng);
            chosen.extend(backfill);
        }

        chosen.truncate(k);
        chosen
    }

    fn create_rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

/// Uniform sample without replacement.
fn uniform_sample(items: &[String], n: usize, rng: &mut ChaCha8Rng) -> Vec<String> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(n);
    shuffled
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
