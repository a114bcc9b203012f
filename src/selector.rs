//! Weighted least-played track selection.
//!
//! Every candidate gets a weight of `1 / (1 + play_count)`, scaled down for
//! recently played tracks and optionally scaled for favourites; the next
//! track is a random draw proportional to those weights. Under-played tracks
//! win most of the time without playback becoming predictable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::distr::{Distribution, Uniform};

use crate::config::SelectionSettings;
use crate::library::{LibraryIndex, Track};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selector {
    favourite_weight: f64,
    recency_bias: f64,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(&SelectionSettings::default())
    }
}

impl Selector {
    pub fn new(settings: &SelectionSettings) -> Self {
        let favourite_weight = if settings.favourite_weight.is_finite() {
            settings.favourite_weight.max(0.0)
        } else {
            1.0
        };
        Self {
            favourite_weight,
            recency_bias: settings.recency_bias.clamp(0.0, 1.0),
        }
    }

    /// Pick the next track, or `None` when no track is playable.
    ///
    /// Tracks in `unplayable` are never picked. `exclude` (usually the track
    /// that just played) is skipped unless it is the only playable track, so
    /// a single-track library keeps playing.
    pub fn next<R: Rng + ?Sized>(
        &self,
        index: &LibraryIndex,
        exclude: Option<&Path>,
        unplayable: &HashSet<PathBuf>,
        rng: &mut R,
    ) -> Option<Track> {
        let mut candidates: Vec<&Track> = index
            .tracks()
            .filter(|t| !unplayable.contains(&t.path))
            .collect();
        if candidates.len() > 1 {
            candidates.retain(|t| Some(t.path.as_path()) != exclude);
        }

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0].clone()),
            _ => {
                let weights = self.weights(&candidates);
                Some(candidates[draw(&weights, rng)].clone())
            }
        }
    }

    /// Selection weights for `candidates`, in the same order.
    pub fn weights(&self, candidates: &[&Track]) -> Vec<f64> {
        let recency = self.recency_factors(candidates);
        candidates
            .iter()
            .zip(recency)
            .map(|(t, r)| {
                let base = 1.0 / (1.0 + t.play_count as f64);
                let fav = if t.favourite { self.favourite_weight } else { 1.0 };
                base * r * fav
            })
            .collect()
    }

    /// Never-played tracks get 1.0. Played tracks are ranked oldest first and
    /// scaled down linearly so the most recent one gets `1 - recency_bias`.
    fn recency_factors(&self, candidates: &[&Track]) -> Vec<f64> {
        let mut played: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].last_played.is_some())
            .collect();
        played.sort_by_key(|&i| candidates[i].last_played);

        let mut factors = vec![1.0; candidates.len()];
        let n = played.len() as f64;
        for (rank, &i) in played.iter().enumerate() {
            factors[i] = 1.0 - self.recency_bias * (rank as f64 + 1.0) / n;
        }
        factors
    }
}

/// Index drawn with probability proportional to `weights`. Falls back to a
/// uniform draw when the weights carry no usable mass.
fn draw<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(_) => Uniform::new(0, weights.len()).map_or(0, |u| u.sample(rng)),
    }
}
