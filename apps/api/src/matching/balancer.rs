//! Source Balancer — keeps one scraped portal from filling the whole shortlist.

use tracing::info;

use crate::matching::hard_gate::by_score_then_id;
use crate::models::{Exclusion, MatchStage, MatchedCandidate};

#[derive(Debug, Clone, Default)]
pub struct BalanceOutcome {
    /// Descending by combined score.
    pub selected: Vec<MatchedCandidate>,
    pub dropped: Vec<Exclusion>,
}

/// Index of the first declared source contained (case-insensitively) in `source`.
pub fn source_bucket(source: &str, declared: &[String]) -> Option<usize> {
    let source = source.to_lowercase();
    declared
        .iter()
        .position(|d| !d.trim().is_empty() && source.contains(&d.trim().to_lowercase()))
}

/// Redistributes `matched` across the declared `sources` under a `max_results` budget.
///
/// Each of the `k` non-empty buckets gets `max(1, max_results / k)` slots, and the
/// first `max_results % k` buckets (in declared order) one more. If small buckets
/// leave slots unused, they are refilled by score, first from buckets still under
/// `ceil(max_results / k) + 1`, then from anything left (including undeclared sources),
/// so the result always holds exactly `max_results` candidates when that many matched.
pub fn balance(
    mut matched: Vec<MatchedCandidate>,
    max_results: usize,
    sources: &[String],
) -> BalanceOutcome {
    info!(
        "Balancing {} candidates across sources {:?} (max {})",
        matched.len(),
        sources,
        max_results
    );

    if max_results >= matched.len() {
        matched.sort_by(by_score_then_id);
        return BalanceOutcome {
            selected: matched,
            dropped: Vec::new(),
        };
    }

    let mut buckets: Vec<Vec<MatchedCandidate>> = vec![Vec::new(); sources.len()];
    let mut undeclared = Vec::new();
    for candidate in matched {
        match source_bucket(&candidate.candidate.source, sources) {
            Some(idx) => buckets[idx].push(candidate),
            None => undeclared.push(candidate),
        }
    }
    for (source, bucket) in sources.iter().zip(&buckets) {
        info!("  {}: {} candidates", source, bucket.len());
    }

    let available: Vec<usize> = (0..buckets.len()).filter(|i| !buckets[*i].is_empty()).collect();
    if available.is_empty() {
        undeclared.sort_by(by_score_then_id);
        let dropped = undeclared.split_off(max_results.min(undeclared.len()));
        return BalanceOutcome {
            selected: undeclared,
            dropped: drop_all(dropped, "outside the result budget"),
        };
    }

    let k = available.len();
    let per_source = (max_results / k).max(1);
    let remainder = max_results % k;
    let cap = max_results.div_ceil(k) + 1;
    info!("Taking {} from each source (+{} extra)", per_source, remainder);

    let mut selected = Vec::with_capacity(max_results);
    let mut counts = vec![0usize; buckets.len()];
    let mut leftovers: Vec<(usize, MatchedCandidate)> = Vec::new();

    for (i, &idx) in available.iter().enumerate() {
        let take = per_source + usize::from(i < remainder);
        let mut bucket = std::mem::take(&mut buckets[idx]);
        bucket.sort_by(by_score_then_id);
        let rest = bucket.split_off(take.min(bucket.len()));
        counts[idx] = bucket.len();
        selected.extend(bucket);
        leftovers.extend(rest.into_iter().map(|c| (idx, c)));
    }

    // More buckets than slots: the per-source minimum of one overshoots.
    let mut dropped = Vec::new();
    selected.sort_by(by_score_then_id);
    if selected.len() > max_results {
        dropped.extend(drop_all(selected.split_off(max_results), "source quota exceeded the result budget"));
    }

    if selected.len() < max_results {
        leftovers.sort_by(|a, b| by_score_then_id(&a.1, &b.1));
        let mut spill = Vec::new();
        for (idx, candidate) in leftovers {
            if selected.len() < max_results && counts[idx] < cap {
                counts[idx] += 1;
                selected.push(candidate);
            } else {
                spill.push(candidate);
            }
        }
        spill.extend(undeclared);
        spill.sort_by(by_score_then_id);
        let missing = max_results - selected.len().min(max_results);
        let rest = spill.split_off(missing.min(spill.len()));
        selected.extend(spill);
        dropped.extend(drop_all(rest, "source quota reached"));
    } else {
        let rest = leftovers.into_iter().map(|(_, c)| c).chain(undeclared).collect();
        dropped.extend(drop_all(rest, "source quota reached"));
    }

    selected.sort_by(by_score_then_id);
    selected.truncate(max_results);

    let distribution: Vec<(String, usize)> = sources
        .iter()
        .map(|s| {
            let n = selected
                .iter()
                .filter(|c| source_bucket(&c.candidate.source, sources).map(|i| &sources[i]) == Some(s))
                .count();
            (s.clone(), n)
        })
        .collect();
    info!("Final balanced distribution: {:?}", distribution);

    BalanceOutcome { selected, dropped }
}

fn drop_all(candidates: Vec<MatchedCandidate>, reason: &str) -> Vec<Exclusion> {
    candidates
        .into_iter()
        .map(|c| Exclusion::new(c.candidate.id, MatchStage::Balance, reason))
        .collect()
}
