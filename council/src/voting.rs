//! Borda-count aggregation of reviewer rankings.
//!
//! Each reviewer contributes one ranked ballot plus per-answer scores. A rank
//! position awards `n - 1 - position` points where `n` is that ballot's
//! length, so a first place on a 4-answer ballot is worth 3 points. Ties on
//! total points fall back to mean overall score, then mean correctness score,
//! then ascending label order so the final ranking is deterministic.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::run::{Review, VoteBreakdown};

/// Version tag stored with every aggregation, bumped on algorithm changes.
pub const METHOD_VERSION: &str = "borda_v1";

/// Final ranking plus the per-label tallies behind it.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub final_ranking: Vec<String>,
    pub breakdown: VoteBreakdown,
}

/// Aggregate reviewer ballots over the candidate label universe.
///
/// `labels` defines the universe: every label gets a zero-initialized entry
/// in the breakdown, and ballot entries outside the universe are ignored.
/// Reviews with an empty `rank_order` contribute nothing; the run
/// orchestrator discards those before aggregation, so the check here only
/// guards direct callers.
pub fn aggregate_votes(reviews: &[Review], labels: &[String]) -> AggregationOutcome {
    let mut borda_totals: BTreeMap<String, i64> = BTreeMap::new();
    let mut first_place_votes: BTreeMap<String, i64> = BTreeMap::new();
    let mut score_sums: BTreeMap<String, f64> = BTreeMap::new();
    let mut score_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut correctness_sums: BTreeMap<String, f64> = BTreeMap::new();

    for label in labels {
        borda_totals.insert(label.clone(), 0);
        first_place_votes.insert(label.clone(), 0);
        score_sums.insert(label.clone(), 0.0);
        score_counts.insert(label.clone(), 0);
        correctness_sums.insert(label.clone(), 0.0);
    }

    for review in reviews {
        if review.rank_order.is_empty() {
            continue;
        }

        // Points come from the ballot's own length, so unknown entries still
        // shift the positions below them.
        let n = review.rank_order.len() as i64;
        for (position, label) in review.rank_order.iter().enumerate() {
            if let Some(total) = borda_totals.get_mut(label) {
                *total += n - 1 - position as i64;
            }
        }

        if let Some(votes) = first_place_votes.get_mut(&review.rank_order[0]) {
            *votes += 1;
        }

        for parsed in &review.reviews {
            if !borda_totals.contains_key(&parsed.label) {
                continue;
            }
            *score_sums.entry(parsed.label.clone()).or_insert(0.0) += parsed.scores.overall;
            *score_counts.entry(parsed.label.clone()).or_insert(0) += 1;
            *correctness_sums.entry(parsed.label.clone()).or_insert(0.0) +=
                parsed.scores.correctness;
        }
    }

    let average = |sums: &BTreeMap<String, f64>, label: &str| -> f64 {
        let count = score_counts.get(label).copied().unwrap_or(0);
        if count == 0 {
            0.0
        } else {
            sums.get(label).copied().unwrap_or(0.0) / f64::from(count)
        }
    };

    let score_averages: BTreeMap<String, f64> = labels
        .iter()
        .map(|label| (label.clone(), average(&score_sums, label)))
        .collect();
    let correctness_averages: BTreeMap<String, f64> = labels
        .iter()
        .map(|label| (label.clone(), average(&correctness_sums, label)))
        .collect();

    let mut final_ranking: Vec<String> = labels.to_vec();
    final_ranking.sort_by(|a, b| {
        let borda_a = borda_totals.get(a).copied().unwrap_or(0);
        let borda_b = borda_totals.get(b).copied().unwrap_or(0);
        borda_b
            .cmp(&borda_a)
            .then_with(|| {
                let score_a = score_averages.get(a).copied().unwrap_or(0.0);
                let score_b = score_averages.get(b).copied().unwrap_or(0.0);
                score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                let corr_a = correctness_averages.get(a).copied().unwrap_or(0.0);
                let corr_b = correctness_averages.get(b).copied().unwrap_or(0.0);
                corr_b.partial_cmp(&corr_a).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.cmp(b))
    });

    AggregationOutcome {
        final_ranking,
        breakdown: VoteBreakdown {
            borda_totals,
            first_place_votes,
            score_averages,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{ParsedReview, ReviewScores};
    use uuid::Uuid;

    fn review(rank_order: &[&str], overalls: &[(&str, f64)]) -> Review {
        review_with_correctness(
            rank_order,
            &overalls
                .iter()
                .map(|(label, overall)| (*label, *overall, *overall))
                .collect::<Vec<_>>(),
        )
    }

    fn review_with_correctness(rank_order: &[&str], scores: &[(&str, f64, f64)]) -> Review {
        Review {
            id: Uuid::new_v4().to_string(),
            run_id: "run-1".to_string(),
            reviewer_model: "judge".to_string(),
            reviewer_provider: "stub".to_string(),
            reviews: scores
                .iter()
                .map(|(label, overall, correctness)| ParsedReview {
                    label: label.to_string(),
                    scores: ReviewScores {
                        overall: *overall,
                        correctness: *correctness,
                        ..Default::default()
                    },
                    critique: String::new(),
                })
                .collect(),
            rank_order: rank_order.iter().map(|s| s.to_string()).collect(),
            confidence: 0.8,
            raw_response: None,
        }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_borda_points_from_rank_positions() {
        let universe = labels(&["A", "B", "C"]);
        let reviews = vec![
            review(&["A", "B", "C"], &[("A", 9.0), ("B", 7.0), ("C", 5.0)]),
            review(&["B", "A", "C"], &[("A", 8.0), ("B", 9.0), ("C", 6.0)]),
        ];

        let outcome = aggregate_votes(&reviews, &universe);

        assert_eq!(outcome.breakdown.borda_totals["A"], 3);
        assert_eq!(outcome.breakdown.borda_totals["B"], 3);
        assert_eq!(outcome.breakdown.borda_totals["C"], 0);
        assert_eq!(outcome.breakdown.first_place_votes["A"], 1);
        assert_eq!(outcome.breakdown.first_place_votes["B"], 1);
        assert_eq!(outcome.breakdown.first_place_votes["C"], 0);

        // Borda tie between A and B resolved by mean overall (8.5 vs 8.0).
        assert_eq!(outcome.final_ranking, labels(&["A", "B", "C"]));
        assert!((outcome.breakdown.score_averages["A"] - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_correctness_breaks_score_tie() {
        let universe = labels(&["A", "B"]);
        let reviews = vec![
            review_with_correctness(&["A", "B"], &[("A", 8.0, 6.0), ("B", 8.0, 9.0)]),
            review_with_correctness(&["B", "A"], &[("A", 8.0, 6.0), ("B", 8.0, 9.0)]),
        ];

        let outcome = aggregate_votes(&reviews, &universe);

        // Equal points, equal overall averages; correctness favors B.
        assert_eq!(outcome.final_ranking, labels(&["B", "A"]));
    }

    #[test]
    fn test_full_tie_falls_back_to_label_order() {
        let universe = labels(&["C", "A", "B"]);
        let reviews = vec![
            review(&["A", "B", "C"], &[("A", 7.0), ("B", 7.0), ("C", 7.0)]),
            review(&["B", "C", "A"], &[("A", 7.0), ("B", 7.0), ("C", 7.0)]),
            review(&["C", "A", "B"], &[("A", 7.0), ("B", 7.0), ("C", 7.0)]),
        ];

        let outcome = aggregate_votes(&reviews, &universe);

        assert_eq!(outcome.final_ranking, labels(&["A", "B", "C"]));
    }

    #[test]
    fn test_unknown_ballot_entries_ignored() {
        let universe = labels(&["A", "B"]);
        let reviews = vec![review(&["Q", "A", "B"], &[("A", 8.0), ("Q", 9.0)])];

        let outcome = aggregate_votes(&reviews, &universe);

        // Ballot length counts the stray entry, positions shift accordingly.
        assert_eq!(outcome.breakdown.borda_totals["A"], 1);
        assert_eq!(outcome.breakdown.borda_totals["B"], 0);
        assert!(!outcome.breakdown.borda_totals.contains_key("Q"));
        // Stray first place credits nobody.
        assert_eq!(outcome.breakdown.first_place_votes["A"], 0);
        assert_eq!(outcome.breakdown.first_place_votes["B"], 0);
    }

    #[test]
    fn test_empty_ballot_contributes_nothing() {
        let universe = labels(&["A", "B"]);
        let reviews = vec![
            review(&[], &[("A", 9.9)]),
            review(&["A", "B"], &[("A", 7.0), ("B", 6.0)]),
        ];

        let outcome = aggregate_votes(&reviews, &universe);

        assert_eq!(outcome.breakdown.borda_totals["A"], 1);
        // The empty ballot's scores are skipped too.
        assert!((outcome.breakdown.score_averages["A"] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_unscored_label_averages_zero() {
        let universe = labels(&["A", "B"]);
        let reviews = vec![review(&["A", "B"], &[("A", 8.0)])];

        let outcome = aggregate_votes(&reviews, &universe);

        assert_eq!(outcome.breakdown.score_averages["B"], 0.0);
        assert_eq!(outcome.final_ranking, labels(&["A", "B"]));
    }

    #[test]
    fn test_no_reviews_yields_zeroed_breakdown() {
        let universe = labels(&["B", "A"]);
        let outcome = aggregate_votes(&[], &universe);

        assert_eq!(outcome.final_ranking, labels(&["A", "B"]));
        assert_eq!(outcome.breakdown.borda_totals["A"], 0);
        assert_eq!(outcome.breakdown.score_averages["A"], 0.0);
    }
}
