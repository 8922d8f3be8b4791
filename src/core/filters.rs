use crate::models::{AdvancedMatch, MatchKey, UserId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ratings closer than this are treated as equal by the ranker
const RATING_TIE_EPSILON: f64 = 0.1;

/// Keep one match per (candidate, offered skill, sought skill)
///
/// The highest score wins; on equal scores the first-seen match is kept.
/// Survivors keep the first-seen order of their key.
pub fn deduplicate(matches: Vec<AdvancedMatch>) -> Vec<AdvancedMatch> {
    let mut positions: HashMap<MatchKey, usize> = HashMap::with_capacity(matches.len());
    let mut survivors: Vec<AdvancedMatch> = Vec::with_capacity(matches.len());

    for m in matches {
        match positions.get(&m.base.key()) {
            Some(&idx) => {
                if m.score() > survivors[idx].score() {
                    survivors[idx] = m;
                }
            }
            None => {
                positions.insert(m.base.key(), survivors.len());
                survivors.push(m);
            }
        }
    }

    survivors
}

/// Ordering of two matches, most preferred first
///
/// 1. score, descending
/// 2. candidate rating, descending, only when the ratings differ by more than 0.1
/// 3. mutual interest before none
/// 4. activity score, descending
pub fn compare_matches(a: &AdvancedMatch, b: &AdvancedMatch) -> Ordering {
    b.score()
        .cmp(&a.score())
        .then_with(|| {
            if (a.user_rating - b.user_rating).abs() > RATING_TIE_EPSILON {
                b.user_rating
                    .partial_cmp(&a.user_rating)
                    .unwrap_or(Ordering::Equal)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| b.mutual_interest.cmp(&a.mutual_interest))
        .then_with(|| b.activity_score.cmp(&a.activity_score))
}

/// Stable ranking of matches by [`compare_matches`]
///
/// The rating tolerance makes the comparator non-transitive, which the
/// standard library sorts do not accept, so this is a plain insertion sort.
pub fn rank(mut matches: Vec<AdvancedMatch>) -> Vec<AdvancedMatch> {
    for i in 1..matches.len() {
        let mut j = i;
        while j > 0 && compare_matches(&matches[j - 1], &matches[j]) == Ordering::Greater {
            matches.swap(j - 1, j);
            j -= 1;
        }
    }
    matches
}

/// Cap how many matches a single candidate may occupy in the ranked list
pub fn diversify(matches: Vec<AdvancedMatch>, max_per_candidate: usize) -> Vec<AdvancedMatch> {
    let mut per_user: HashMap<UserId, usize> = HashMap::new();

    matches
        .into_iter()
        .filter(|m| {
            let count = per_user.entry(m.base.user_id).or_insert(0);
            if *count < max_per_candidate {
                *count += 1;
                true
            } else {
                false
            }
        })
        .collect()
}
