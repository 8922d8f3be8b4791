use crate::core::similarity::{tag_similarity, text_similarity};
use crate::models::{CategorizedExchange, ScoringWeights, Skill, SkillLevel, UserRating};
use std::collections::HashMap;

/// Pure skill-to-skill score
///
/// score =
///     category_exact           # literal category equality only
///   + level_compatible         # offered rank >= sought rank
///   + level_exact              # ranks equal
///   + title_similarity * sim(title) / 100
///   + description_similarity * sim(description) / 100
///   + tag_similarity * sim(tags) / 100   # only when both sides have tags
pub fn base_score(seeking: &Skill, offered: &Skill, weights: &ScoringWeights) -> i32 {
    let mut score = 0;

    if seeking.category == offered.category {
        score += weights.category_exact;
    }

    let sought_rank = seeking.level.rank();
    let offered_rank = offered.level.rank();
    if offered_rank >= sought_rank {
        score += weights.level_compatible;
        if offered_rank == sought_rank {
            score += weights.level_exact;
        }
    }

    score += scaled(text_similarity(&seeking.title, &offered.title), weights.title_similarity);
    score += scaled(
        text_similarity(&seeking.description, &offered.description),
        weights.description_similarity,
    );

    if !seeking.tags.is_empty() && !offered.tags.is_empty() {
        score += scaled(tag_similarity(&seeking.tags, &offered.tags), weights.tag_similarity);
    }

    score
}

#[inline]
fn scaled(similarity: u32, points: i32) -> i32 {
    (similarity as i32 * points).div_euclid(100)
}

/// Boost for candidates with an aggregated rating (max 25 with default weights)
pub fn reputation_boost(rating: Option<&UserRating>, weights: &ScoringWeights) -> i32 {
    rating
        .map(|r| (r.average_rating * weights.rating_multiplier).floor() as i32)
        .unwrap_or(0)
}

/// Score how close two free-text locations are
///
/// Exact match after trimming/lowercasing scores `location_exact`; sharing any
/// word longer than three characters scores `location_partial`.
pub fn location_score(a: &str, b: &str, weights: &ScoringWeights) -> i32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return weights.location_exact;
    }

    let shared_word = a.split_whitespace().any(|word_a| {
        word_a.chars().count() > 3 && b.split_whitespace().any(|word_b| word_a == word_b)
    });

    if shared_word {
        weights.location_partial
    } else {
        0
    }
}

/// Recent activity of a candidate inside the activity window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub skills_posted: i64,
    pub exchanges_requested: i64,
    pub messages_sent: i64,
}

impl ActivityCounts {
    /// Messages are weighted at one fifth of a skill or exchange
    pub fn total(&self) -> i64 {
        self.skills_posted + self.exchanges_requested + self.messages_sent / 5
    }

    pub fn score(&self) -> i32 {
        activity_score(self.total())
    }
}

/// Step function over the weighted activity total
pub fn activity_score(total: i64) -> i32 {
    match total {
        t if t >= 10 => 15,
        t if t >= 5 => 10,
        t if t >= 1 => 5,
        _ => 0,
    }
}

/// Share of a candidate's exchanges that completed; 0.5 for users without any
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.5;
    }
    completed as f64 / total as f64
}

pub fn completion_boost(rate: f64, weights: &ScoringWeights) -> i32 {
    (rate * weights.completion_multiplier).floor() as i32
}

/// Requester-side inputs of the preference heuristic
///
/// Built once per invocation from the requester's exchange history and seeking
/// skills.
#[derive(Debug, Clone, Default)]
pub struct PreferenceProfile {
    category_counts: HashMap<String, i32>,
    seeks_beginner: bool,
    seeks_intermediate: bool,
}

impl PreferenceProfile {
    pub fn new(history: &[CategorizedExchange], seeking: &[Skill]) -> Self {
        let mut category_counts = HashMap::new();
        for exchange in history {
            *category_counts.entry(exchange.category.clone()).or_insert(0) += 1;
        }

        Self {
            category_counts,
            seeks_beginner: seeking.iter().any(|s| s.level == SkillLevel::Beginner),
            seeks_intermediate: seeking.iter().any(|s| s.level == SkillLevel::Intermediate),
        }
    }

    pub fn has_history(&self) -> bool {
        !self.category_counts.is_empty()
    }

    /// Preference sub-score for an offered skill
    ///
    /// Requesters without any exchange history get 0: both the category
    /// affinity and the level-progression bonus are learned from past exchanges.
    /// A first-time beginner seeker offered an intermediate skill therefore
    /// scores base 80 plus the neutral completion 10, an aggregate of 90.
    pub fn score(&self, offered: &Skill, weights: &ScoringWeights) -> i32 {
        if !self.has_history() {
            return 0;
        }

        let mut score = 0;

        if let Some(count) = self.category_counts.get(&offered.category) {
            score += (count * weights.category_preference_step).min(weights.category_preference_cap);
        }

        match offered.level {
            SkillLevel::Intermediate if self.seeks_beginner => score += weights.level_progression,
            SkillLevel::Advanced if self.seeks_intermediate => score += weights.level_progression,
            _ => {}
        }

        score
    }
}

/// Aggregate scores at or below `min_score` never enter the pool
#[inline]
pub fn passes_threshold(score: i32, min_score: i32) -> bool {
    score > min_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, ExchangeStatus, SkillType};
    use chrono::Utc;

    fn skill(category: &str, level: SkillLevel, skill_type: SkillType) -> Skill {
        Skill {
            id: 1,
            user_id: 1,
            title: String::new(),
            description: String::new(),
            category: category.to_string(),
            level,
            skill_type,
            tags: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn exchange_in(category: &str) -> CategorizedExchange {
        CategorizedExchange {
            exchange: Exchange {
                id: 1,
                requester_id: 1,
                skill_id: 9,
                status: ExchangeStatus::Pending,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            category: category.to_string(),
        }
    }

    #[test]
    fn test_identical_skills_without_text_score_90() {
        let weights = ScoringWeights::default();
        let seeking = skill("Music", SkillLevel::Advanced, SkillType::Seeking);
        let offered = skill("Music", SkillLevel::Advanced, SkillType::Offering);

        assert_eq!(base_score(&seeking, &offered, &weights), 90);
    }

    #[test]
    fn test_lower_offered_level_gets_no_level_points() {
        let weights = ScoringWeights::default();
        let seeking = skill("Music", SkillLevel::Expert, SkillType::Seeking);
        let offered = skill("Music", SkillLevel::Advanced, SkillType::Offering);

        assert_eq!(base_score(&seeking, &offered, &weights), 50);
    }

    #[test]
    fn test_related_category_gets_no_category_bonus() {
        let weights = ScoringWeights::default();
        let seeking = skill("Web Development", SkillLevel::Beginner, SkillType::Seeking);
        let offered = skill("Programming", SkillLevel::Intermediate, SkillType::Offering);

        assert_eq!(base_score(&seeking, &offered, &weights), 30);
    }

    #[test]
    fn test_text_and_tags_contribute() {
        let weights = ScoringWeights::default();
        let mut seeking = skill("Music", SkillLevel::Beginner, SkillType::Seeking);
        let mut offered = skill("Music", SkillLevel::Beginner, SkillType::Offering);
        seeking.title = "Jazz Piano".to_string();
        offered.title = "jazz piano".to_string();
        seeking.description = "learn chords".to_string();
        offered.description = "chords and scales".to_string();
        seeking.tags = "jazz,piano".to_string();
        offered.tags = "piano".to_string();

        // 90 + 20 (title 100%) + 3 (description 33%) + 7 (tags 50%)
        assert_eq!(base_score(&seeking, &offered, &weights), 120);
    }

    #[test]
    fn test_tags_ignored_when_one_side_empty() {
        let weights = ScoringWeights::default();
        let mut seeking = skill("Music", SkillLevel::Beginner, SkillType::Seeking);
        let offered = skill("Music", SkillLevel::Beginner, SkillType::Offering);
        seeking.tags = "piano".to_string();

        assert_eq!(base_score(&seeking, &offered, &weights), 90);
    }

    #[test]
    fn test_reputation_boost() {
        let weights = ScoringWeights::default();
        let rating = UserRating { average_rating: 4.7, total_reviews: 3 };

        assert_eq!(reputation_boost(Some(&rating), &weights), 23);
        assert_eq!(reputation_boost(None, &weights), 0);
    }

    #[test]
    fn test_location_score() {
        let weights = ScoringWeights::default();

        assert_eq!(location_score("", "Berlin", &weights), 0);
        assert_eq!(location_score(" Berlin ", "berlin", &weights), 15);
        assert_eq!(location_score("Berlin Mitte", "berlin kreuzberg", &weights), 8);
        // shared word is too short
        assert_eq!(location_score("New York", "New Delhi", &weights), 0);
        assert_eq!(location_score("Paris", "Lyon", &weights), 0);
    }

    #[test]
    fn test_activity_steps() {
        let counts = ActivityCounts { skills_posted: 2, exchanges_requested: 2, messages_sent: 4 };
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.score(), 5);

        assert_eq!(activity_score(0), 0);
        assert_eq!(activity_score(5), 10);
        assert_eq!(activity_score(9), 10);
        assert_eq!(activity_score(10), 15);
    }

    #[test]
    fn test_completion_rate() {
        let weights = ScoringWeights::default();

        assert_eq!(completion_rate(0, 0), 0.5);
        assert_eq!(completion_boost(completion_rate(0, 0), &weights), 10);
        assert_eq!(completion_boost(completion_rate(2, 3), &weights), 13);
        assert_eq!(completion_boost(completion_rate(4, 4), &weights), 20);
    }

    #[test]
    fn test_preference_without_history_is_zero() {
        let weights = ScoringWeights::default();
        let seeking = vec![skill("Programming", SkillLevel::Beginner, SkillType::Seeking)];
        let offered = skill("Programming", SkillLevel::Intermediate, SkillType::Offering);

        let profile = PreferenceProfile::new(&[], &seeking);
        assert_eq!(profile.score(&offered, &weights), 0);
    }

    #[test]
    fn test_preference_category_affinity_is_capped() {
        let weights = ScoringWeights::default();
        let history: Vec<_> = (0..7).map(|_| exchange_in("Cooking")).collect();
        let offered = skill("Cooking", SkillLevel::Expert, SkillType::Offering);

        let profile = PreferenceProfile::new(&history, &[]);
        assert_eq!(profile.score(&offered, &weights), 15);

        let two = PreferenceProfile::new(&history[..2], &[]);
        assert_eq!(two.score(&offered, &weights), 6);
    }

    #[test]
    fn test_preference_level_progression() {
        let weights = ScoringWeights::default();
        let history = vec![exchange_in("Art")];
        let seeking = vec![
            skill("Music", SkillLevel::Beginner, SkillType::Seeking),
            skill("Music", SkillLevel::Intermediate, SkillType::Seeking),
        ];
        let profile = PreferenceProfile::new(&history, &seeking);

        let intermediate = skill("Music", SkillLevel::Intermediate, SkillType::Offering);
        let advanced = skill("Music", SkillLevel::Advanced, SkillType::Offering);
        let expert = skill("Music", SkillLevel::Expert, SkillType::Offering);

        assert_eq!(profile.score(&intermediate, &weights), 5);
        assert_eq!(profile.score(&advanced, &weights), 5);
        assert_eq!(profile.score(&expert, &weights), 0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!passes_threshold(20, 20));
        assert!(passes_threshold(21, 20));
    }
}
