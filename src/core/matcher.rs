use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::{
    filters::{deduplicate, diversify, rank},
    scoring::{
        base_score, completion_boost, completion_rate, location_score, passes_threshold,
        reputation_boost, ActivityCounts, PreferenceProfile,
    },
    tables::{CategoryTable, LevelLattice},
};
use crate::models::{
    AdvancedMatch, ExchangeStatus, Match, ResponseTime, ScoringWeights, Skill, SkillType, User,
    UserId,
};
use crate::services::{ActivityKind, RepositoryError, SkillQuery, SkillRepository};

/// Errors that end a matching run
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(#[from] RepositoryError),
}

/// Pipeline limits that are not score weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherSettings {
    /// Matches scoring at or below this never enter the pool
    pub min_score: i32,
    /// Diversity cap: surviving matches per candidate user
    pub max_per_candidate: usize,
    /// Look-back window for activity and response-time signals
    pub activity_window_days: i64,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            min_score: 20,
            max_per_candidate: 2,
            activity_window_days: 30,
        }
    }
}

/// What the matcher knows about the requesting user for one run
struct Requester {
    user: User,
    seeking: Vec<Skill>,
    /// `None` when the offering skills could not be read
    offering: Option<Vec<Skill>>,
    preferences: PreferenceProfile,
    since: DateTime<Utc>,
}

/// Per-candidate inputs of the score aggregator
struct CandidateSignals {
    user: User,
    activity_score: i32,
    completion_rate: f64,
    response_time: ResponseTime,
    mutual_interest: bool,
}

/// Signals are loaded once per candidate per run; `None` marks a candidate
/// whose user record could not be read
type SignalCache = HashMap<UserId, Option<CandidateSignals>>;

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Candidate generation (seeking skill -> related offering skills)
/// 2. Reciprocal match discovery (users who seek what the requester offers)
/// 3. Scoring of every pair, threshold filter
/// 4. Deduplication, ranking, diversity filter
///
/// The matcher owns only immutable lookup tables and weights, so a single
/// instance can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct Matcher {
    categories: CategoryTable,
    levels: LevelLattice,
    weights: ScoringWeights,
    settings: MatcherSettings,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, settings: MatcherSettings) -> Self {
        Self {
            categories: CategoryTable::new(),
            levels: LevelLattice::new(),
            weights,
            settings,
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default(), MatcherSettings::default())
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn settings(&self) -> &MatcherSettings {
        &self.settings
    }

    /// Ranked matches in the legacy format (identity, skills, score)
    pub async fn compute_matches(
        &self,
        repo: &dyn SkillRepository,
        user_id: UserId,
    ) -> Result<Vec<Match>, MatchError> {
        let matches = self.compute_advanced_matches(repo, user_id).await?;
        Ok(matches.into_iter().map(|m| m.base).collect())
    }

    /// Ranked matches with every sub-score
    ///
    /// Fails only when the requester cannot be loaded. Any other failed query
    /// drops the branch that issued it and the run continues.
    pub async fn compute_advanced_matches(
        &self,
        repo: &dyn SkillRepository,
        user_id: UserId,
    ) -> Result<Vec<AdvancedMatch>, MatchError> {
        let pool = self.candidate_pool(repo, user_id).await?;
        Ok(self.finalize(pool))
    }

    /// Every match that passed the score threshold, before deduplication
    pub async fn candidate_pool(
        &self,
        repo: &dyn SkillRepository,
        user_id: UserId,
    ) -> Result<Vec<AdvancedMatch>, MatchError> {
        let requester = self.load_requester(repo, user_id).await?;
        let mut cache = SignalCache::new();

        let mut pool = self.generate_candidates(repo, &requester, &mut cache).await;
        let generated = pool.len();
        pool.extend(self.find_reciprocal(repo, &requester, &mut cache).await);

        tracing::debug!(
            "User {}: {} generated, {} reciprocal, {} candidates scored",
            user_id,
            generated,
            pool.len() - generated,
            cache.len()
        );

        Ok(pool)
    }

    /// Deduplicate, rank, and diversify a pooled match list
    pub fn finalize(&self, pool: Vec<AdvancedMatch>) -> Vec<AdvancedMatch> {
        let pooled = pool.len();
        let unique = deduplicate(pool);
        let duplicates = pooled - unique.len();

        let result = diversify(rank(unique), self.settings.max_per_candidate);

        tracing::debug!(
            "Pool of {} matches: {} duplicates removed, {} returned",
            pooled,
            duplicates,
            result.len()
        );

        result
    }

    async fn load_requester(
        &self,
        repo: &dyn SkillRepository,
        user_id: UserId,
    ) -> Result<Requester, MatchError> {
        let user = repo
            .fetch_user(user_id)
            .await?
            .ok_or(MatchError::NotFound(user_id))?;

        let seeking = repo
            .fetch_active_skills(&SkillQuery::owned_by(user_id, SkillType::Seeking))
            .await?;

        let offering = match repo
            .fetch_active_skills(&SkillQuery::owned_by(user_id, SkillType::Offering))
            .await
        {
            Ok(skills) => Some(skills),
            Err(e) => {
                tracing::warn!("Failed to fetch offered skills for {}, skipping reciprocity: {}", user_id, e);
                None
            }
        };

        let history = or_neutral(
            repo.fetch_exchanges_by_requester(user_id).await,
            Vec::new(),
            "exchange history",
            user_id,
        );

        Ok(Requester {
            preferences: PreferenceProfile::new(&history, &seeking),
            since: Utc::now() - Duration::days(self.settings.activity_window_days),
            user,
            seeking,
            offering,
        })
    }

    /// Stage 1: for each seeking skill, score offering skills of other users in
    /// a related category at a compatible level
    async fn generate_candidates(
        &self,
        repo: &dyn SkillRepository,
        requester: &Requester,
        cache: &mut SignalCache,
    ) -> Vec<AdvancedMatch> {
        let mut pool = Vec::new();

        for seeking in &requester.seeking {
            let query = SkillQuery::new()
                .skill_type(SkillType::Offering)
                .categories(self.categories.expand(&seeking.category))
                .levels(self.levels.compatible_levels(seeking.level))
                .excluding_user(requester.user.id);

            let offered = match repo.fetch_active_skills(&query).await {
                Ok(skills) => skills,
                Err(e) => {
                    tracing::warn!("Skipping seeking skill {}: {}", seeking.id, e);
                    continue;
                }
            };

            for offer in &offered {
                if !is_offer_from_other(offer, requester.user.id)
                    || !self.levels.is_compatible(seeking.level, offer.level)
                {
                    continue;
                }
                let Some(signals) = self.signals(repo, requester, cache, offer.user_id).await else {
                    continue;
                };

                let scored = self.score_pair(requester, signals, seeking, offer);
                if passes_threshold(scored.score(), self.settings.min_score) {
                    pool.push(scored);
                }
            }
        }

        pool
    }

    /// Stage 2: find users who seek what the requester offers and offer what
    /// the requester seeks
    ///
    /// Every seeking skill of such a user re-emits that user's pairs, so the
    /// pool may hold duplicates until [`Matcher::finalize`].
    async fn find_reciprocal(
        &self,
        repo: &dyn SkillRepository,
        requester: &Requester,
        cache: &mut SignalCache,
    ) -> Vec<AdvancedMatch> {
        let Some(offering) = &requester.offering else {
            return Vec::new();
        };
        let requester_id = requester.user.id;
        let mut pool = Vec::new();

        for mine in offering {
            let query = SkillQuery::new()
                .skill_type(SkillType::Seeking)
                .categories(self.categories.expand(&mine.category))
                .excluding_user(requester_id);

            let seekers = match repo.fetch_active_skills(&query).await {
                Ok(skills) => skills,
                Err(e) => {
                    tracing::warn!("Skipping reciprocal search for offered skill {}: {}", mine.id, e);
                    continue;
                }
            };

            for their_seeking in &seekers {
                if their_seeking.user_id == requester_id {
                    continue;
                }

                let their_offering = match repo
                    .fetch_active_skills(&SkillQuery::owned_by(their_seeking.user_id, SkillType::Offering))
                    .await
                {
                    Ok(skills) => skills,
                    Err(e) => {
                        tracing::warn!(
                            "Skipping reciprocal candidate {}: {}",
                            their_seeking.user_id,
                            e
                        );
                        continue;
                    }
                };

                for theirs in &their_offering {
                    if !is_offer_from_other(theirs, requester_id) {
                        continue;
                    }

                    for my_seeking in &requester.seeking {
                        if !self.categories.is_related(&my_seeking.category, &theirs.category) {
                            continue;
                        }
                        let Some(signals) = self.signals(repo, requester, cache, theirs.user_id).await else {
                            continue;
                        };

                        let mut scored = self.score_pair(requester, signals, my_seeking, theirs);
                        scored.base.match_score += self.weights.reciprocal_bonus;
                        scored.mutual_interest = true;

                        if passes_threshold(scored.score(), self.settings.min_score) {
                            pool.push(scored);
                        }
                    }
                }
            }
        }

        pool
    }

    /// Aggregate score of one (seeking, offered) pair
    fn score_pair(
        &self,
        requester: &Requester,
        signals: &CandidateSignals,
        seeking: &Skill,
        offered: &Skill,
    ) -> AdvancedMatch {
        let weights = &self.weights;
        let candidate = &signals.user;

        let location_score = location_score(&requester.user.location, &candidate.location, weights);
        let recommendation_score = requester.preferences.score(offered, weights);

        let mut score = base_score(seeking, offered, weights);
        score += reputation_boost(candidate.rating.as_ref(), weights);
        score += location_score;
        score += signals.activity_score;
        score += completion_boost(signals.completion_rate, weights);
        if signals.mutual_interest {
            score += weights.mutual_interest;
        }
        score += recommendation_score;

        AdvancedMatch {
            base: Match {
                user_id: candidate.id,
                user_name: candidate.full_name.clone(),
                user_avatar: candidate.avatar.clone(),
                offered_skill_id: offered.id,
                offered_skill: offered.title.clone(),
                seeking_skill_id: seeking.id,
                seeking_skill: seeking.title.clone(),
                match_score: score,
            },
            user_rating: candidate.average_rating(),
            location_score,
            activity_score: signals.activity_score,
            completion_rate: signals.completion_rate,
            response_time: signals.response_time,
            mutual_interest: signals.mutual_interest,
            recommendation_score,
        }
    }

    async fn signals<'c>(
        &self,
        repo: &dyn SkillRepository,
        requester: &Requester,
        cache: &'c mut SignalCache,
        candidate_id: UserId,
    ) -> Option<&'c CandidateSignals> {
        if !cache.contains_key(&candidate_id) {
            let loaded = self.load_signals(repo, requester, candidate_id).await;
            cache.insert(candidate_id, loaded);
        }
        cache.get(&candidate_id).and_then(Option::as_ref)
    }

    async fn load_signals(
        &self,
        repo: &dyn SkillRepository,
        requester: &Requester,
        candidate_id: UserId,
    ) -> Option<CandidateSignals> {
        let user = match repo.fetch_user(candidate_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!("Candidate {} has skills but no user record", candidate_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch candidate {}: {}", candidate_id, e);
                return None;
            }
        };

        let since = requester.since;
        let activity = ActivityCounts {
            skills_posted: or_neutral(
                repo.count_recent(ActivityKind::Skills, candidate_id, since).await,
                0,
                "recent skills",
                candidate_id,
            ),
            exchanges_requested: or_neutral(
                repo.count_recent(ActivityKind::Exchanges, candidate_id, since).await,
                0,
                "recent exchanges",
                candidate_id,
            ),
            messages_sent: or_neutral(
                repo.count_recent(ActivityKind::Messages, candidate_id, since).await,
                0,
                "recent messages",
                candidate_id,
            ),
        };

        let completion = self.load_completion_rate(repo, candidate_id).await;

        let response_hours = or_neutral(
            repo.average_response_hours(candidate_id, since).await,
            None,
            "response time",
            candidate_id,
        );

        let mutual_interest = match repo.fetch_active_skills(&SkillQuery::new().user(candidate_id)).await {
            Ok(skills) => self.has_mutual_interest(requester, &skills),
            Err(e) => {
                tracing::warn!("Failed to fetch skills of candidate {}: {}", candidate_id, e);
                false
            }
        };

        Some(CandidateSignals {
            user,
            activity_score: activity.score(),
            completion_rate: completion,
            response_time: ResponseTime::from_average_hours(response_hours),
            mutual_interest,
        })
    }

    /// Share of completed exchanges; any failed count yields the neutral rate
    async fn load_completion_rate(&self, repo: &dyn SkillRepository, candidate_id: UserId) -> f64 {
        let total = match repo.count_exchanges(candidate_id, None).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!("Failed to read exchanges for user {}, using neutral value: {}", candidate_id, e);
                return completion_rate(0, 0);
            }
        };
        if total <= 0 {
            return completion_rate(0, 0);
        }

        match repo.count_exchanges(candidate_id, Some(ExchangeStatus::Completed)).await {
            Ok(completed) => completion_rate(completed, total),
            Err(e) => {
                tracing::warn!(
                    "Failed to read completed exchanges for user {}, using neutral value: {}",
                    candidate_id,
                    e
                );
                completion_rate(0, 0)
            }
        }
    }

    /// Both users offer something in a category related to what the other seeks
    fn has_mutual_interest(&self, requester: &Requester, candidate_skills: &[Skill]) -> bool {
        let Some(requester_offering) = &requester.offering else {
            return false;
        };

        // requester category expanded, candidate category looked up
        let related = |mine: &Skill, theirs: &Skill| {
            self.categories.is_related(&mine.category, &theirs.category)
        };

        let they_cover_me = candidate_skills
            .iter()
            .filter(|s| s.skill_type == SkillType::Offering)
            .any(|theirs| requester.seeking.iter().any(|mine| related(mine, theirs)));
        let i_cover_them = candidate_skills
            .iter()
            .filter(|s| s.skill_type == SkillType::Seeking)
            .any(|theirs| requester_offering.iter().any(|mine| related(mine, theirs)));

        they_cover_me && i_cover_them
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[inline]
fn is_offer_from_other(skill: &Skill, requester_id: UserId) -> bool {
    skill.is_active && skill.skill_type == SkillType::Offering && skill.user_id != requester_id
}

fn or_neutral<T>(result: Result<T, RepositoryError>, neutral: T, signal: &str, user_id: UserId) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to read {} for user {}, using neutral value: {}", signal, user_id, e);
        neutral
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategorizedExchange, Exchange, SkillLevel, UserRating};
    use crate::services::MemoryRepository;
    use async_trait::async_trait;

    /// Answers skill searches without applying the level filter
    struct LevelBlindRepository(MemoryRepository);

    #[async_trait]
    impl SkillRepository for LevelBlindRepository {
        async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
            self.0.fetch_user(user_id).await
        }

        async fn fetch_active_skills(&self, query: &SkillQuery) -> Result<Vec<Skill>, RepositoryError> {
            let mut query = query.clone();
            query.levels = None;
            self.0.fetch_active_skills(&query).await
        }

        async fn count_recent(
            &self,
            kind: ActivityKind,
            user_id: UserId,
            since: DateTime<Utc>,
        ) -> Result<i64, RepositoryError> {
            self.0.count_recent(kind, user_id, since).await
        }

        async fn count_exchanges(
            &self,
            user_id: UserId,
            status: Option<ExchangeStatus>,
        ) -> Result<i64, RepositoryError> {
            self.0.count_exchanges(user_id, status).await
        }

        async fn fetch_exchanges_by_requester(
            &self,
            user_id: UserId,
        ) -> Result<Vec<CategorizedExchange>, RepositoryError> {
            self.0.fetch_exchanges_by_requester(user_id).await
        }

        async fn average_response_hours(
            &self,
            user_id: UserId,
            since: DateTime<Utc>,
        ) -> Result<Option<f64>, RepositoryError> {
            self.0.average_response_hours(user_id, since).await
        }
    }

    fn create_user(id: UserId, location: &str) -> User {
        User {
            id,
            full_name: format!("User {}", id),
            avatar: String::new(),
            location: location.to_string(),
            rating: None,
        }
    }

    fn create_skill(
        id: i64,
        user_id: UserId,
        category: &str,
        level: SkillLevel,
        skill_type: SkillType,
    ) -> Skill {
        Skill {
            id,
            user_id,
            title: String::new(),
            description: String::new(),
            category: category.to_string(),
            level,
            skill_type,
            tags: String::new(),
            is_active: true,
            created_at: Utc::now() - Duration::days(90),
        }
    }

    fn requester_for(user: User, seeking: Vec<Skill>, offering: Vec<Skill>) -> Requester {
        Requester {
            preferences: PreferenceProfile::new(&[], &seeking),
            since: Utc::now() - Duration::days(30),
            user,
            seeking,
            offering: Some(offering),
        }
    }

    fn neutral_signals(user: User) -> CandidateSignals {
        CandidateSignals {
            user,
            activity_score: 0,
            completion_rate: 0.5,
            response_time: ResponseTime::NewUser,
            mutual_interest: false,
        }
    }

    #[test]
    fn test_score_pair_sums_every_signal() {
        let matcher = Matcher::with_default_weights();
        let seeking = create_skill(1, 1, "Music", SkillLevel::Beginner, SkillType::Seeking);
        let offered = create_skill(2, 2, "Music", SkillLevel::Beginner, SkillType::Offering);
        let requester = requester_for(create_user(1, "Berlin"), vec![seeking.clone()], vec![]);

        let mut candidate = create_user(2, "berlin");
        candidate.rating = Some(UserRating { average_rating: 4.0, total_reviews: 2 });
        let signals = CandidateSignals {
            activity_score: 10,
            completion_rate: 1.0,
            mutual_interest: true,
            ..neutral_signals(candidate)
        };

        let scored = matcher.score_pair(&requester, &signals, &seeking, &offered);

        // 90 base + 20 rating + 15 location + 10 activity + 20 completion + 30 mutual
        assert_eq!(scored.score(), 185);
        assert_eq!(scored.location_score, 15);
        assert_eq!(scored.user_rating, 4.0);
        assert!(scored.mutual_interest);
    }

    #[test]
    fn test_mutual_interest_needs_both_directions() {
        let matcher = Matcher::with_default_weights();
        let requester = requester_for(
            create_user(1, ""),
            vec![create_skill(1, 1, "Web Development", SkillLevel::Beginner, SkillType::Seeking)],
            vec![create_skill(2, 1, "Cooking", SkillLevel::Expert, SkillType::Offering)],
        );

        let one_way = vec![create_skill(3, 2, "Programming", SkillLevel::Expert, SkillType::Offering)];
        assert!(!matcher.has_mutual_interest(&requester, &one_way));

        let both_ways = vec![
            create_skill(3, 2, "Programming", SkillLevel::Expert, SkillType::Offering),
            create_skill(4, 2, "Cooking", SkillLevel::Beginner, SkillType::Seeking),
        ];
        assert!(matcher.has_mutual_interest(&requester, &both_ways));
    }

    #[tokio::test]
    async fn test_find_matches_basic() {
        let matcher = Matcher::with_default_weights();
        let repo = MemoryRepository::new()
            .with_user(create_user(1, ""))
            .with_user(create_user(2, ""))
            .with_skill(create_skill(10, 1, "Programming", SkillLevel::Beginner, SkillType::Seeking))
            .with_skill(create_skill(20, 2, "Programming", SkillLevel::Intermediate, SkillType::Offering))
            // requester's own offering never matches
            .with_skill(create_skill(11, 1, "Programming", SkillLevel::Intermediate, SkillType::Offering));

        let matches = matcher.compute_matches(&repo, 1).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, 2);
        assert_eq!(matches[0].match_score, 90);
    }

    #[tokio::test]
    async fn test_incompatible_level_filtered() {
        let matcher = Matcher::with_default_weights();
        let repo = MemoryRepository::new()
            .with_user(create_user(1, ""))
            .with_user(create_user(2, ""))
            .with_skill(create_skill(10, 1, "Music", SkillLevel::Beginner, SkillType::Seeking))
            .with_skill(create_skill(20, 2, "Music", SkillLevel::Expert, SkillType::Offering));

        let matches = matcher.compute_matches(&repo, 1).await.unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_incompatible_level_filtered_when_repository_ignores_levels() {
        let matcher = Matcher::with_default_weights();
        let repo = LevelBlindRepository(
            MemoryRepository::new()
                .with_user(create_user(1, ""))
                .with_user(create_user(2, ""))
                .with_skill(create_skill(10, 1, "Music", SkillLevel::Beginner, SkillType::Seeking))
                .with_skill(create_skill(20, 2, "Music", SkillLevel::Expert, SkillType::Offering))
                .with_skill(create_skill(21, 2, "Music", SkillLevel::Intermediate, SkillType::Offering)),
        );

        let matches = matcher.compute_matches(&repo, 1).await.unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].offered_skill_id, 21);
    }

    #[tokio::test]
    async fn test_missing_requester_is_not_found() {
        let matcher = Matcher::with_default_weights();
        let repo = MemoryRepository::new();

        let result = matcher.compute_matches(&repo, 99).await;

        assert!(matches!(result, Err(MatchError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_preference_history_adds_recommendation_score() {
        let matcher = Matcher::with_default_weights();
        let past = create_skill(30, 3, "Programming", SkillLevel::Expert, SkillType::Offering);
        let repo = MemoryRepository::new()
            .with_user(create_user(1, ""))
            .with_user(create_user(2, ""))
            .with_user(create_user(3, ""))
            .with_skill(create_skill(10, 1, "Programming", SkillLevel::Beginner, SkillType::Seeking))
            .with_skill(create_skill(20, 2, "Programming", SkillLevel::Intermediate, SkillType::Offering))
            .with_skill(past)
            .with_exchange(Exchange {
                id: 1,
                requester_id: 1,
                skill_id: 30,
                status: ExchangeStatus::Cancelled,
                created_at: Utc::now() - Duration::days(200),
                updated_at: Utc::now() - Duration::days(200),
            });

        let matches = matcher.compute_advanced_matches(&repo, 1).await.unwrap();
        let from_two: Vec<_> = matches.iter().filter(|m| m.base.user_id == 2).collect();

        assert_eq!(from_two.len(), 1);
        // 3 for one past exchange in the category + 5 level progression
        assert_eq!(from_two[0].recommendation_score, 8);
        assert_eq!(from_two[0].score(), 98);
    }
}
