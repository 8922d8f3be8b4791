// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod similarity;
pub mod tables;

pub use filters::{compare_matches, deduplicate, diversify, rank};
pub use matcher::{MatchError, Matcher, MatcherSettings};
pub use scoring::{base_score, passes_threshold, ActivityCounts, PreferenceProfile};
pub use similarity::{tag_similarity, text_similarity};
pub use tables::{CategoryTable, LevelLattice};
