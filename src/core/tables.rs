use crate::models::SkillLevel;
use std::collections::HashMap;

/// Related-category groups used to widen candidate search
const CATEGORY_GROUPS: &[(&str, &[&str])] = &[
    ("Programming", &["Programming", "Web Development", "Software Development", "Tech"]),
    ("Web Development", &["Web Development", "Programming", "Frontend", "Backend", "Fullstack"]),
    ("Design", &["Design", "UI/UX", "Graphics", "Creative"]),
    ("Music", &["Music", "Audio", "Sound", "Performance"]),
    ("Language", &["Language", "Communication", "Writing", "Translation"]),
    ("Business", &["Business", "Marketing", "Management", "Entrepreneurship"]),
    ("Art", &["Art", "Creative", "Visual", "Crafts"]),
    ("Sports", &["Sports", "Fitness", "Health", "Physical"]),
    ("Cooking", &["Cooking", "Food", "Culinary", "Baking"]),
    ("Photography", &["Photography", "Visual", "Creative", "Media"]),
];

/// Category -> related categories, self-inclusive
///
/// Lookups are exact string matches. Categories missing from the table expand
/// to themselves only. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    related: HashMap<String, Vec<String>>,
}

impl CategoryTable {
    pub fn new() -> Self {
        let related = CATEGORY_GROUPS
            .iter()
            .map(|(category, group)| {
                (
                    category.to_string(),
                    group.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();

        Self { related }
    }

    /// Categories a skill in `category` may be matched against
    pub fn expand(&self, category: &str) -> Vec<String> {
        match self.related.get(category) {
            Some(group) => group.clone(),
            None => vec![category.to_string()],
        }
    }

    /// Whether `candidate` is within the expansion of `category`
    pub fn is_related(&self, category: &str, candidate: &str) -> bool {
        match self.related.get(category) {
            Some(group) => group.iter().any(|c| c == candidate),
            None => category == candidate,
        }
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Proficiency level -> counterpart levels acceptable for matching
#[derive(Debug, Clone)]
pub struct LevelLattice {
    compatible: HashMap<SkillLevel, Vec<SkillLevel>>,
}

impl LevelLattice {
    pub fn new() -> Self {
        use SkillLevel::*;

        let compatible = HashMap::from([
            (Beginner, vec![Beginner, Intermediate]),
            (Intermediate, vec![Intermediate, Advanced]),
            (Advanced, vec![Intermediate, Advanced, Expert]),
            (Expert, vec![Advanced, Expert]),
        ]);

        Self { compatible }
    }

    pub fn compatible_levels(&self, level: SkillLevel) -> Vec<SkillLevel> {
        self.compatible
            .get(&level)
            .cloned()
            .unwrap_or_else(|| vec![level])
    }

    pub fn is_compatible(&self, sought: SkillLevel, offered: SkillLevel) -> bool {
        self.compatible
            .get(&sought)
            .map(|levels| levels.contains(&offered))
            .unwrap_or(sought == offered)
    }
}

impl Default for LevelLattice {
    fn default() -> Self {
        Self::new()
    }
}
