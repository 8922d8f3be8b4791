/// Minimum token length (exclusive) for a word to count toward text similarity
const MIN_TOKEN_LEN: usize = 2;

/// Word-overlap similarity between two free-text fields (0-100)
///
/// Both sides are lowercased and split on whitespace; only tokens longer than
/// two characters are kept. The score is the number of kept tokens of `a` that
/// also occur in `b`, as a percentage of the larger kept-token count.
pub fn text_similarity(a: &str, b: &str) -> u32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let words_a = significant_tokens(&a);
    let words_b = significant_tokens(&b);

    overlap_percent(&words_a, &words_b)
}

/// Overlap between two comma-separated tag lists (0-100)
pub fn tag_similarity(a: &str, b: &str) -> u32 {
    let tags_a = split_tags(a);
    let tags_b = split_tags(b);

    overlap_percent(&tags_a, &tags_b)
}

fn significant_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|word| word.chars().count() > MIN_TOKEN_LEN)
        .collect()
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn overlap_percent<T: AsRef<str>>(a: &[T], b: &[T]) -> u32 {
    let denominator = a.len().max(b.len());
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let common = a
        .iter()
        .filter(|item| b.iter().any(|other| other.as_ref() == item.as_ref()))
        .count();

    (common * 100 / denominator) as u32
}
