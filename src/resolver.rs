use strsim::jaro_winkler;

const FUZZY_THRESHOLD: f64 = 0.85;

/// Canonical form used for artist-name and playlist-id lookups.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Check if a similarity score meets the fuzzy match threshold (85%)
pub fn is_fuzzy_match(score: f64) -> bool {
    score >= FUZZY_THRESHOLD
}

/// Resolve an incoming artist name against the known catalog.
/// Tier 1 is an exact normalized match; tier 2 takes the best fuzzy
/// candidate at or above the threshold.
pub fn resolve(name: &str, known: &[String]) -> Option<usize> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    if let Some(index) = known.iter().position(|candidate| normalize(candidate) == needle) {
        return Some(index);
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in known.iter().enumerate() {
        let score = jaro_winkler(&needle, &normalize(candidate));
        if is_fuzzy_match(score) && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// Canonicalize a batch of names; unresolvable names pass through
/// unchanged (the model drops them as unknown).
pub fn resolve_all(names: &[String], known: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| match resolve(name, known) {
            Some(index) => known[index].clone(),
            None => name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        vec![
            "Radiohead".to_string(),
            "Queen".to_string(),
            "Led Zeppelin".to_string(),
        ]
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        assert_eq!(resolve("radiohead", &catalog()), Some(0));
        assert_eq!(resolve("  QUEEN  ", &catalog()), Some(1));
    }

    #[test]
    fn test_fuzzy_match_similar_names() {
        // Transposed characters
        assert_eq!(resolve("Radiohaed", &catalog()), Some(0));
        // Missing space
        assert_eq!(resolve("LedZeppelin", &catalog()), Some(2));
    }

    #[test]
    fn test_no_match_different_names() {
        assert_eq!(resolve("Aphex Twin", &catalog()), None);
        assert_eq!(resolve("", &catalog()), None);
    }

    #[test]
    fn test_resolve_all_passes_unknown_through() {
        let names = vec!["queen".to_string(), "Aphex Twin".to_string()];
        let resolved = resolve_all(&names, &catalog());
        assert_eq!(resolved, vec!["Queen".to_string(), "Aphex Twin".to_string()]);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(is_fuzzy_match(0.85));
        assert!(!is_fuzzy_match(0.84));
    }
}
