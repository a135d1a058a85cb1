//! Behavior upsert into the ordered rule list

use crate::model::CacheBehavior;

/// How an upsert changed the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Replaced the entry at this index, preserving its precedence
    Replaced(usize),
    /// Appended at the end of the list
    Appended,
}

/// Insert or replace a rule keyed by its path pattern.
///
/// Match order is semantically significant (the first matching pattern
/// wins at request-routing time), so an existing entry is replaced in
/// place at the same index and a new entry is appended at the end.
/// Unrelated entries are never reordered.
pub fn upsert_behavior(behaviors: &mut Vec<CacheBehavior>, behavior: CacheBehavior) -> UpsertOutcome {
    match behaviors
        .iter()
        .position(|b| b.path_pattern == behavior.path_pattern)
    {
        Some(idx) => {
            behaviors[idx] = behavior;
            UpsertOutcome::Replaced(idx)
        }
        None => {
            behaviors.push(behavior);
            UpsertOutcome::Appended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpMethod, ViewerProtocolPolicy};

    fn behavior(pattern: &str) -> CacheBehavior {
        let mut b = CacheBehavior::new(pattern, "origin-1");
        b.cache_policy_id = Some("cp-1".to_string());
        b
    }

    #[test]
    fn append_into_empty_list() {
        let mut behaviors = Vec::new();
        let mut track = behavior("/track");
        track.allowed_methods = HttpMethod::all();

        let outcome = upsert_behavior(&mut behaviors, track.clone());

        assert_eq!(outcome, UpsertOutcome::Appended);
        assert_eq!(behaviors, vec![track]);
    }

    #[test]
    fn append_preserves_existing_order() {
        let mut behaviors = vec![behavior("/stats")];

        upsert_behavior(&mut behaviors, behavior("/track"));

        let patterns: Vec<_> = behaviors.iter().map(|b| b.path_pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/stats", "/track"]);
    }

    #[test]
    fn replace_keeps_index_and_neighbors() {
        let mut behaviors = vec![behavior("/a"), behavior("/track"), behavior("/z")];
        let before = behaviors.clone();

        let mut replacement = behavior("/track");
        replacement.viewer_protocol_policy = ViewerProtocolPolicy::HttpsOnly;
        let outcome = upsert_behavior(&mut behaviors, replacement.clone());

        assert_eq!(outcome, UpsertOutcome::Replaced(1));
        assert_eq!(behaviors.len(), before.len());
        assert_eq!(behaviors[0], before[0]);
        assert_eq!(behaviors[1], replacement);
        assert_eq!(behaviors[2], before[2]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut once = vec![behavior("/stats")];
        upsert_behavior(&mut once, behavior("/track"));
        let mut twice = once.clone();
        upsert_behavior(&mut twice, behavior("/track"));

        assert_eq!(once, twice);
    }

    #[test]
    fn no_duplicate_keys_after_upsert() {
        let mut behaviors = vec![behavior("/track")];
        upsert_behavior(&mut behaviors, behavior("/track"));

        let matches = behaviors
            .iter()
            .filter(|b| b.path_pattern == "/track")
            .count();
        assert_eq!(matches, 1);
    }
}
