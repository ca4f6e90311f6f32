//! Pure resolution of a relative path to a conflict behavior.

use kbport_shared::{Behavior, FolderBehaviorMap, normalize_key};

/// Resolve the behavior for a relative key against a folder map.
///
/// The longest matching map key wins; a key matches when it equals the
/// (normalized) input or is a path-prefix of it on a component boundary.
/// Absent any match, the default applies. Pure and total: no I/O, never
/// panics, an empty map simply yields the default.
pub fn resolve_behavior(
    relative_key: &str,
    map: &FolderBehaviorMap,
    default: Behavior,
) -> Behavior {
    let key = normalize_key(relative_key);

    let mut best: Option<(&str, Behavior)> = None;
    for (map_key, behavior) in map.iter() {
        if !key_matches(&key, map_key) {
            continue;
        }
        let longer = match best {
            Some((current, _)) => map_key.len() > current.len(),
            None => true,
        };
        if longer {
            best = Some((map_key.as_str(), *behavior));
        }
    }

    best.map(|(_, b)| b).unwrap_or(default)
}

/// `map_key` matches `key` exactly or as a whole-component prefix.
fn key_matches(key: &str, map_key: &str) -> bool {
    if map_key.is_empty() {
        return true;
    }
    key == map_key
        || (key.len() > map_key.len()
            && key.starts_with(map_key)
            && key.as_bytes()[map_key.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Behavior)]) -> FolderBehaviorMap {
        let mut m = FolderBehaviorMap::new();
        for (k, b) in entries {
            m.insert(k, *b);
        }
        m
    }

    #[test]
    fn empty_map_yields_default() {
        let m = FolderBehaviorMap::new();
        assert_eq!(resolve_behavior("docs/a.md", &m, Behavior::Add), Behavior::Add);
        assert_eq!(resolve_behavior("", &m, Behavior::Skip), Behavior::Skip);
    }

    #[test]
    fn exact_key_matches() {
        let m = map(&[("docs", Behavior::Skip)]);
        assert_eq!(resolve_behavior("docs", &m, Behavior::Add), Behavior::Skip);
    }

    #[test]
    fn prefix_matches_on_component_boundary_only() {
        let m = map(&[("doc", Behavior::Skip)]);
        // "docs/a.md" must not match the "doc" key.
        assert_eq!(resolve_behavior("docs/a.md", &m, Behavior::Add), Behavior::Add);
        assert_eq!(resolve_behavior("doc/a.md", &m, Behavior::Add), Behavior::Skip);
    }

    #[test]
    fn longest_match_wins() {
        let m = map(&[
            ("docs", Behavior::Skip),
            ("docs/notes", Behavior::Overwrite),
        ]);
        assert_eq!(
            resolve_behavior("docs/notes/today.md", &m, Behavior::Add),
            Behavior::Overwrite
        );
        assert_eq!(
            resolve_behavior("docs/guide.md", &m, Behavior::Add),
            Behavior::Skip
        );
    }

    #[test]
    fn input_key_is_normalized() {
        let m = map(&[("docs", Behavior::Overwrite)]);
        assert_eq!(
            resolve_behavior("./docs/guide.md", &m, Behavior::Add),
            Behavior::Overwrite
        );
        assert_eq!(
            resolve_behavior("docs\\guide.md", &m, Behavior::Add),
            Behavior::Overwrite
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let m = map(&[("a", Behavior::Skip), ("b", Behavior::Overwrite)]);
        for _ in 0..8 {
            assert_eq!(resolve_behavior("a/x", &m, Behavior::Add), Behavior::Skip);
        }
    }
}
