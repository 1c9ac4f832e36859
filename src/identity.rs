//! Fuzzy employee identity matching.
//!
//! Shop-floor terminals record employee names as free text, so the same
//! person shows up as `"方辉"`, `"方 辉"`, or `"方辉-白班"` depending on who
//! typed the entry. Matching is therefore whitespace-insensitive and
//! substring-tolerant in both directions.

/// Decide whether a stored employee label and a query name refer to the
/// same person.
///
/// Both sides are cleaned by removing every whitespace character; the
/// result is a match iff one cleaned string contains the other. Empty or
/// whitespace-only input on either side never matches.
///
/// The rule is deliberately permissive: a stored label of `"A"` matches a
/// query of `"A-team-A"` and vice versa. Clearance checks do not use this
/// rule; they compare labels exactly.
pub fn matches(stored_label: &str, query_name: &str) -> bool {
    let stored = strip_whitespace(stored_label);
    let query = strip_whitespace(query_name);

    if stored.is_empty() || query.is_empty() {
        return false;
    }

    stored.contains(&query) || query.contains(&stored)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_match() {
        assert!(matches("方辉", "方辉"));
        assert!(matches("alice", "alice"));
    }

    #[test]
    fn whitespace_is_ignored() {
        assert!(matches("方 辉", "方辉"));
        assert!(matches("方辉", " 方 辉 "));
        assert!(matches("a l i c e", "alice"));
        assert!(matches("ali\tce", "alice"));
    }

    #[test]
    fn substring_matches_in_either_direction() {
        // Stored label carries an extra qualifier.
        assert!(matches("方辉-白班", "方辉"));
        // Query is the superset hint.
        assert!(matches("方辉", "方辉-白班"));
    }

    #[test]
    fn symmetry() {
        let pairs = [("方辉", "方辉-白班"), ("a", "abc"), ("方 辉", "方辉")];
        for (l, r) in pairs {
            assert_eq!(matches(l, r), matches(r, l), "asymmetric for {l:?}/{r:?}");
        }
    }

    #[test]
    fn empty_sides_never_match() {
        assert!(!matches("", "方辉"));
        assert!(!matches("方辉", ""));
        assert!(!matches("", ""));
        assert!(!matches("   ", "方辉"));
        assert!(!matches("方辉", " \t "));
    }

    #[test]
    fn unrelated_names_do_not_match() {
        assert!(!matches("方辉", "李雷"));
        assert!(!matches("alice", "bob"));
    }
}
