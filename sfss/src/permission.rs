// =============================================================================
// SFSS SERVER - PERMISSION CHECK - sfss/src/permission.rs
// Owner-prefix authorization for SFP request paths
// =============================================================================

/// Check whether `owner` may touch `path`.
///
/// A path is permitted when it starts with exactly the owner's private
/// prefix `/A{owner}` or the shared prefix `/A0`, where "exactly" means the
/// prefix is the whole path or is immediately followed by `/`. The follow-up
/// character rule keeps `/A50` out of reach for owner 5.
pub fn check_permission(owner: i32, path: &str) -> bool {
    let owner_prefix = format!("/A{}", owner);
    matches_prefix(path, &owner_prefix) || matches_prefix(path, "/A0")
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::check_permission;

    #[test]
    fn owner_subtree_is_permitted() {
        assert!(check_permission(5, "/A5"));
        assert!(check_permission(5, "/A5/file.txt"));
        assert!(check_permission(5, "/A5/dir/sub"));
    }

    #[test]
    fn shared_subtree_is_permitted_for_everyone() {
        assert!(check_permission(1, "/A0"));
        assert!(check_permission(5, "/A0/file.txt"));
    }

    #[test]
    fn prefix_must_be_exact_not_textual() {
        // /A50 must not match owner 5's /A5 prefix.
        assert!(!check_permission(5, "/A50"));
        assert!(!check_permission(5, "/A50/file.txt"));
        assert!(!check_permission(1, "/A10"));
    }

    #[test]
    fn foreign_subtrees_are_denied() {
        assert!(!check_permission(3, "/A2/file.txt"));
        assert!(!check_permission(3, "/A4"));
        assert!(!check_permission(3, "/etc/passwd"));
        assert!(!check_permission(3, "A3/file.txt"));
    }
}
