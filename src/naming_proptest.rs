//! Property-based tests for name conversions and version ordering.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::naming::{kebab_case, snake_case, upper_snake_case};
    use crate::version::is_upgrade;
    use proptest::prelude::*;
    use semver::Version;

    // ============================================================================
    // naming property tests
    // ============================================================================

    proptest! {
        /// Property: kebab_case only produces lowercase alphanumerics and dashes
        #[test]
        fn kebab_case_is_resource_name_safe(input in ".*") {
            let result = kebab_case(&input);
            for ch in result.chars() {
                prop_assert!(
                    ch == '-' || ch.is_ascii_lowercase() || ch.is_ascii_digit(),
                    "kebab_case produced '{}' from input '{}'",
                    ch,
                    input
                );
            }
            prop_assert!(!result.starts_with('-'));
            prop_assert!(!result.ends_with('-'));
            prop_assert!(!result.contains("--"));
        }

        /// Property: converting twice gives the same result as converting once
        #[test]
        fn kebab_case_is_idempotent(input in "[A-Za-z0-9 _-]{0,40}") {
            let once = kebab_case(&input);
            prop_assert_eq!(kebab_case(&once), once);
        }

        /// Property: snake and kebab forms differ only in the separator
        #[test]
        fn snake_and_kebab_agree(input in "[A-Za-z0-9 _.-]{0,40}") {
            prop_assert_eq!(snake_case(&input).replace('_', "-"), kebab_case(&input));
        }

        /// Property: upper snake case has no lowercase letters
        #[test]
        fn upper_snake_has_no_lowercase(input in ".*") {
            let result = upper_snake_case(&input);
            prop_assert!(!result.chars().any(|c| c.is_ascii_lowercase()));
        }
    }

    // ============================================================================
    // version ordering property tests
    // ============================================================================

    proptest! {
        /// Property: an upgrade is only ever reported towards a strictly greater version
        #[test]
        fn upgrade_is_strictly_increasing(
            a in (0u64..20, 0u64..20, 0u64..20),
            b in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let old = Version::new(a.0, a.1, a.2);
            let new = Version::new(b.0, b.1, b.2);
            prop_assert_eq!(is_upgrade(Some(&old), &new), old < new);
        }

        /// Property: with no prior version everything is an upgrade
        #[test]
        fn no_prior_version_always_upgrades(b in (0u64..20, 0u64..20, 0u64..20)) {
            let new = Version::new(b.0, b.1, b.2);
            prop_assert!(is_upgrade(None, &new));
        }
    }
}
