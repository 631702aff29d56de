//! Property-based tests for reference parsing and query literals.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::query::xpath_literal;
    use crate::reference::{parse_reference, SelectorType};
    use proptest::prelude::*;

    // ============================================================================
    // parse_reference property tests
    // ============================================================================

    proptest! {
        /// Property: parsing never panics, whatever the input
        #[test]
        fn parse_reference_never_panics(input in ".*") {
            let _ = parse_reference(&input);
        }

        /// Property: a well-formed id reference round-trips its parts
        #[test]
        fn parse_reference_id_roundtrip(
            project in "[0-9]{1,4}",
            file in "[a-z][a-z0-9_-]{0,12}",
            selector in "[A-Za-z0-9_-]{1,16}",
        ) {
            let raw = format!("{}|{}.xml#{}", project, file, selector);
            let target = parse_reference(&raw);
            prop_assert_eq!(target.selector_type, SelectorType::Id);
            prop_assert_eq!(target.project_id, project);
            prop_assert_eq!(target.data_reference, format!("{}.xml", file));
            prop_assert_eq!(target.selector, selector);
        }

        /// Property: the xpath selector always starts with the separator
        #[test]
        fn parse_reference_xpath_selector_has_leading_slash(
            file in "[a-z]{1,8}\\.xml",
            suffix in "[a-z/\\[\\]@=']{0,20}",
        ) {
            let target = parse_reference(&format!("{}/{}", file, suffix));
            prop_assert_eq!(target.selector_type, SelectorType::Xpath);
            prop_assert!(target.selector.starts_with('/'));
            prop_assert_eq!(target.data_reference, file);
        }

        /// Property: id references without the `.xml` suffix are malformed
        #[test]
        fn parse_reference_requires_xml_suffix(
            file in "[a-z]{1,8}",
            selector in "[a-z0-9]{1,8}",
        ) {
            let target = parse_reference(&format!("{}#{}", file, selector));
            prop_assert!(target.is_malformed());
            prop_assert!(target.data_reference.is_empty());
            prop_assert!(target.selector.is_empty());
        }

        /// Property: malformed descriptors never carry half a target
        #[test]
        fn parse_reference_malformed_is_fully_empty(input in "[^#/]*") {
            let target = parse_reference(&input);
            prop_assert!(target.data_reference.is_empty());
            prop_assert!(target.selector.is_empty());
        }
    }

    // ============================================================================
    // xpath_literal property tests
    // ============================================================================

    proptest! {
        /// Property: a literal without quotes is wrapped in single quotes
        #[test]
        fn xpath_literal_plain_value(value in "[a-zA-Z0-9 _-]*") {
            prop_assert_eq!(xpath_literal(&value), format!("'{}'", value));
        }

        /// Property: mixed quotes are always emitted through concat()
        #[test]
        fn xpath_literal_mixed_quotes_use_concat(a in "[a-z]{0,5}", b in "[a-z]{0,5}") {
            let value = format!("{}'{}\"", a, b);
            prop_assert!(xpath_literal(&value).starts_with("concat("));
        }
    }
}
