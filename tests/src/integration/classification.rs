//! # Classification Properties
//!
//! The classifier is a fixed table: repeated lookups agree, and names outside
//! the table are unsupported rather than defaulting to a category.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_types::codes;
    use wb_02_method_classifier::{MethodCategory, MethodClassifier};

    proptest! {
        #[test]
        fn classification_is_stable(index in 0usize..64, repeats in 1usize..8) {
            let classifier = MethodClassifier::standard();
            let methods: Vec<&'static str> = [
                MethodCategory::ReadOnly,
                MethodCategory::Simulation,
                MethodCategory::Write,
            ]
            .into_iter()
            .flat_map(|c| classifier.methods_in(c))
            .collect();
            let method = methods[index % methods.len()];

            let first = *classifier.classify(method).unwrap();
            for _ in 0..repeats {
                prop_assert_eq!(*classifier.classify(method).unwrap(), first);
            }
            prop_assert_eq!(first.category.requires_approval(), classifier.requires_approval(method));
        }

        #[test]
        fn unknown_methods_are_unsupported(name in "[a-z]{2,8}_[a-zA-Z]{2,16}") {
            let classifier = MethodClassifier::standard();
            prop_assume!(!classifier.is_supported(&name));

            let err = classifier.classify(&name).unwrap_err();
            prop_assert_eq!(err.code, codes::UNSUPPORTED_METHOD);
            prop_assert!(!classifier.requires_approval(&name));
            prop_assert!(!classifier.is_cacheable(&name));
        }
    }
}
