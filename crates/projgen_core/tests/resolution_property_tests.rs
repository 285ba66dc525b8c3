//! Property-based tests for scoped resolution, tagged-line removal and
//! configuration ordering.

use std::path::Path;

use proptest::prelude::*;
use projgen_core::{remove_tagged_lines, sort_and_validate, Configuration, Resolver, OMIT_TAG};

fn line_strategy() -> impl Strategy<Value = (String, bool)> {
    ("[a-zA-Z0-9 <>/=\"]{0,24}", any::<bool>())
}

/// Property: removing tagged lines keeps exactly the untagged lines, in order,
/// with their terminators.
#[test]
fn prop_tagged_lines_removed_in_order() {
    proptest!(|(
        lines in prop::collection::vec(line_strategy(), 0..40),
        crlf in any::<bool>()
    )| {
        let terminator = if crlf { "\r\n" } else { "\n" };

        let mut input = String::new();
        let mut expected = String::new();
        for (text, tagged) in &lines {
            if *tagged {
                input.push_str(&format!("{}{}{}", text, OMIT_TAG, terminator));
            } else {
                input.push_str(&format!("{}{}", text, terminator));
                expected.push_str(&format!("{}{}", text, terminator));
            }
        }

        prop_assert_eq!(remove_tagged_lines(&input), expected);
    });
}

/// Property: after any nesting of scopes unwinds, no binding survives, and
/// inside the nesting the innermost declaration wins.
#[test]
fn prop_nested_scopes_unwind() {
    proptest!(|(values in prop::collection::vec("[a-z]{1,8}", 1..12))| {
        let resolver = Resolver::new();

        fn nest(resolver: &Resolver, values: &[String]) -> Result<(), TestCaseError> {
            let Some((first, rest)) = values.split_first() else {
                return Ok(());
            };
            let _scope = resolver.declare("name", first.as_str());
            prop_assert_eq!(resolver.resolve("[name]").unwrap(), first.clone());
            nest(resolver, rest)?;
            prop_assert_eq!(resolver.resolve("[name]").unwrap(), first.clone());
            Ok(())
        }

        nest(&resolver, &values)?;
        prop_assert_eq!(resolver.active_bindings(), 0);
        prop_assert!(resolver.resolve("[name]").is_err());
    });
}

/// Property: the validated order depends only on (name, platform), never on
/// the declaration order.
#[test]
fn prop_configuration_order_is_deterministic() {
    let identity = ("(Debug|Release|Retail)", "(x64|x86|ARM64)");
    let identities = prop::collection::btree_set(identity, 1..9)
        .prop_flat_map(|set| Just(set.into_iter().collect::<Vec<_>>()).prop_shuffle());

    proptest!(|(shuffled in identities)| {
        let confs: Vec<Configuration> = shuffled
            .iter()
            .map(|(name, platform)| {
                Configuration::new("engine", name.as_str(), platform.as_str())
                    .project_file("/w/engine.vcxproj")
            })
            .collect();
        let refs: Vec<&Configuration> = confs.iter().collect();

        let sorted = sort_and_validate(Path::new("/w/engine.vcxproj"), &refs).unwrap();
        let ids: Vec<(String, String)> = sorted
            .iter()
            .map(|c| (c.name.clone(), c.platform.clone()))
            .collect();

        let mut expected = shuffled.clone();
        expected.sort();
        prop_assert_eq!(ids, expected);
    });
}
