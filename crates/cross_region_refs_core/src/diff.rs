//! Set differences between before/after property maps.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Distinct values of `set`, in key order.
pub fn references(set: &BTreeMap<String, String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    set.values()
        .filter(|reference| seen.insert(reference.as_str()))
        .cloned()
        .collect()
}

/// Values of `left` that do not appear among the values of `right`.
///
/// Compares reference identifiers rather than names, so renaming an import
/// that still points at the same reference produces no difference.
pub fn reference_difference(
    left: &BTreeMap<String, String>,
    right: &BTreeMap<String, String>,
) -> Vec<String> {
    let excluded: BTreeSet<&str> = right.values().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    left.values()
        .filter(|reference| {
            !excluded.contains(reference.as_str()) && seen.insert(reference.as_str())
        })
        .cloned()
        .collect()
}

/// Entries of `left` whose key is absent from `right`.
pub fn keys_except(
    left: &BTreeMap<String, String>,
    right: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    left.iter()
        .filter(|(name, _)| !right.contains_key(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedValue {
    pub name: String,
    pub old_value: String,
    pub new_value: String,
}

impl fmt::Display for ChangedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.old_value, self.new_value)
    }
}

/// Keys present in both maps whose values differ.
pub fn changed_values(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> Vec<ChangedValue> {
    old.iter()
        .filter_map(|(name, old_value)| {
            new.get(name)
                .filter(|new_value| *new_value != old_value)
                .map(|new_value| ChangedValue {
                    name: name.clone(),
                    old_value: old_value.clone(),
                    new_value: new_value.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn reference_difference_compares_values_not_names() {
        let prior = set(&[("a", "r1"), ("b", "r2")]);
        let current = set(&[("renamed", "r1"), ("c", "r3")]);

        assert_eq!(reference_difference(&current, &prior), vec!["r3"]);
        assert_eq!(reference_difference(&prior, &current), vec!["r2"]);
    }

    #[test]
    fn reference_difference_deduplicates_shared_references() {
        let current = set(&[("a", "r1"), ("b", "r1"), ("c", "r2")]);

        assert_eq!(
            reference_difference(&current, &BTreeMap::new()),
            vec!["r1", "r2"]
        );
        assert_eq!(references(&current), vec!["r1", "r2"]);
    }

    #[test]
    fn keys_except_keeps_only_missing_names() {
        let old = set(&[("/cdk/exports/a", "1"), ("/cdk/exports/b", "2")]);
        let new = set(&[("/cdk/exports/b", "2"), ("/cdk/exports/c", "3")]);

        assert_eq!(keys_except(&old, &new), set(&[("/cdk/exports/a", "1")]));
        assert_eq!(keys_except(&new, &old), set(&[("/cdk/exports/c", "3")]));
    }

    #[test]
    fn changed_values_reports_old_and_new() {
        let old = set(&[("a", "1"), ("b", "2")]);
        let new = set(&[("a", "1"), ("b", "20"), ("c", "3")]);

        let changed = changed_values(&old, &new);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].to_string(), "b (2 -> 20)");
    }
}
