//! Merge semantics for entity records
//!
//! Records describing the same crop are combined with a single rule set:
//!
//! - **Scalars**: the first non-empty value wins, later values never overwrite it
//! - **Lists**: ordered set union, duplicates removed by value equality, first
//!   occurrence keeps its position
//! - **Groups**: merged field by field with the same rules
//!
//! These rules make merging idempotent and associative, so records can be
//! combined in any grouping without changing the result.

/// Combine another value into `self`
pub trait Merge {
    /// Merge `other` into `self` following first-wins / union semantics
    fn merge_from(&mut self, other: &Self);
}

impl Merge for String {
    fn merge_from(&mut self, other: &Self) {
        if self.trim().is_empty() && !other.trim().is_empty() {
            self.clone_from(other);
        }
    }
}

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge_from(&mut self, other: &Self) {
        match (self.as_mut(), other) {
            (_, None) => {}
            (None, Some(theirs)) => *self = Some(theirs.clone()),
            (Some(ours), Some(theirs)) => ours.merge_from(theirs),
        }
    }
}

impl<T: PartialEq + Clone> Merge for Vec<T> {
    fn merge_from(&mut self, other: &Self) {
        for item in other {
            if !self.contains(item) {
                self.push(item.clone());
            }
        }
    }
}

/// Normalize an entity name into its lookup key
///
/// # Examples
///
/// ```
/// use cropwise_domain::normalize_key;
///
/// assert_eq!(normalize_key("  Rice "), "rice");
/// assert_eq!(normalize_key("WHEAT"), normalize_key("wheat"));
/// ```
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityRecord, NutrientRate, PestDisease};
    use proptest::prelude::*;

    fn opt_text() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z]{1,6}")
    }

    fn record() -> impl Strategy<Value = EntityRecord> {
        (
            "[A-Za-z]{1,8}",
            opt_text(),
            opt_text(),
            prop::collection::vec("[a-d]", 0..4),
            prop::collection::vec("[a-d]", 0..4),
            opt_text(),
            opt_text(),
        )
            .prop_map(|(name, sci, ph, practices, pests, n_rate, season)| {
                let mut r = EntityRecord::new(name);
                r.scientific_name = sci;
                r.soil_requirements.ph_range = ph;
                let mut seen = Vec::new();
                for p in practices {
                    if !seen.contains(&p) {
                        seen.push(p);
                    }
                }
                r.farming_practices = seen;
                for p in pests {
                    let item = PestDisease {
                        name: Some(p),
                        ..PestDisease::default()
                    };
                    if !r.pests_diseases.contains(&item) {
                        r.pests_diseases.push(item);
                    }
                }
                r.nutrients.nitrogen = n_rate.map(|rate| NutrientRate {
                    rate: Some(rate),
                    ..NutrientRate::default()
                });
                r.planting_info.season = season;
                r
            })
    }

    fn merged(a: &EntityRecord, b: &EntityRecord) -> EntityRecord {
        let mut out = a.clone();
        out.merge_from(b);
        out
    }

    #[test]
    fn test_scalar_first_wins() {
        let mut a = EntityRecord::new("Rice");
        a.soil_requirements.ph_range = Some("6-7".to_string());
        let mut b = EntityRecord::new("rice");
        b.soil_requirements.ph_range = Some("5-6".to_string());
        b.soil_requirements.drainage = Some("good".to_string());

        a.merge_from(&b);
        assert_eq!(a.name, "Rice");
        assert_eq!(a.soil_requirements.ph_range.as_deref(), Some("6-7"));
        assert_eq!(a.soil_requirements.drainage.as_deref(), Some("good"));
    }

    #[test]
    fn test_list_union_keeps_first_position() {
        let mut a = vec!["x".to_string(), "y".to_string()];
        a.merge_from(&vec!["z".to_string(), "x".to_string()]);
        assert_eq!(a, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_nested_option_merges_recursively() {
        let mut a = Some(NutrientRate {
            rate: Some("100 kg/ha".to_string()),
            ..NutrientRate::default()
        });
        let b = Some(NutrientRate {
            rate: Some("80 kg/ha".to_string()),
            timing: Some("at sowing".to_string()),
            notes: None,
        });
        a.merge_from(&b);
        let a = a.unwrap();
        assert_eq!(a.rate.as_deref(), Some("100 kg/ha"));
        assert_eq!(a.timing.as_deref(), Some("at sowing"));
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(a in record()) {
            prop_assert_eq!(merged(&a, &a), a);
        }

        #[test]
        fn prop_merge_is_associative(a in record(), b in record(), c in record()) {
            let left = merged(&merged(&a, &b), &c);
            let right = merged(&a, &merged(&b, &c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_present_scalar_is_never_overwritten(a in record(), b in record()) {
            let m = merged(&a, &b);
            if a.scientific_name.is_some() {
                prop_assert_eq!(m.scientific_name, a.scientific_name);
            } else {
                prop_assert_eq!(m.scientific_name, b.scientific_name);
            }
        }

        #[test]
        fn prop_list_union_size(a in record(), b in record()) {
            let m = merged(&a, &b);
            let extra = b
                .farming_practices
                .iter()
                .filter(|p| !a.farming_practices.contains(p))
                .count();
            prop_assert_eq!(m.farming_practices.len(), a.farming_practices.len() + extra);
        }
    }
}
