/// Resolve raw breed names from the classifier to catalog breeds.
use crate::catalog::Catalog;
use crate::model::{AnimalCategory, BreedRecord, BreedSuggestion};

const MAX_ALTERNATIVES: usize = 3;
const MIN_ALTERNATIVE_LEN: usize = 3;
const ALTERNATIVE_CONFIDENCE: &str = "Low to Medium";
const NO_ALTERNATIVES: [&str; 3] = ["none", "n/a", "not applicable"];

/// Outcome of resolving the primary breed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBreed {
    /// Canonical name on a match, the raw text otherwise.
    pub name: String,
    pub record: Option<BreedRecord>,
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Resolve the primary breed. Without a known category no lookup happens
    /// and the raw name passes through.
    pub fn resolve(&self, category: Option<&str>, breed_name_raw: &str) -> ResolvedBreed {
        let record = category
            .and_then(AnimalCategory::parse)
            .and_then(|c| self.catalog.lookup(c, breed_name_raw))
            .cloned();
        match record {
            Some(record) => ResolvedBreed {
                name: record.name.clone(),
                record: Some(record),
            },
            None => ResolvedBreed {
                name: breed_name_raw.to_string(),
                record: None,
            },
        }
    }

    /// Resolve the comma-delimited alternatives. Only the first three segments
    /// are considered; segments that are too short or match no breed are dropped.
    pub fn alternatives(
        &self,
        category: Option<&str>,
        alternatives_raw: Option<&str>,
    ) -> Vec<BreedSuggestion> {
        let Some(raw) = alternatives_raw.map(str::trim) else {
            return Vec::new();
        };
        if NO_ALTERNATIVES.iter().any(|none| raw.eq_ignore_ascii_case(none)) {
            return Vec::new();
        }
        let Some(category) = category.and_then(AnimalCategory::parse) else {
            return Vec::new();
        };

        raw.split(',')
            .take(MAX_ALTERNATIVES)
            .map(str::trim)
            .filter(|segment| segment.chars().count() >= MIN_ALTERNATIVE_LEN)
            .filter_map(|segment| {
                let record = self.catalog.lookup_loose(category, segment)?;
                Some(BreedSuggestion {
                    breed: record.name.clone(),
                    confidence: ALTERNATIVE_CONFIDENCE.to_string(),
                    reasoning: segment.to_string(),
                    breed_info: Some(record.clone()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_catalog;

    #[test]
    fn resolves_to_canonical_name_with_record() {
        let catalog = Catalog::indian_breeds();
        let resolved = Resolver::new(&catalog).resolve(Some("cattle"), "red sindhi cross");
        assert_eq!(resolved.name, "Red Sindhi");
        assert_eq!(resolved.record.unwrap().origin, "Sindh, Pakistan");
    }

    #[test]
    fn unmatched_name_passes_through() {
        let catalog = Catalog::indian_breeds();
        let resolved = Resolver::new(&catalog).resolve(Some("cattle"), "Holstein Friesian");
        assert_eq!(resolved.name, "Holstein Friesian");
        assert!(resolved.record.is_none());
    }

    #[test]
    fn unknown_or_missing_category_skips_lookup() {
        let catalog = Catalog::indian_breeds();
        let resolver = Resolver::new(&catalog);
        for category in [None, Some("goat"), Some("cattle or buffalo")] {
            let resolved = resolver.resolve(category, "gir");
            assert_eq!(resolved.name, "gir");
            assert!(resolved.record.is_none());
        }
    }

    #[test]
    fn alternatives_resolve_and_drop_unknown_segments() {
        let catalog = Catalog::indian_breeds();
        let suggestions = Resolver::new(&catalog).alternatives(
            Some("buffalo"),
            Some("Murrah, Jaffarabadi, something unrelated"),
        );
        let names: Vec<&str> = suggestions.iter().map(|s| s.breed.as_str()).collect();
        assert_eq!(names, ["Murrah", "Jaffarabadi"]);
        assert!(suggestions.iter().all(|s| s.confidence == "Low to Medium"));
        assert_eq!(suggestions[1].reasoning, "Jaffarabadi");
        assert!(suggestions[0].breed_info.is_some());
    }

    #[test]
    fn reasoning_keeps_the_original_segment_text() {
        let catalog = Catalog::indian_breeds();
        let suggestions =
            Resolver::new(&catalog).alternatives(Some("cattle"), Some("  possibly SAHIWAL blood "));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].breed, "Sahiwal");
        assert_eq!(suggestions[0].reasoning, "possibly SAHIWAL blood");
    }

    #[test]
    fn only_the_first_three_segments_count() {
        let catalog = Catalog::indian_breeds();
        let suggestions = Resolver::new(&catalog).alternatives(
            Some("cattle"),
            Some("Gir, Sahiwal, Tharparkar, Rathi, Kankrej"),
        );
        let names: Vec<&str> = suggestions.iter().map(|s| s.breed.as_str()).collect();
        assert_eq!(names, ["Gir", "Sahiwal", "Tharparkar"]);
    }

    #[test]
    fn cap_applies_before_filtering() {
        let catalog = Catalog::indian_breeds();
        // the empty and short segments use up slots; Rathi is the fourth segment
        let suggestions =
            Resolver::new(&catalog).alternatives(Some("cattle"), Some("Gir, , xy, Rathi"));
        let names: Vec<&str> = suggestions.iter().map(|s| s.breed.as_str()).collect();
        assert_eq!(names, ["Gir"]);
    }

    #[test]
    fn none_markers_produce_no_alternatives() {
        let catalog = Catalog::indian_breeds();
        let resolver = Resolver::new(&catalog);
        for raw in [None, Some("None"), Some("n/a"), Some("N/A"), Some(" Not Applicable ")] {
            assert!(resolver.alternatives(Some("cattle"), raw).is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn alternatives_need_a_known_category() {
        let catalog = Catalog::indian_breeds();
        let resolver = Resolver::new(&catalog);
        assert!(resolver.alternatives(None, Some("Gir, Sahiwal")).is_empty());
        assert!(resolver.alternatives(Some("yak"), Some("Gir, Sahiwal")).is_empty());
    }

    #[test]
    fn alternatives_match_display_names_too() {
        let catalog = test_catalog();
        let suggestions =
            Resolver::new(&catalog).alternatives(Some("cattle"), Some("Red Sindhi, Gir"));
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].breed, "Red Sindhi");
    }
}
