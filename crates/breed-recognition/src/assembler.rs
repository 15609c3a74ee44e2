/// Turns a classifier outcome into the final `RecognitionResult`.
///
/// Field defaults are applied here and nowhere else. A failed classifier call
/// becomes a `success=false` result carrying only the failure description.
use crate::catalog::Catalog;
use crate::error::RecognitionFailure;
use crate::model::{BreedSuggestion, ParsedFields, RecognitionResult};
use crate::parser;
use crate::resolver::{ResolvedBreed, Resolver};

const UNKNOWN_BREED: &str = "Unknown";
const UNKNOWN_ANIMAL_TYPE: &str = "unknown";
const DEFAULT_CONFIDENCE: &str = "Medium";
const DEFAULT_IMAGE_QUALITY: &str = "Good";

pub fn finish(catalog: &Catalog, outcome: Result<String, RecognitionFailure>) -> RecognitionResult {
    match outcome {
        Ok(reply) => interpret(catalog, &reply),
        Err(failure) => RecognitionResult::failed(failure.to_string()),
    }
}

/// Parse, resolve and assemble one classifier reply.
pub fn interpret(catalog: &Catalog, reply: &str) -> RecognitionResult {
    let parsed = parser::parse(reply);
    let resolver = Resolver::new(catalog);
    let category = parsed.animal_type.as_deref();

    let primary = present(&parsed.breed_name_raw).map(|raw| resolver.resolve(category, raw));
    let alternatives = resolver.alternatives(category, parsed.alternatives_raw.as_deref());

    assemble(parsed, primary, alternatives)
}

pub fn assemble(
    parsed: ParsedFields,
    primary: Option<ResolvedBreed>,
    alternatives: Vec<BreedSuggestion>,
) -> RecognitionResult {
    let (breed, breed_info) = match primary {
        Some(resolved) => (Some(resolved.name), resolved.record),
        None => (None, None),
    };

    RecognitionResult {
        success: true,
        breed: Some(or_default(breed, UNKNOWN_BREED)),
        animal_type: Some(or_default(parsed.animal_type, UNKNOWN_ANIMAL_TYPE)),
        confidence: Some(or_default(parsed.confidence, DEFAULT_CONFIDENCE)),
        breed_info,
        alternative_breeds: (!alternatives.is_empty()).then_some(alternatives),
        image_quality: Some(or_default(parsed.image_quality, DEFAULT_IMAGE_QUALITY)),
        reasoning: parsed.reasoning.filter(|r| !r.is_empty()),
        error: None,
    }
}

// A label with nothing after it counts as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use breed_common::vision::ClassifierError;

    #[test]
    fn well_formed_reply_resolves_primary_breed() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "Animal Type: cattle\nPrimary Breed: Gir\nConfidence: High\n");
        assert!(result.success);
        assert_eq!(result.breed.as_deref(), Some("Gir"));
        assert_eq!(result.animal_type.as_deref(), Some("cattle"));
        assert_eq!(result.confidence.as_deref(), Some("High"));
        let gir = catalog.lookup(crate::model::AnimalCategory::Cattle, "gir").cloned();
        assert_eq!(result.breed_info, gir);
        assert!(result.alternative_breeds.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn fallback_breed_label_resolves_by_substring() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "Animal Type: cattle\nBreed: red sindhi cross\n");
        assert_eq!(result.breed.as_deref(), Some("Red Sindhi"));
        assert_eq!(result.breed_info.unwrap().name, "Red Sindhi");
    }

    #[test]
    fn unlabeled_reply_falls_back_to_defaults() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "I cannot tell what this animal is.");
        assert!(result.success);
        assert_eq!(result.breed.as_deref(), Some("Unknown"));
        assert_eq!(result.animal_type.as_deref(), Some("unknown"));
        assert_eq!(result.confidence.as_deref(), Some("Medium"));
        assert_eq!(result.image_quality.as_deref(), Some("Good"));
        assert!(result.breed_info.is_none());
        assert!(result.alternative_breeds.is_none());
        assert!(result.reasoning.is_none());
    }

    #[test]
    fn unresolved_breed_keeps_raw_text() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "Animal Type: cattle\nPrimary Breed: Jersey\n");
        assert_eq!(result.breed.as_deref(), Some("Jersey"));
        assert!(result.breed_info.is_none());
    }

    #[test]
    fn empty_breed_value_counts_as_unknown() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "Animal Type: buffalo\nPrimary Breed:\n");
        assert_eq!(result.breed.as_deref(), Some("Unknown"));
        assert!(result.breed_info.is_none());
    }

    #[test]
    fn unknown_animal_type_is_reported_verbatim_without_lookup() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(&catalog, "Animal Type: Yak\nPrimary Breed: Gir\n");
        assert_eq!(result.animal_type.as_deref(), Some("yak"));
        assert_eq!(result.breed.as_deref(), Some("Gir"));
        assert!(result.breed_info.is_none());
    }

    #[test]
    fn alternatives_are_attached_when_any_resolve() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(
            &catalog,
            "Animal Type: buffalo\nPrimary Breed: Mehsana\nAlternative Possibilities: Murrah, Jaffarabadi, something unrelated\n",
        );
        let alternatives = result.alternative_breeds.unwrap();
        let names: Vec<&str> = alternatives.iter().map(|s| s.breed.as_str()).collect();
        assert_eq!(names, ["Murrah", "Jaffarabadi"]);
    }

    #[test]
    fn unresolvable_alternatives_leave_the_field_unset() {
        let catalog = Catalog::indian_breeds();
        for alternatives in ["None", "n/a", "Holstein, Jersey"] {
            let reply = format!("Animal Type: cattle\nPrimary Breed: Gir\nAlternative Possibilities: {alternatives}\n");
            let result = interpret(&catalog, &reply);
            assert!(result.alternative_breeds.is_none(), "{alternatives}");
        }
    }

    #[test]
    fn reasoning_and_image_quality_are_carried_through() {
        let catalog = Catalog::indian_breeds();
        let result = interpret(
            &catalog,
            "Image Quality: Poor\nAnimal Type: cattle\nPrimary Breed: Gir\nReasoning: Domed forehead\n",
        );
        assert_eq!(result.image_quality.as_deref(), Some("Poor"));
        assert_eq!(result.reasoning.as_deref(), Some("Domed forehead"));
    }

    #[test]
    fn classifier_failure_yields_failed_result() {
        let catalog = Catalog::indian_breeds();
        let result = finish(
            &catalog,
            Err(RecognitionFailure::Classifier(ClassifierError::EmptyCompletion)),
        );
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("classifier error: classifier returned no completion text")
        );
        assert!(result.breed.is_none());
        assert!(result.animal_type.is_none());
        assert!(result.confidence.is_none());
        assert!(result.breed_info.is_none());
        assert!(result.alternative_breeds.is_none());
        assert!(result.image_quality.is_none());
    }

    #[test]
    fn successful_outcome_is_interpreted() {
        let catalog = Catalog::indian_breeds();
        let result = finish(&catalog, Ok("Animal Type: buffalo\nPrimary Breed: Murrah\n".to_string()));
        assert!(result.success);
        assert_eq!(result.breed.as_deref(), Some("Murrah"));
    }
}
