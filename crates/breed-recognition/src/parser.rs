/// Parser for the classifier's labeled reply.
///
/// The reply is expected in the layout the prompt mandates:
///
/// ```text
/// Image Quality: Good
/// Animal Type: cattle
/// Primary Breed: Gir
/// Confidence: High
/// Reasoning: Domed forehead, pendulous ears
/// Alternative Possibilities: Sahiwal, Red Sindhi
/// ```
///
/// Each line is tested against a fixed list of label substrings in priority
/// order; the first label found claims the line and the text after the line's
/// first `:` becomes the value. Later lines overwrite earlier ones. This is a
/// contract with the prompt, not a natural-language parser.
use crate::model::ParsedFields;
use crate::prompt::{
    ALTERNATIVE_BREEDS, ALTERNATIVE_POSSIBILITIES, ANIMAL_TYPE, BREED, CONFIDENCE, IMAGE_QUALITY,
    PRIMARY_BREED, REASONING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ImageQuality,
    AnimalType,
    Breed,
    Confidence,
    Alternatives,
    Reasoning,
}

const LABELS: [(&str, Field); 8] = [
    (IMAGE_QUALITY, Field::ImageQuality),
    (ANIMAL_TYPE, Field::AnimalType),
    (PRIMARY_BREED, Field::Breed),
    (BREED, Field::Breed),
    (CONFIDENCE, Field::Confidence),
    (ALTERNATIVE_POSSIBILITIES, Field::Alternatives),
    (ALTERNATIVE_BREEDS, Field::Alternatives),
    (REASONING, Field::Reasoning),
];

pub fn parse(raw_text: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();

    for line in raw_text.lines() {
        let Some(field) = match_label(line) else {
            continue;
        };
        let Some((_, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest.trim().to_string();

        match field {
            Field::ImageQuality => fields.image_quality = Some(value),
            Field::AnimalType => fields.animal_type = Some(value.to_lowercase()),
            Field::Breed => fields.breed_name_raw = Some(value),
            Field::Confidence => fields.confidence = Some(value),
            Field::Alternatives => fields.alternatives_raw = Some(value),
            Field::Reasoning => fields.reasoning = Some(value),
        }
    }

    fields
}

fn match_label(line: &str) -> Option<Field> {
    LABELS
        .iter()
        // "Alternative Breeds:" contains "Breed:", so the bare fallback must not claim it
        .find(|(label, _)| line.contains(label) && !(*label == BREED && line.contains(ALTERNATIVE_BREEDS)))
        .map(|(_, field)| *field)
}
