/// Instruction text for the vision classifier.
///
/// The reply layout mandated here is the contract the parser relies on: one
/// `Label: value` per line, using exactly the label strings below.
use std::fmt::Write;

use crate::catalog::Catalog;
use crate::model::AnimalCategory;

pub const IMAGE_QUALITY: &str = "Image Quality:";
pub const ANIMAL_TYPE: &str = "Animal Type:";
pub const PRIMARY_BREED: &str = "Primary Breed:";
pub const BREED: &str = "Breed:";
pub const CONFIDENCE: &str = "Confidence:";
pub const REASONING: &str = "Reasoning:";
pub const ALTERNATIVE_POSSIBILITIES: &str = "Alternative Possibilities:";
pub const ALTERNATIVE_BREEDS: &str = "Alternative Breeds:";

const NOT_APPLICABLE: &str = "N/A";

/// Build the system instruction listing every catalog breed with its
/// distinguishing attributes. Deterministic for a given catalog.
pub fn build(catalog: &Catalog) -> String {
    let mut out = String::from(
        "You are an expert livestock veterinarian specializing in Indian cattle and buffalo breeds.\n\
Your task is to analyze the image and identify the breed accurately.\n\
Only ever name breeds from the reference list below.\n\n\
REFERENCE BREEDS\n",
    );

    for category in AnimalCategory::ALL {
        let _ = writeln!(out, "\n{}:", category.as_str().to_uppercase());
        for entry in catalog.entries(category) {
            let breed = &entry.record;
            let _ = writeln!(
                out,
                "- {}: color: {}; horn shape: {}; size: {}; traits: {}",
                breed.name,
                breed.color,
                breed.horn_shape.as_deref().unwrap_or(NOT_APPLICABLE),
                breed.size.as_deref().unwrap_or(NOT_APPLICABLE),
                breed.traits,
            );
        }
    }

    let categories = AnimalCategory::ALL.map(AnimalCategory::as_str).join(" or ");
    let _ = write!(
        out,
        "\nCompare the animal's coat color, horn shape, body size and other visible traits \
against the reference attributes.\n\n\
Respond in exactly this format, one label per line, with no other text:\n\
{IMAGE_QUALITY} [Good/Fair/Poor]\n\
{ANIMAL_TYPE} [{categories}]\n\
{PRIMARY_BREED} [exact breed name from the reference list]\n\
{CONFIDENCE} [High/Medium/Low]\n\
{REASONING} [brief explanation citing color, horn shape, size and traits]\n\
{ALTERNATIVE_POSSIBILITIES} [up to 3 comma-separated breed names from the reference list, or None]\n\n\
If it is a cross-breed, give the dominant parent breed as the primary breed and list the other parent \
breeds as alternative possibilities.\n\
If the image quality is poor or the animal is not clearly visible, say so in {IMAGE_QUALITY} \
and use Low confidence.\n"
    );
    out
}

/// The user turn that accompanies the image. A known category hint is passed on
/// as context; anything else is ignored.
pub fn user_prompt(hint: Option<&str>) -> String {
    let mut prompt = String::from(
        "Please analyze this image and identify the breed of this animal. Provide the image quality, \
animal type, primary breed, confidence level, reasoning and alternative possibilities.",
    );
    if let Some(category) = hint.and_then(AnimalCategory::parse) {
        let _ = write!(prompt, " The submitter believes this animal is {}.", article(category));
    }
    prompt
}

fn article(category: AnimalCategory) -> &'static str {
    match category {
        AnimalCategory::Cattle => "cattle",
        AnimalCategory::Buffalo => "a buffalo",
    }
}
