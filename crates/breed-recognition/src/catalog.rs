/// Read-only breed reference table, per animal category.
///
/// Entries keep the order they were listed in. That order is what `describe`
/// returns and what breaks ties between equally long matches.
///
/// Matching is a boolean substring test on normalized text (lower-cased, all
/// whitespace removed), in either direction. When several keys match, the
/// longest normalized key wins, so "red sindhi" beats a shorter key that
/// happens to be contained in the same raw text.
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::model::{AnimalCategory, BreedListing, BreedRecord};

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Lower-case lookup key, e.g. "red sindhi".
    pub key: String,
    pub record: BreedRecord,
    normalized_key: String,
    normalized_name: String,
}

impl CatalogEntry {
    fn new(key: &str, record: BreedRecord) -> Self {
        let key = key.trim().to_lowercase();
        Self {
            normalized_key: normalize(&key),
            normalized_name: normalize(&record.name),
            key,
            record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: HashMap<AnimalCategory, Vec<CatalogEntry>>,
}

impl Catalog {
    /// Build a catalog from `(category, [(key, record)])` groups.
    ///
    /// Fails on an empty key or name, or a key repeated within a category.
    pub fn new(
        groups: impl IntoIterator<Item = (AnimalCategory, Vec<(String, BreedRecord)>)>,
    ) -> Result<Self, AppError> {
        let mut entries: HashMap<AnimalCategory, Vec<CatalogEntry>> = HashMap::new();
        for (category, breeds) in groups {
            let bucket = entries.entry(category).or_default();
            for (key, record) in breeds {
                let entry = CatalogEntry::new(&key, record);
                if entry.normalized_key.is_empty() || entry.normalized_name.is_empty() {
                    return Err(AppError::Catalog(format!(
                        "{category} entry has an empty key or name"
                    )));
                }
                if bucket.iter().any(|e| e.normalized_key == entry.normalized_key) {
                    return Err(AppError::Catalog(format!(
                        "duplicate {category} key: {}",
                        entry.key
                    )));
                }
                bucket.push(entry);
            }
        }
        Ok(Self { entries })
    }

    /// Parse a JSON catalog: `{"cattle": [..], "buffalo": [..]}` where each item is a
    /// breed record with an optional `key` (defaults to the lower-cased name).
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| AppError::Catalog(format!("invalid catalog JSON: {e}")))?;
        let group = |items: Vec<CatalogFileEntry>| {
            items
                .into_iter()
                .map(|item| {
                    let key = item.key.unwrap_or_else(|| item.record.name.to_lowercase());
                    (key, item.record)
                })
                .collect::<Vec<_>>()
        };
        Self::new([
            (AnimalCategory::Cattle, group(file.cattle)),
            (AnimalCategory::Buffalo, group(file.buffalo)),
        ])
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Entries of a category in catalog order.
    pub fn entries(&self, category: AnimalCategory) -> &[CatalogEntry] {
        self.entries.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Match `raw_name` against the lookup keys of `category`.
    pub fn lookup(&self, category: AnimalCategory, raw_name: &str) -> Option<&BreedRecord> {
        let raw = normalize(raw_name);
        if raw.is_empty() {
            return None;
        }
        best_match(self.entries(category), |entry| {
            substring_either_way(&raw, &entry.normalized_key).then_some(entry.normalized_key.len())
        })
    }

    /// Like [`Catalog::lookup`], but the canonical display name is tried as well.
    pub fn lookup_loose(&self, category: AnimalCategory, raw_name: &str) -> Option<&BreedRecord> {
        let raw = normalize(raw_name);
        if raw.is_empty() {
            return None;
        }
        best_match(self.entries(category), |entry| {
            [&entry.normalized_key, &entry.normalized_name]
                .into_iter()
                .filter(|candidate| substring_either_way(&raw, candidate))
                .map(|candidate| candidate.len())
                .max()
        })
    }

    pub fn describe(&self, category: AnimalCategory) -> Vec<BreedRecord> {
        self.entries(category)
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    pub fn listing(&self) -> BreedListing {
        BreedListing {
            cattle: self.describe(AnimalCategory::Cattle),
            buffalo: self.describe(AnimalCategory::Buffalo),
        }
    }

    /// The built-in table of Indian cattle and buffalo breeds.
    pub fn indian_breeds() -> Self {
        let mut entries = HashMap::new();
        entries.insert(AnimalCategory::Cattle, seed_entries(CATTLE));
        entries.insert(AnimalCategory::Buffalo, seed_entries(BUFFALO));
        Self { entries }
    }
}

/// Highest score wins; ties keep the earliest entry.
fn best_match<'a>(
    entries: &'a [CatalogEntry],
    score: impl Fn(&CatalogEntry) -> Option<usize>,
) -> Option<&'a BreedRecord> {
    let mut best: Option<(usize, &CatalogEntry)> = None;
    for entry in entries {
        if let Some(s) = score(entry) {
            if best.map_or(true, |(top, _)| s > top) {
                best = Some((s, entry));
            }
        }
    }
    best.map(|(_, entry)| &entry.record)
}

fn substring_either_way(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Lower-case and drop all whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    cattle: Vec<CatalogFileEntry>,
    #[serde(default)]
    buffalo: Vec<CatalogFileEntry>,
}

#[derive(Deserialize)]
struct CatalogFileEntry {
    key: Option<String>,
    #[serde(flatten)]
    record: BreedRecord,
}

struct BreedSeed {
    key: &'static str,
    name: &'static str,
    origin: &'static str,
    utility: &'static str,
    traits: &'static str,
    color: &'static str,
    horn_shape: Option<&'static str>,
    size: Option<&'static str>,
}

fn seed_entries(seeds: &[BreedSeed]) -> Vec<CatalogEntry> {
    seeds
        .iter()
        .map(|s| {
            CatalogEntry::new(
                s.key,
                BreedRecord {
                    name: s.name.to_string(),
                    origin: s.origin.to_string(),
                    utility: s.utility.to_string(),
                    traits: s.traits.to_string(),
                    color: s.color.to_string(),
                    horn_shape: s.horn_shape.map(str::to_string),
                    size: s.size.map(str::to_string),
                },
            )
        })
        .collect()
}

const CATTLE: &[BreedSeed] = &[
    BreedSeed {
        key: "gir",
        name: "Gir",
        origin: "Gujarat, India",
        utility: "Milk production (10-12 liters/day)",
        traits: "Distinctive forehead bulge, long pendulous ears",
        color: "Red and white or sometimes black and white",
        horn_shape: Some("Curved backward and outward, half-moon shaped"),
        size: Some("Medium to large"),
    },
    BreedSeed {
        key: "sahiwal",
        name: "Sahiwal",
        origin: "Punjab, Pakistan/India",
        utility: "High milk yield (8-10 liters/day)",
        traits: "Loose skin, drooping ears, reddish dun color",
        color: "Reddish dun to red",
        horn_shape: Some("Short and stumpy"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "red sindhi",
        name: "Red Sindhi",
        origin: "Sindh, Pakistan",
        utility: "Dual purpose - milk and draught",
        traits: "Compact body, red color, heat tolerant",
        color: "Red",
        horn_shape: Some("Thick at the base, short, curving outward"),
        size: Some("Small to medium"),
    },
    BreedSeed {
        key: "tharparkar",
        name: "Tharparkar",
        origin: "Rajasthan, India",
        utility: "Dual purpose - milk and draught",
        traits: "White or light grey, medium-sized",
        color: "White to light grey",
        horn_shape: Some("Medium length, lyre-shaped, curving upward"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "rathi",
        name: "Rathi",
        origin: "Rajasthan, India",
        utility: "Dual purpose breed",
        traits: "Medium-sized, adapted to arid conditions",
        color: "White with black or brown patches",
        horn_shape: Some("Short to medium, curving inward"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "kankrej",
        name: "Kankrej",
        origin: "Gujarat, India",
        utility: "Draught and milk production",
        traits: "Large, powerful, lyrate horns",
        color: "Silver grey to iron grey or steel black",
        horn_shape: Some("Large, lyre-shaped, curving outward and upward"),
        size: Some("Large"),
    },
    BreedSeed {
        key: "ongole",
        name: "Ongole",
        origin: "Andhra Pradesh, India",
        utility: "Draught and beef",
        traits: "Large size, white or grey color, prominent hump",
        color: "White or light grey",
        horn_shape: Some("Short and stumpy, growing outward and backward"),
        size: Some("Large"),
    },
    BreedSeed {
        key: "hariana",
        name: "Hariana",
        origin: "Haryana, India",
        utility: "Dual purpose - milk and draught",
        traits: "White or light grey, small horns",
        color: "White or light grey",
        horn_shape: Some("Small, curving upward and inward"),
        size: Some("Medium to large"),
    },
    BreedSeed {
        key: "kangayam",
        name: "Kangayam",
        origin: "Tamil Nadu, India",
        utility: "Draught and beef",
        traits: "Red color, compact body, powerful",
        color: "Red",
        horn_shape: Some("Long, curving outward and backward"),
        size: Some("Medium"),
    },
];

const BUFFALO: &[BreedSeed] = &[
    BreedSeed {
        key: "murrah",
        name: "Murrah",
        origin: "Haryana, India",
        utility: "High milk production (12-15 liters/day)",
        traits: "Jet black, tightly coiled horns, heavy body",
        color: "Jet black",
        horn_shape: Some("Short, tightly curled spiral"),
        size: Some("Large"),
    },
    BreedSeed {
        key: "mehsana",
        name: "Mehsana",
        origin: "Gujarat, India",
        utility: "High milk yield",
        traits: "Black coat, medium-sized, wall-eyed",
        color: "Black",
        horn_shape: Some("Sickle-shaped, less curved than Surti"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "jaffarabadi",
        name: "Jaffarabadi",
        origin: "Gujarat, India",
        utility: "Heavy milk production",
        traits: "Massive build, bulging forehead, drooping horns",
        color: "Black",
        horn_shape: Some("Heavy, drooping at the sides then curling upward"),
        size: Some("Very large"),
    },
    BreedSeed {
        key: "surti",
        name: "Surti",
        origin: "Gujarat, India",
        utility: "High butterfat content milk",
        traits: "Medium-sized, sickle-shaped horns",
        color: "Black or brown",
        horn_shape: Some("Flat, sickle-shaped"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "nagpuri",
        name: "Nagpuri",
        origin: "Maharashtra, India",
        utility: "Dual purpose - milk and draught",
        traits: "Copper colored, medium-sized",
        color: "Copper to black",
        horn_shape: Some("Long, flat, curving backward toward the shoulders"),
        size: Some("Medium"),
    },
    BreedSeed {
        key: "banni",
        name: "Banni",
        origin: "Gujarat, India",
        utility: "High milk production in harsh conditions",
        traits: "Adapted to arid regions, medium-sized",
        color: "Black or grey",
        horn_shape: Some("Double coiled, pointing upward"),
        size: Some("Medium"),
    },
];

/// Reduced catalog for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn test_catalog() -> Catalog {
    let record = |name: &str, horn: Option<&str>| BreedRecord {
        name: name.to_string(),
        origin: "Test origin".to_string(),
        utility: "Test utility".to_string(),
        traits: format!("{name} traits"),
        color: "Black".to_string(),
        horn_shape: horn.map(str::to_string),
        size: None,
    };
    Catalog::new([
        (
            AnimalCategory::Cattle,
            vec![
                ("gir".to_string(), record("Gir", Some("Curved"))),
                ("red sindhi".to_string(), record("Red Sindhi", None)),
            ],
        ),
        (
            AnimalCategory::Buffalo,
            vec![("murrah".to_string(), record("Murrah", Some("Coiled")))],
        ),
    ])
    .expect("valid test catalog")
}
