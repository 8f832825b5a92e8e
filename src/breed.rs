use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One dataset entry describing a dog breed.
///
/// Only `name` is required; a record missing any other attribute still loads
/// with that attribute empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedRecord {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub breed_group: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub lifespan: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub temperament: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl BreedRecord {
    /// Labelled attribute rows shown on a breed card, in display order.
    pub fn card_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Breed Group", self.breed_group.clone()),
            ("Size", self.size.clone()),
            ("Lifespan", self.lifespan.clone()),
            ("Origin", self.origin.clone()),
            ("Colors", self.colors.join(", ")),
        ]
    }
}

/// The card shown before any search has been performed.
pub fn popular_breed() -> BreedRecord {
    BreedRecord {
        id: 0,
        name: "Labrador Retriever".to_string(),
        breed_group: "Sporting".to_string(),
        size: "Large".to_string(),
        lifespan: "10-14 years".to_string(),
        origin: "Canada".to_string(),
        temperament: "Outgoing, Even-tempered, Gentle".to_string(),
        colors: vec![
            "Yellow".to_string(),
            "Black".to_string(),
            "Chocolate".to_string(),
        ],
        description: "The Labrador Retriever is one of the most popular dog breeds in the world. \
They are known for their friendly and outgoing nature, as well as their intelligence and \
trainability. Labs make excellent family pets and are often used as service dogs and therapy dogs."
            .to_string(),
        image: "https://fakeimg.pl/500x500/cc6634".to_string(),
    }
}

/// Keep the first record for every distinct name (exact, case-sensitive),
/// preserving fetch order.
pub fn dedup_by_name(records: Vec<BreedRecord>) -> Vec<BreedRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.name.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) fn breed(id: u64, name: &str) -> BreedRecord {
    BreedRecord {
        id,
        name: name.to_string(),
        breed_group: format!("{name} group"),
        size: "Small".to_string(),
        lifespan: "12-15 years".to_string(),
        origin: "Somewhere".to_string(),
        temperament: "Playful".to_string(),
        colors: vec!["Fawn".to_string(), "Black".to_string()],
        description: format!("About the {name}."),
        image: format!("https://example.invalid/{id}.png"),
    }
}
