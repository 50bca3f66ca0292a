use serde::{Deserialize, Serialize};

/// One result as returned by the places search API. Everything is optional
/// here, `validate` decides whether it can be stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidPlace {
    pub place_id: String,
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    MissingPlaceId,
    MissingName,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Validated {
    Accepted(ValidPlace),
    Rejected(Rejection),
}

impl PlaceRecord {
    pub fn new(place_id: &str, name: &str, types: &[&str]) -> Self {
        Self {
            place_id: Some(place_id.to_string()),
            name: Some(name.to_string()),
            types: types.iter().map(|x| x.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Validated {
        let place_id = match present(&self.place_id) {
            Some(x) => x,
            None => return Validated::Rejected(Rejection::MissingPlaceId),
        };
        let name = match present(&self.name) {
            Some(x) => x,
            None => return Validated::Rejected(Rejection::MissingName),
        };

        let mut types: Vec<String> = Vec::with_capacity(self.types.len());
        for x in &self.types {
            if !x.trim().is_empty() && !types.contains(x) {
                types.push(x.clone());
            }
        }

        Validated::Accepted(ValidPlace {
            place_id: place_id.to_string(),
            name: name.to_string(),
            types,
        })
    }
}

fn present(x: &Option<String>) -> Option<&str> {
    x.as_deref().filter(|x| !x.trim().is_empty())
}
