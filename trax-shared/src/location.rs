use serde::{Deserialize, Serialize};

/// A geocoded scan location as reported by a carrier. Carriers frequently
/// omit individual fields, so everything is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Location {
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub timezone: Option<String>,
}

/// A deliverable street address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    /// Collapse an address into the loose scan-location shape.
    pub fn to_location(&self) -> Location {
        Location {
            city: Some(self.city.clone()),
            state: Some(self.state.clone()),
            zip: Some(self.zip.clone()),
            lat: None,
            lng: None,
            timezone: None,
        }
    }
}
