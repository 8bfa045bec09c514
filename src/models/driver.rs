use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// GeoJSON-style location as the driver directory reports it. Coordinates
/// are `[longitude, latitude]` and may be missing or malformed; callers
/// must validate before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverLocation {
    #[serde(default)]
    pub coordinates: Option<Vec<f64>>,
}

/// A driver record as returned by the driver directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub current_location: Option<DriverLocation>,
    #[serde(default)]
    pub current_location_text: Option<String>,
    pub is_available: bool,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn coordinates(&self) -> Option<&Vec<f64>> {
        self.current_location.as_ref()?.coordinates.as_ref()
    }

    /// Validated `[longitude, latitude]`; `None` when missing or malformed.
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_pair(self.coordinates()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDriversResponse {
    pub drivers: Vec<Driver>,
}

#[cfg(test)]
mod tests {
    use super::{Driver, DriverLocation};

    fn driver(coordinates: Option<Vec<f64>>) -> Driver {
        Driver {
            id: "d1".to_string(),
            first_name: "Nimal".to_string(),
            last_name: "Perera".to_string(),
            current_location: Some(DriverLocation { coordinates }),
            current_location_text: None,
            is_available: true,
        }
    }

    #[test]
    fn location_requires_a_two_element_pair() {
        assert!(driver(Some(vec![79.86, 6.93])).location().is_some());
        assert!(driver(Some(vec![79.86])).location().is_none());
        assert!(driver(Some(vec![])).location().is_none());
        assert!(driver(None).location().is_none());

        let mut no_location = driver(None);
        no_location.current_location = None;
        assert!(no_location.location().is_none());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let parsed: Driver = serde_json::from_value(serde_json::json!({
            "id": "d9",
            "firstName": "Kamala",
            "lastName": "Silva",
            "currentLocation": { "coordinates": [80.0, 7.0] },
            "isAvailable": true
        }))
        .unwrap();

        assert_eq!(parsed.full_name(), "Kamala Silva");
        assert_eq!(parsed.coordinates(), Some(&vec![80.0, 7.0]));
    }
}
