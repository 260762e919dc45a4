//! Region and transport mode vocabularies
//!
//! Both serialize to the upper-case identifiers persisted in the decision log
//! (`"APAC"`, `"ROAD_RAIL"`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logistics region derived from the supplier country
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Apac,
    Emea,
    Amer,
    Unknown,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Apac, Region::Emea, Region::Amer, Region::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Apac => "APAC",
            Region::Emea => "EMEA",
            Region::Amer => "AMER",
            Region::Unknown => "UNKNOWN",
        }
    }

    /// Parse a region identifier, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport mode used for primary and secondary routing legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    Sea,
    Air,
    RoadRail,
    Road,
    Rail,
}

impl TransportMode {
    pub const ALL: [TransportMode; 5] = [
        TransportMode::Sea,
        TransportMode::Air,
        TransportMode::RoadRail,
        TransportMode::Road,
        TransportMode::Rail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Sea => "SEA",
            TransportMode::Air => "AIR",
            TransportMode::RoadRail => "ROAD_RAIL",
            TransportMode::Road => "ROAD",
            TransportMode::Rail => "RAIL",
        }
    }

    /// Parse a transport identifier, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Region::Apac).unwrap(), "\"APAC\"");
        assert_eq!(
            serde_json::to_string(&Region::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
        let region: Region = serde_json::from_str("\"EMEA\"").unwrap();
        assert_eq!(region, Region::Emea);
    }

    #[test]
    fn test_transport_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&TransportMode::RoadRail).unwrap(),
            "\"ROAD_RAIL\""
        );
        let mode: TransportMode = serde_json::from_str("\"AIR\"").unwrap();
        assert_eq!(mode, TransportMode::Air);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Region::parse("apac"), Some(Region::Apac));
        assert_eq!(Region::parse(" Amer "), Some(Region::Amer));
        assert_eq!(Region::parse("LATAM"), None);
        assert_eq!(TransportMode::parse("road_rail"), Some(TransportMode::RoadRail));
        assert_eq!(TransportMode::parse("truck"), None);
    }

    #[test]
    fn test_display_matches_wire_format() {
        for region in Region::ALL {
            let wire = serde_json::to_string(&region).unwrap();
            assert_eq!(wire, format!("\"{region}\""));
        }
        for mode in TransportMode::ALL {
            let wire = serde_json::to_string(&mode).unwrap();
            assert_eq!(wire, format!("\"{mode}\""));
        }
    }
}
