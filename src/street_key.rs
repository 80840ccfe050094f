use std::fmt;

/// Road type suffixes recognised at the end of a name, with the abbreviation
/// each one folds onto.
const ROAD_TYPES: &[(&str, &str)] = &[
    ("street", "street"),
    ("st", "street"),
    ("road", "road"),
    ("rd", "road"),
    ("avenue", "avenue"),
    ("ave", "avenue"),
    ("drive", "drive"),
    ("dr", "drive"),
    ("lane", "lane"),
    ("ln", "lane"),
    ("court", "court"),
    ("ct", "court"),
    ("place", "place"),
    ("pl", "place"),
    ("way", "way"),
    ("crescent", "crescent"),
    ("cres", "crescent"),
    ("terrace", "terrace"),
    ("tce", "terrace"),
    ("parade", "parade"),
    ("highway", "highway"),
    ("hwy", "highway"),
    ("close", "close"),
    ("boulevard", "boulevard"),
    ("bvd", "boulevard"),
    ("circuit", "circuit"),
    ("parkway", "parkway"),
];

/// Name split into a lower-cased base and a canonical road type, so that
/// "Victoria St" and "victoria street" select the same street.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreetKey {
    pub base: String,
    pub road_type: String,
}

impl StreetKey {
    pub fn parse(name: &str) -> Self {
        let lowered = name.trim().to_lowercase();
        let parts: Vec<&str> = lowered.split_whitespace().collect();

        if let Some((last, rest)) = parts.split_last() {
            let last = last.trim_end_matches('.');
            if let Some(&(_, canonical)) = ROAD_TYPES.iter().find(|(t, _)| *t == last) {
                return Self {
                    base: rest.join(" "),
                    road_type: canonical.to_string(),
                };
            }
        }

        // no recognised suffix: the whole name is the base
        Self {
            base: parts.join(" "),
            road_type: "street".to_string(),
        }
    }
}

impl fmt::Display for StreetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.road_type)
    }
}
