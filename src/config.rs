use crate::continuity::{ArterialMatcher, HIGHWAY_KEYWORDS};
use crate::error::ConfigError;
use crate::grid::CellSize;
use crate::naming::NamingRules;
use crate::stitch::EndpointTolerance;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run configuration as written by a person, either in a RON file or
/// assembled from CLI flags. Turned into a [`RunConfig`] by [`ClusterConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Grid cell side, in metres (converted at 111 km per degree).
    pub cell_size_m: f64,
    /// `highway` (Highway/Freeway/Motorway), `none`, or `custom`.
    pub arterial_keyword_set: String,
    /// Added to the preset; the only keywords when the preset is `custom`.
    pub arterial_keywords: Vec<String>,
    pub arterial_case_sensitive: bool,
    /// 0 means exact coordinate equality.
    pub endpoint_tolerance_m: f64,
    pub endpoint_stitching: bool,
    pub ordinal_start: u32,
    pub city: String,
    pub id_separator: String,
    pub ordinal_width: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cell_size_m: 200.0,
            arterial_keyword_set: "highway".to_string(),
            arterial_keywords: Vec::new(),
            arterial_case_sensitive: true,
            endpoint_tolerance_m: 0.0,
            endpoint_stitching: true,
            ordinal_start: 0,
            city: "sydney".to_string(),
            id_separator: "-".to_string(),
            ordinal_width: 3,
        }
    }
}

/// Checked configuration the pipeline actually runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub cell: CellSize,
    pub arterial: ArterialMatcher,
    pub endpoint_tolerance: EndpointTolerance,
    pub endpoint_stitching: bool,
    pub naming: NamingRules,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cell: CellSize::DEFAULT,
            arterial: ArterialMatcher::highways(),
            endpoint_tolerance: EndpointTolerance::Exact,
            endpoint_stitching: true,
            naming: NamingRules::default(),
        }
    }
}

impl ClusterConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn from_ron_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&contents)
    }

    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let cell = CellSize::from_metres(self.cell_size_m)?;

        let endpoint_tolerance = if self.endpoint_tolerance_m == 0.0 {
            EndpointTolerance::Exact
        } else if self.endpoint_tolerance_m.is_finite() && self.endpoint_tolerance_m > 0.0 {
            EndpointTolerance::Metres(self.endpoint_tolerance_m)
        } else {
            return Err(ConfigError::InvalidTolerance(self.endpoint_tolerance_m));
        };

        let mut keywords: Vec<String> = match self.arterial_keyword_set.trim().to_lowercase().as_str() {
            "highway" | "default" => HIGHWAY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            "none" => Vec::new(),
            "custom" => {
                if self.arterial_keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(ConfigError::EmptyCustomKeywords);
                }
                Vec::new()
            }
            _ => {
                return Err(ConfigError::UnknownKeywordSet(
                    self.arterial_keyword_set.clone(),
                ));
            }
        };
        if self.arterial_keyword_set.trim().to_lowercase() != "none" {
            keywords.extend(self.arterial_keywords.iter().cloned());
        }

        let naming = NamingRules::new(
            &self.city,
            &self.id_separator,
            self.ordinal_start,
            self.ordinal_width,
        )?;

        Ok(RunConfig {
            cell,
            arterial: ArterialMatcher::new(keywords.as_slice(), self.arterial_case_sensitive),
            endpoint_tolerance,
            endpoint_stitching: self.endpoint_stitching,
            naming,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let run = ClusterConfig::default().validate().unwrap();
        assert!((run.cell.metres() - 200.0).abs() < 1e-9);
        assert_eq!(run.endpoint_tolerance, EndpointTolerance::Exact);
        assert!(run.arterial.is_arterial("Princes Highway"));
        assert_eq!(run.naming.city(), "sydney");
    }

    #[test]
    fn test_bad_cell_size_is_fatal() {
        let config = ClusterConfig {
            cell_size_m: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCellSize(0.0)));

        let config = ClusterConfig {
            cell_size_m: -5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_vanishing_cell_size_is_fatal() {
        let config = ClusterConfig {
            cell_size_m: 1e-12,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCellSize(1e-12)));
    }

    #[test]
    fn test_unknown_keyword_set_is_fatal() {
        let config = ClusterConfig {
            arterial_keyword_set: "autobahn".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownKeywordSet("autobahn".to_string()))
        );
    }

    #[test]
    fn test_custom_keywords() {
        let config = ClusterConfig {
            arterial_keyword_set: "custom".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyCustomKeywords));

        let config = ClusterConfig {
            arterial_keyword_set: "custom".to_string(),
            arterial_keywords: vec!["Tollway".to_string()],
            ..Default::default()
        };
        let run = config.validate().unwrap();
        assert!(run.arterial.is_arterial("Westlink Tollway"));
        assert!(!run.arterial.is_arterial("Princes Highway"));
    }

    #[test]
    fn test_negative_tolerance_is_fatal() {
        let config = ClusterConfig {
            endpoint_tolerance_m: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTolerance(-1.0)));
    }

    #[test]
    fn test_ron_round_trip_of_partial_file() {
        let config = ClusterConfig::from_ron_str(
            r#"(cell_size_m: 100.0, city: "Melbourne", endpoint_tolerance_m: 0.5)"#,
        )
        .unwrap();
        assert_eq!(config.cell_size_m, 100.0);
        assert_eq!(config.city, "Melbourne");
        assert_eq!(config.arterial_keyword_set, "highway");

        let run = config.validate().unwrap();
        assert_eq!(run.endpoint_tolerance, EndpointTolerance::Metres(0.5));
        assert_eq!(run.naming.city(), "melbourne");
    }

    #[test]
    fn test_ron_parse_error() {
        assert!(matches!(
            ClusterConfig::from_ron_str("(cell_size_m: \"big\")"),
            Err(ConfigError::Parse(_))
        ));
    }
}
