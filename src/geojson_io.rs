// GeoJSON adapter: road FeatureCollection in, annotated FeatureCollection and
// per-instance MultiLineStrings out.

use crate::error::LoadError;
use crate::pipeline::RunOutcome;
use crate::segment::{BBox, LonLat, Segment};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value, feature::Id};
use serde_json::{Map, json};
use std::path::Path;
use tracing::{debug, info, warn};

/// Property keys written onto annotated features.
pub const INSTANCE_ID_KEY: &str = "_instanceId";
pub const TOTAL_INSTANCES_KEY: &str = "_totalInstances";
pub const STREET_ID_KEY: &str = "_streetId";
pub const SPLIT_INSTANCES_KEY: &str = "_splitInstances";

/// A parsed road FeatureCollection and the segments extracted from it.
/// MultiLineString features yield one segment per part.
pub struct RoadDataset {
    pub collection: FeatureCollection,
    pub segments: Vec<Segment>,
    /// Feature index of every segment.
    pub feature_of_segment: Vec<usize>,
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn source_id(feature: &Feature, index: usize) -> String {
    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => ["@id", "osm_id", "id"]
            .iter()
            .find_map(|k| string_property(feature, k))
            .unwrap_or_else(|| index.to_string()),
    }
}

fn positions(line: &[Vec<f64>]) -> Vec<LonLat> {
    line.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

impl RoadDataset {
    pub fn from_collection(collection: FeatureCollection) -> Self {
        let mut segments = Vec::with_capacity(collection.features.len());
        let mut feature_of_segment = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.iter().enumerate() {
            let id = source_id(feature, index);
            let name = string_property(feature, "name");
            let category = string_property(feature, "highway");

            let parts: Vec<Vec<LonLat>> = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::LineString(line)) => vec![positions(line)],
                Some(Value::MultiLineString(lines)) => lines.iter().map(|l| positions(l.as_slice())).collect(),
                _ => {
                    debug!("Feature {} has no line geometry", id);
                    vec![Vec::new()]
                }
            };

            let multi = parts.len() > 1;
            for (part, coords) in parts.into_iter().enumerate() {
                segments.push(Segment {
                    source_id: if multi { format!("{id}#{part}") } else { id.clone() },
                    name: name.clone(),
                    category: category.clone(),
                    coords,
                });
                feature_of_segment.push(index);
            }
        }

        Self {
            collection,
            segments,
            feature_of_segment,
        }
    }

    pub fn from_geojson_str(s: &str) -> Result<Self, LoadError> {
        match s.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => Ok(Self::from_collection(collection)),
            _ => Err(LoadError::NotFeatureCollection),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        info!("Loading {}...", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_geojson_str(&contents)?;
        info!(
            "Loaded {} features ({} segments)",
            dataset.collection.features.len(),
            dataset.segments.len()
        );
        Ok(dataset)
    }

    /// Write instance properties onto the source features. A feature split
    /// into several segments takes the assignment of its first assigned part;
    /// when later parts landed in a different instance the feature also gets
    /// `_splitInstances: true`. Returns how many features were split that way.
    pub fn annotate(&mut self, outcome: &RunOutcome) -> usize {
        let mut written: Vec<Option<&str>> = vec![None; self.collection.features.len()];
        let mut split = vec![false; self.collection.features.len()];
        for (segment, assignment) in outcome.assignments.iter().enumerate() {
            let Some(assignment) = assignment else {
                continue;
            };
            let Some(&feature_index) = self.feature_of_segment.get(segment) else {
                continue;
            };
            let existing = written[feature_index];
            match existing {
                Some(street_id) => {
                    if street_id != assignment.street_id && !split[feature_index] {
                        split[feature_index] = true;
                        debug!(
                            "Feature {} spans instances {} and {}; keeping {}",
                            feature_index, street_id, assignment.street_id, street_id
                        );
                        self.collection.features[feature_index].set_property(SPLIT_INSTANCES_KEY, true);
                    }
                }
                None => {
                    written[feature_index] = Some(assignment.street_id.as_str());
                    let feature = &mut self.collection.features[feature_index];
                    feature.set_property(INSTANCE_ID_KEY, assignment.ordinal);
                    feature.set_property(TOTAL_INSTANCES_KEY, assignment.total);
                    feature.set_property(STREET_ID_KEY, assignment.street_id.clone());
                }
            }
        }

        let split_count = split.iter().filter(|&&s| s).count();
        if split_count > 0 {
            warn!(
                "{} multi-part features span more than one instance and carry their first part's id",
                split_count
            );
        }
        split_count
    }
}

/// One MultiLineString feature per street instance, carrying its bounding box.
pub fn instance_collection(segments: &[Segment], outcome: &RunOutcome) -> FeatureCollection {
    let mut features = Vec::new();
    for street in &outcome.streets {
        for instance in &street.instances {
            let lines: Vec<Vec<Vec<f64>>> = instance
                .members
                .iter()
                .map(|&m| segments[m].coords.iter().map(|&(x, y)| vec![x, y]).collect())
                .collect();

            let bbox = instance
                .members
                .iter()
                .filter_map(|&m| segments[m].bbox())
                .reduce(BBox::union);

            let mut properties = Map::new();
            properties.insert("name".to_string(), json!(street.name));
            properties.insert("id".to_string(), json!(instance.ordinal));
            properties.insert("street_id".to_string(), json!(instance.street_id));
            properties.insert("total_instances".to_string(), json!(instance.total));
            properties.insert("segment_count".to_string(), json!(instance.members.len()));
            if let Some(b) = bbox {
                properties.insert("min_lat".to_string(), json!(b.min_lat));
                properties.insert("max_lat".to_string(), json!(b.max_lat));
                properties.insert("min_lng".to_string(), json!(b.min_lon));
                properties.insert("max_lng".to_string(), json!(b.max_lon));
            }

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::MultiLineString(lines))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::pipeline::InstancePipeline;

    const ROADS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "way/1",
             "properties": {"name": "Example Street", "highway": "residential"},
             "geometry": {"type": "LineString", "coordinates": [[151.0, -33.0], [151.001, -33.0]]}},
            {"type": "Feature",
             "properties": {"name": "Example Street", "osm_id": 77},
             "geometry": {"type": "LineString", "coordinates": [[151.001, -33.0], [151.002, -33.0]]}},
            {"type": "Feature",
             "properties": {"name": "Example Street"},
             "geometry": {"type": "LineString", "coordinates": [[151.5, -33.0], [151.501, -33.0]]}},
            {"type": "Feature",
             "properties": {"highway": "service"},
             "geometry": {"type": "LineString", "coordinates": [[151.0, -33.0], [151.1, -33.0]]}},
            {"type": "Feature",
             "properties": {"name": "Split Road"},
             "geometry": {"type": "MultiLineString", "coordinates": [
                [[150.0, -34.0], [150.001, -34.0]],
                [[150.001, -34.0], [150.002, -34.0]]
             ]}},
            {"type": "Feature",
             "properties": {"name": "Lonely Lane"},
             "geometry": {"type": "Point", "coordinates": [150.0, -34.0]}}
        ]
    }"#;

    #[test]
    fn test_segments_extracted() {
        let dataset = RoadDataset::from_geojson_str(ROADS).unwrap();
        assert_eq!(dataset.segments.len(), 7);
        assert_eq!(dataset.feature_of_segment, vec![0, 1, 2, 3, 4, 4, 5]);
        assert_eq!(dataset.segments[0].source_id, "way/1");
        assert_eq!(dataset.segments[0].category.as_deref(), Some("residential"));
        assert_eq!(dataset.segments[1].source_id, "77");
        assert_eq!(dataset.segments[2].source_id, "2");
        assert_eq!(dataset.segments[3].street_name(), None);
        assert_eq!(dataset.segments[4].source_id, "4#0");
        assert!(dataset.segments[6].coords.is_empty());
    }

    #[test]
    fn test_not_a_collection() {
        let err = RoadDataset::from_geojson_str(
            r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#,
        );
        assert!(matches!(err, Err(LoadError::NotFeatureCollection)));
        assert!(matches!(
            RoadDataset::from_geojson_str("not json"),
            Err(LoadError::GeoJson(_))
        ));
    }

    #[test]
    fn test_annotate_and_export() {
        let mut dataset = RoadDataset::from_geojson_str(ROADS).unwrap();
        let config = RunConfig::default();
        let outcome = InstancePipeline::new(config).run(&dataset.segments);
        assert_eq!(dataset.annotate(&outcome), 0);

        let f0 = &dataset.collection.features[0];
        assert_eq!(f0.property(INSTANCE_ID_KEY), Some(&json!(0)));
        assert_eq!(f0.property(TOTAL_INSTANCES_KEY), Some(&json!(2)));
        assert_eq!(f0.property(STREET_ID_KEY), Some(&json!("example-street-000")));
        assert_eq!(dataset.collection.features[2].property(INSTANCE_ID_KEY), Some(&json!(1)));
        // unnamed and point features stay unannotated
        assert_eq!(dataset.collection.features[3].property(INSTANCE_ID_KEY), None);
        assert_eq!(dataset.collection.features[5].property(INSTANCE_ID_KEY), None);
        assert_eq!(dataset.collection.features[4].property(TOTAL_INSTANCES_KEY), Some(&json!(1)));

        let instances = instance_collection(&dataset.segments, &outcome);
        assert_eq!(instances.features.len(), 3);
        let first = &instances.features[0];
        assert_eq!(first.property("segment_count"), Some(&json!(2)));
        assert_eq!(first.property("min_lng"), Some(&json!(151.0)));
        assert_eq!(first.property("max_lng"), Some(&json!(151.002)));
    }

    #[test]
    fn test_multi_part_feature_across_instances_is_flagged() {
        let roads = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "properties": {"name": "Split Road"},
                 "geometry": {"type": "MultiLineString", "coordinates": [
                    [[150.0, -34.0], [150.001, -34.0]],
                    [[150.5, -34.0], [150.501, -34.0]]
                 ]}},
                {"type": "Feature",
                 "properties": {"name": "Split Road"},
                 "geometry": {"type": "LineString", "coordinates": [[150.501, -34.0], [150.502, -34.0]]}}
            ]
        }"#;
        let mut dataset = RoadDataset::from_geojson_str(roads).unwrap();
        let outcome = InstancePipeline::new(RunConfig::default()).run(&dataset.segments);
        assert_eq!(dataset.annotate(&outcome), 1);

        let multi = &dataset.collection.features[0];
        assert_eq!(multi.property(INSTANCE_ID_KEY), Some(&json!(0)));
        assert_eq!(multi.property(TOTAL_INSTANCES_KEY), Some(&json!(2)));
        assert_eq!(multi.property(SPLIT_INSTANCES_KEY), Some(&json!(true)));

        let single = &dataset.collection.features[1];
        assert_eq!(single.property(INSTANCE_ID_KEY), Some(&json!(1)));
        assert_eq!(single.property(SPLIT_INSTANCES_KEY), None);
    }
}
