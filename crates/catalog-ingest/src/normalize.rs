//! Source-agnostic element set normalization

use crate::{CatalogEntry, ObjectClass, SourceTag, TrackedObject};
use chrono::{DateTime, NaiveDateTime, Utc};
use orbital_mechanics::tle::ThreeLineRecord;
use orbital_mechanics::TleOrbit;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Element set as any source delivers it. Accepts CelesTrak/Space-Track
/// upper-case keys as well as the camelCase shape used internally.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElementSet {
    #[serde(default, alias = "OBJECT_NAME", alias = "objectName", alias = "satellite")]
    pub name: Option<String>,
    #[serde(default, alias = "TLE_LINE1", alias = "tle1")]
    pub line1: Option<String>,
    #[serde(default, alias = "TLE_LINE2", alias = "tle2")]
    pub line2: Option<String>,
    /// Space-Track sends catalog numbers as strings, other feeds as numbers
    #[serde(default, rename = "satId", alias = "NORAD_CAT_ID", alias = "catalogNumber")]
    pub sat_id: Option<serde_json::Value>,
    #[serde(default, alias = "EPOCH")]
    pub epoch: Option<String>,
    #[serde(default, rename = "objectType", alias = "OBJECT_TYPE")]
    pub object_type: Option<String>,
}

impl From<ThreeLineRecord> for RawElementSet {
    fn from(record: ThreeLineRecord) -> Self {
        Self {
            name: record.name,
            line1: Some(record.line1),
            line2: Some(record.line2),
            ..Default::default()
        }
    }
}

fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn classify(name: &str, object_type: Option<&str>) -> ObjectClass {
    let debris_type = object_type.is_some_and(|t| t.trim().eq_ignore_ascii_case("DEBRIS"));
    if debris_type || name.to_ascii_uppercase().contains("DEB") {
        ObjectClass::Debris
    } else {
        ObjectClass::Satellite
    }
}

/// `None` when either element line is missing or does not parse
pub fn normalize(raw: RawElementSet, source: SourceTag) -> Option<CatalogEntry> {
    let line1 = raw.line1.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
    let line2 = raw.line2.as_deref().map(str::trim).filter(|l| !l.is_empty())?;

    let orbit = match TleOrbit::from_lines(line1, line2) {
        Ok(orbit) => orbit,
        Err(e) => {
            debug!("Dropping unparsable element set: {}", e);
            return None;
        }
    };

    let id = raw
        .sat_id
        .as_ref()
        .and_then(id_string)
        .unwrap_or_else(|| orbit.norad_id().to_string());
    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("SAT-{}", orbit.norad_id()));
    let epoch = raw
        .epoch
        .as_deref()
        .and_then(parse_epoch)
        .unwrap_or_else(|| orbit.epoch());

    Some(CatalogEntry {
        object: TrackedObject {
            classification: classify(&name, raw.object_type.as_deref()),
            id,
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            source,
            epoch,
        },
        orbit: Arc::new(orbit),
    })
}

pub fn normalize_records(records: Vec<RawElementSet>, source: SourceTag) -> Vec<CatalogEntry> {
    let total = records.len();
    let entries: Vec<CatalogEntry> = records
        .into_iter()
        .filter_map(|raw| normalize(raw, source))
        .collect();

    if entries.len() < total {
        debug!(
            "{}: kept {}/{} element sets after normalization",
            source,
            entries.len(),
            total
        );
    }
    entries
}

/// Rebuild entries from cached objects, re-parsing their element lines
pub fn rehydrate(objects: Vec<TrackedObject>) -> Vec<CatalogEntry> {
    objects
        .into_iter()
        .filter_map(|object| {
            let orbit = TleOrbit::from_lines(&object.line1, &object.line2).ok()?;
            Some(CatalogEntry {
                object,
                orbit: Arc::new(orbit),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    const ISS_LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    #[test]
    fn test_space_track_json_shape() {
        let json = format!(
            r#"{{"OBJECT_NAME":"ISS (ZARYA)","TLE_LINE1":"{}","TLE_LINE2":"{}","NORAD_CAT_ID":"25544","EPOCH":"2020-07-12 21:15:58","OBJECT_TYPE":"PAYLOAD"}}"#,
            ISS_LINE1, ISS_LINE2
        );
        let raw: RawElementSet = serde_json::from_str(&json).unwrap();
        let entry = normalize(raw, SourceTag::SpaceTrack).unwrap();

        assert_eq!(entry.object.id, "25544");
        assert_eq!(entry.object.name, "ISS (ZARYA)");
        assert_eq!(entry.object.classification, ObjectClass::Satellite);
        assert_eq!(entry.object.source, SourceTag::SpaceTrack);
        assert_eq!(entry.object.epoch.to_rfc3339(), "2020-07-12T21:15:58+00:00");
    }

    #[test]
    fn test_internal_shape_with_numeric_id() {
        let json = format!(
            r#"{{"name":"","line1":"{}","line2":"{}","satId":25544}}"#,
            ISS_LINE1, ISS_LINE2
        );
        let raw: RawElementSet = serde_json::from_str(&json).unwrap();
        let entry = normalize(raw, SourceTag::Celestrak).unwrap();

        assert_eq!(entry.object.id, "25544");
        assert_eq!(entry.object.name, "SAT-25544");
        // no usable epoch field: taken from the element set
        assert_eq!(entry.object.epoch, entry.orbit.epoch());
    }

    #[test]
    fn test_missing_or_bad_lines_dropped() {
        let missing = RawElementSet {
            name: Some("NO LINES".into()),
            line1: Some(ISS_LINE1.into()),
            ..Default::default()
        };
        assert!(normalize(missing, SourceTag::Celestrak).is_none());

        let garbage = RawElementSet {
            line1: Some("1 nonsense".into()),
            line2: Some("2 nonsense".into()),
            ..Default::default()
        };
        assert!(normalize(garbage, SourceTag::Celestrak).is_none());
    }

    #[test]
    fn test_debris_classification() {
        assert_eq!(classify("COSMOS 2251 DEB", None), ObjectClass::Debris);
        assert_eq!(classify("FENGYUN 1C", Some("DEBRIS")), ObjectClass::Debris);
        assert_eq!(classify("fengyun 1c deb", None), ObjectClass::Debris);
        assert_eq!(classify("STARLINK-1007", Some("PAYLOAD")), ObjectClass::Satellite);
    }

    #[test]
    fn test_three_line_record_conversion() {
        let record = ThreeLineRecord {
            name: Some("ISS (ZARYA)".into()),
            line1: ISS_LINE1.into(),
            line2: ISS_LINE2.into(),
        };
        let entries = normalize_records(vec![record.into()], SourceTag::Celestrak);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].object.source, SourceTag::Celestrak);
    }

    #[test]
    fn test_rehydrate_skips_corrupt_entries() {
        let good = normalize(
            RawElementSet {
                line1: Some(ISS_LINE1.into()),
                line2: Some(ISS_LINE2.into()),
                ..Default::default()
            },
            SourceTag::Celestrak,
        )
        .unwrap()
        .object;
        let mut bad = good.clone();
        bad.line1 = "1 corrupted".into();

        let entries = rehydrate(vec![good, bad]);
        assert_eq!(entries.len(), 1);
    }
}
