//! Canonical record merge engine
//!
//! Folds partial records into one canonical mapping, field by field.
//!
//! Merge policy: last writer wins. Harvesting order is embedded sources
//! first, external sources second, so externally negotiated metadata takes
//! precedence over page-embedded metadata for overlapping fields.
//!
//! After all sources are folded, `clean` normalizes the content identifier
//! list and deletes empty values, so evaluators never see `{url: null}`
//! shapes or URI-encoded MIME types.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::PartialRecord;

/// Recognized top-level MIME types. A `type` value with more than two
/// `/`-separated segments is collapsed to `major/minor` form only when the
/// second-to-last segment is one of these.
const MIME_TOP_LEVEL: &[&str] = &[
    "application",
    "audio",
    "font",
    "example",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

/// The canonical merged record plus the shrinking set of fields still missing
#[derive(Debug, Clone)]
pub struct MergedRecord {
    map: BTreeMap<String, Value>,
    reference_elements: BTreeSet<String>,
}

impl MergedRecord {
    /// Create an empty record expecting the given reference fields
    pub fn new(reference_elements: &[&str]) -> Self {
        Self {
            map: BTreeMap::new(),
            reference_elements: reference_elements.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Fold one partial record into the canonical record.
    ///
    /// Every field overwrites an earlier value for the same key. A reference
    /// field is removed from the missing set the first time it is populated;
    /// the set never grows back.
    pub fn fold(&mut self, record: &PartialRecord) {
        for (key, value) in &record.metadata {
            self.map.insert(key.clone(), value.clone());
            self.reference_elements.remove(key);
        }
    }

    /// Fold a whole sequence of partial records in order
    pub fn fold_all<'a>(&mut self, records: impl IntoIterator<Item = &'a PartialRecord>) {
        for record in records {
            self.fold(record);
        }
    }

    /// Normalize and clean the merged record.
    ///
    /// - Degenerate `object_content_identifier` shapes (`{url: null}`,
    ///   `[null]`) are dropped; a bare object is wrapped into a list.
    /// - Entries missing a `size` are backfilled from the record-level
    ///   `object_size`.
    /// - `type` values carrying a full URI are collapsed to the trailing
    ///   `major/minor` MIME token when the major part is a recognized
    ///   top-level type.
    /// - Finally, every field whose value is an empty string or null is
    ///   deleted.
    pub fn clean(&mut self) {
        self.normalize_content_identifiers();

        self.map
            .retain(|_, v| !matches!(v, Value::Null) && v.as_str() != Some(""));
    }

    fn normalize_content_identifiers(&mut self) {
        let object_size = self.map.get("object_size").cloned();

        // degenerate shapes count as absent
        let degenerate = match self.map.get("object_content_identifier") {
            None => return,
            Some(Value::Object(o)) => o.len() == 1 && o.get("url") == Some(&Value::Null),
            Some(Value::Array(a)) => a.iter().all(|e| e.is_null()),
            Some(Value::Null) => true,
            Some(_) => false,
        };
        if degenerate {
            self.map.remove("object_content_identifier");
            return;
        }

        let Some(contents) = self.map.get_mut("object_content_identifier") else {
            return;
        };

        // list-shape invariant
        if !contents.is_array() {
            let single = contents.take();
            *contents = Value::Array(vec![single]);
        }

        if let Value::Array(entries) = contents {
            for entry in entries.iter_mut() {
                let Some(obj) = entry.as_object_mut() else {
                    continue;
                };

                let size_missing = match obj.get("size") {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.is_empty(),
                    _ => false,
                };
                if size_missing {
                    if let Some(size) = &object_size {
                        if !size.is_null() {
                            obj.insert("size".to_string(), size.clone());
                        }
                    }
                }

                // a list-valued type collapses to its first entry
                if let Some(Value::Array(types)) = obj.get("type") {
                    let first = types.first().cloned().unwrap_or(Value::Null);
                    obj.insert("type".to_string(), first);
                }

                if let Some(Value::String(mime)) = obj.get("type") {
                    if let Some(normalized) = normalize_mime(mime) {
                        obj.insert("type".to_string(), Value::String(normalized));
                    }
                }
            }
        }
    }

    /// Field accessor on the canonical record
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// The content identifier entries, empty when absent
    pub fn contents(&self) -> Vec<&Value> {
        match self.map.get("object_content_identifier") {
            Some(Value::Array(entries)) => entries.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        }
    }

    /// Canonical fields still considered missing
    pub fn missing_elements(&self) -> &BTreeSet<String> {
        &self.reference_elements
    }

    /// All populated fields
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.map
    }
}

/// Collapse a URI-form MIME value to `major/minor`, if recognizable
fn normalize_mime(mime: &str) -> Option<String> {
    let parts: Vec<&str> = mime.split('/').collect();
    if parts.len() > 2 {
        let major = parts[parts.len() - 2];
        if MIME_TOP_LEVEL.contains(&major) {
            return Some(format!("{}/{}", major, parts[parts.len() - 1]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::{HarvestMethod, MetadataFormat};
    use serde_json::json;

    fn record(fields: Value) -> PartialRecord {
        let map = fields
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        PartialRecord::new(
            HarvestMethod::Embedded,
            "https://example.org",
            MetadataFormat::JsonLd,
            map,
        )
    }

    #[test]
    fn test_last_writer_wins() {
        let mut merged = MergedRecord::new(&["license", "title"]);
        merged.fold(&record(json!({"license": "CC-BY", "title": "My Data"})));
        merged.fold(&record(json!({"license": "CC-BY-4.0"})));

        assert_eq!(merged.get("license").unwrap(), "CC-BY-4.0");
        assert_eq!(merged.get("title").unwrap(), "My Data");
    }

    #[test]
    fn test_merge_is_deterministic() {
        let records = vec![
            record(json!({"title": "A", "creator": "X"})),
            record(json!({"title": "B", "publisher": "Y"})),
        ];

        let mut first = MergedRecord::new(REFS);
        first.fold_all(&records);
        let mut second = MergedRecord::new(REFS);
        second.fold_all(&records);

        assert_eq!(first.fields(), second.fields());
        assert_eq!(first.get("title").unwrap(), "B");
    }

    const REFS: &[&str] = &["title", "creator", "publisher"];

    #[test]
    fn test_reference_elements_shrink_monotonically() {
        let mut merged = MergedRecord::new(&["title", "creator", "license"]);
        assert_eq!(merged.missing_elements().len(), 3);

        merged.fold(&record(json!({"title": "T"})));
        assert_eq!(merged.missing_elements().len(), 2);
        assert!(!merged.missing_elements().contains("title"));

        // re-supplying a field never grows the set
        merged.fold(&record(json!({"title": "T2"})));
        assert_eq!(merged.missing_elements().len(), 2);
    }

    #[test]
    fn test_clean_wraps_bare_object_into_list() {
        let mut merged = MergedRecord::new(&[]);
        merged.fold(&record(json!({
            "object_content_identifier": {"url": "https://example.org/data.csv"}
        })));
        merged.clean();

        let contents = merged.contents();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["url"], "https://example.org/data.csv");
    }

    #[test]
    fn test_clean_drops_degenerate_shapes() {
        for degenerate in [json!({"url": null}), json!([null])] {
            let mut merged = MergedRecord::new(&[]);
            merged.fold(&record(json!({"object_content_identifier": degenerate})));
            merged.clean();
            assert!(merged.get("object_content_identifier").is_none());
        }
    }

    #[test]
    fn test_clean_backfills_size_from_object_size() {
        let mut merged = MergedRecord::new(&[]);
        merged.fold(&record(json!({
            "object_content_identifier": [{"url": "https://example.org/d.csv", "type": "text/csv"}],
            "object_size": 1024
        })));
        merged.clean();

        assert_eq!(merged.contents()[0]["size"], 1024);
    }

    #[test]
    fn test_clean_normalizes_uri_form_mime() {
        let mut merged = MergedRecord::new(&[]);
        merged.fold(&record(json!({
            "object_content_identifier": [
                {"url": "https://example.org/d.csv", "type": "https://www.iana.org/assignments/media-types/text/csv"},
                {"url": "https://example.org/d.bin", "type": "https://example.org/formats/custom/thing"}
            ]
        })));
        merged.clean();

        let contents = merged.contents();
        assert_eq!(contents[0]["type"], "text/csv");
        // unrecognized major type stays untouched
        assert_eq!(contents[1]["type"], "https://example.org/formats/custom/thing");
    }

    #[test]
    fn test_clean_deletes_empty_and_null_fields() {
        let mut merged = MergedRecord::new(&[]);
        merged.fold(&record(json!({"title": "", "summary": null, "creator": "X"})));
        merged.clean();

        assert!(merged.get("title").is_none());
        assert!(merged.get("summary").is_none());
        assert_eq!(merged.get("creator").unwrap(), "X");
    }
}
