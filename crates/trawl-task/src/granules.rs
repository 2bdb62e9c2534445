//! # Granule Reshaping
//!
//! Turns raw search hits into the reingest output document: one granule per
//! hit, keeping only files staged in a private bucket, with the staging
//! paths stripped of the file name.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// One staged file of a granule.
#[derive(Debug, Serialize)]
pub struct GranuleFile {
    pub name: String,
    /// Staging source with the `/<name>` suffix stripped.
    pub path: String,
    pub size: u64,
    /// Reshaping time, epoch millis.
    pub time: i64,
    pub bucket: String,
    /// Object key with the `/<name>` suffix stripped.
    pub url_path: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

/// One reshaped granule record.
#[derive(Debug, Serialize)]
pub struct Granule {
    #[serde(rename = "granuleId")]
    pub granule_id: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
    pub version: String,
    pub files: Vec<GranuleFile>,
}

/// Reshape raw hits into the reingest output document.
pub fn reingest_output(records: &[Value]) -> Value {
    let granules: Vec<Granule> = records.iter().map(granule_from_hit).collect();
    serde_json::json!({ "granules": granules })
}

fn granule_from_hit(hit: &Value) -> Granule {
    let source = &hit["_source"];
    let (data_type, version) = split_collection(&str_field(source, "collectionId"));
    Granule {
        granule_id: str_field(source, "granuleId"),
        data_type,
        version,
        files: private_files(source),
    }
}

/// `collectionId` is `<dataType>___<version>`, split on the last separator.
fn split_collection(collection_id: &str) -> (String, String) {
    match collection_id.rsplit_once("___") {
        Some((data_type, version)) => (data_type.to_string(), version.to_string()),
        None => {
            tracing::warn!("collectionId {:?} has no ___ version suffix", collection_id);
            (collection_id.to_string(), String::new())
        }
    }
}

fn private_files(source: &Value) -> Vec<GranuleFile> {
    let now = Utc::now().timestamp_millis();
    let mut files = Vec::new();
    for file in source["files"].as_array().into_iter().flatten() {
        let bucket = str_field(file, "bucket");
        if !bucket.contains("private") {
            continue;
        }
        let name = str_field(file, "fileName");
        let suffix = format!("/{name}");
        files.push(GranuleFile {
            path: str_field(file, "source").replace(&suffix, ""),
            size: file["size"].as_u64().unwrap_or(0),
            time: now,
            bucket,
            url_path: str_field(file, "key").replace(&suffix, ""),
            file_type: str_field(file, "type"),
            name,
        });
    }
    files
}

fn str_field(doc: &Value, key: &str) -> String {
    doc[key].as_str().unwrap_or_default().to_string()
}
