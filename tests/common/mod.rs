#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;

use camino::Utf8Path;

use m4db_analysis::app::{ProgressEvent, ProgressSink};
use m4db_analysis::catalog::Catalog;
use m4db_analysis::codec;
use m4db_analysis::domain::{ModelFilter, ModelRecord};
use m4db_analysis::error::M4dbError;

pub const UIDS: [&str; 3] = [
    "0f86b938-15a3-4f1e-99b1-8f2b65b37a03",
    "6C1D2E3F-4a5b-6c7d-8e9f-A0B1C2D3E4F5",
    "ffffffff-0000-1111-2222-333333333333",
];

pub fn record(unique_id: &str, material: &str, size: f64, temperature: f64) -> ModelRecord {
    ModelRecord {
        unique_id: unique_id.to_string(),
        db_user: "lnagy".to_string(),
        project_name: "finetemp".to_string(),
        material: material.to_string(),
        temperature,
        geometry: "cubo-octahedron".to_string(),
        size,
        mx_tot: Some(0.5),
        my_tot: Some(-0.25),
        mz_tot: Some(0.0),
        vx_tot: Some(0.1),
        vy_tot: Some(0.2),
        vz_tot: Some(0.3),
        h_tot: Some(0.75),
        adm_tot: Some(1.5),
        e_typical: Some(2.0),
        e_anis: Some(-1.0e-17),
        e_ext: None,
        e_demag: Some(3.25),
        e_exch1: Some(4.0),
        e_exch2: Some(4.5),
        e_exch3: Some(5.0),
        e_exch4: Some(5.5),
        e_tot: Some(6.0),
        volume: Some(1.25e-22),
    }
}

/// Catalog answering every query with a fixed result set.
pub struct FixedCatalog {
    pub records: Vec<ModelRecord>,
}

impl Catalog for FixedCatalog {
    fn fetch_models(&self, _filter: &ModelFilter) -> Result<Vec<ModelRecord>, M4dbError> {
        Ok(self.records.clone())
    }

    fn count_rows(&self, _table: &str) -> Result<u64, M4dbError> {
        Ok(self.records.len() as u64)
    }
}

/// Catalog that is never reachable.
pub struct DownCatalog;

impl Catalog for DownCatalog {
    fn fetch_models(&self, _filter: &ModelFilter) -> Result<Vec<ModelRecord>, M4dbError> {
        Err(M4dbError::CatalogUnavailable("connection refused".to_string()))
    }

    fn count_rows(&self, _table: &str) -> Result<u64, M4dbError> {
        Err(M4dbError::CatalogUnavailable("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn positions(&self) -> Vec<(usize, usize)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| event.position)
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Writes `<root>/<shard dirs>/data.zip` with the uid as content.
pub fn write_archive(root: &Utf8Path, unique_id: &str) {
    let dir = root.join(codec::uid_to_dir(unique_id).unwrap());
    fs::create_dir_all(dir.as_std_path()).unwrap();
    fs::write(dir.join("data.zip").as_std_path(), unique_id.as_bytes()).unwrap();
}
