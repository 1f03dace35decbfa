use camino::Utf8Path;

use crate::domain::{ModelRecord, decimal};
use crate::error::M4dbError;

pub const MODEL_COLUMNS: [&str; 25] = [
    "unique_id",
    "db_user",
    "project_name",
    "material",
    "temperature",
    "geometry",
    "size",
    "mx_tot",
    "my_tot",
    "mz_tot",
    "vx_tot",
    "vy_tot",
    "vz_tot",
    "h_tot",
    "adm_tot",
    "e_typical",
    "e_anis",
    "e_ext",
    "e_demag",
    "e_exch1",
    "e_exch2",
    "e_exch3",
    "e_exch4",
    "e_tot",
    "volume",
];

/// Model statistics flattened into rows of text cells, one row per record,
/// cells in `MODEL_COLUMNS` order.
#[derive(Debug, Clone, Default)]
pub struct ModelTable {
    rows: Vec<[String; 25]>,
}

impl ModelTable {
    pub fn from_records(records: &[ModelRecord]) -> Self {
        Self {
            rows: records.iter().map(row_cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table as CSV with a leading unlabeled row-index column.
    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), M4dbError> {
        let write_failed = |err: csv::Error| M4dbError::OutputWriteFailed {
            path: path.to_string(),
            message: err.to_string(),
        };
        let mut writer = csv::Writer::from_path(path.as_std_path()).map_err(write_failed)?;

        writer
            .write_record(std::iter::once("").chain(MODEL_COLUMNS))
            .map_err(write_failed)?;
        for (index, row) in self.rows.iter().enumerate() {
            let index = index.to_string();
            writer
                .write_record(std::iter::once(index.as_str()).chain(row.iter().map(String::as_str)))
                .map_err(write_failed)?;
        }
        writer.flush().map_err(|err| M4dbError::OutputWriteFailed {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

fn row_cells(record: &ModelRecord) -> [String; 25] {
    [
        record.unique_id.clone(),
        record.db_user.clone(),
        record.project_name.clone(),
        record.material.clone(),
        decimal(record.temperature),
        record.geometry.clone(),
        decimal(record.size),
        quantity(record.mx_tot),
        quantity(record.my_tot),
        quantity(record.mz_tot),
        quantity(record.vx_tot),
        quantity(record.vy_tot),
        quantity(record.vz_tot),
        quantity(record.h_tot),
        quantity(record.adm_tot),
        quantity(record.e_typical),
        quantity(record.e_anis),
        quantity(record.e_ext),
        quantity(record.e_demag),
        quantity(record.e_exch1),
        quantity(record.e_exch2),
        quantity(record.e_exch3),
        quantity(record.e_exch4),
        quantity(record.e_tot),
        quantity(record.volume),
    ]
}

fn quantity(value: Option<f64>) -> String {
    value.map(decimal).unwrap_or_default()
}
