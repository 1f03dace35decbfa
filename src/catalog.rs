use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{Connection, OpenFlags, Row, named_params};

use crate::config::CatalogConfig;
use crate::domain::{ModelFilter, ModelRecord};
use crate::error::M4dbError;

/// Only models in this running state are ever returned.
pub const FINISHED_STATUS: &str = "finished";

static TABLE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const MODELS_BY_USER_PROJECT: &str = r#"
    SELECT
        model.unique_id      AS unique_id,
        db_user.user_name    AS db_user,
        project.name         AS project_name,
        material.name        AS material,
        material.temperature AS temperature,
        geometry.name        AS geometry,
        geometry.size        AS size,
        model.mx_tot         AS mx_tot,
        model.my_tot         AS my_tot,
        model.mz_tot         AS mz_tot,
        model.vx_tot         AS vx_tot,
        model.vy_tot         AS vy_tot,
        model.vz_tot         AS vz_tot,
        model.h_tot          AS h_tot,
        model.adm_tot        AS adm_tot,
        model.e_typical      AS e_typical,
        model.e_anis         AS e_anis,
        model.e_ext          AS e_ext,
        model.e_demag        AS e_demag,
        model.e_exch1        AS e_exch1,
        model.e_exch2        AS e_exch2,
        model.e_exch3        AS e_exch3,
        model.e_exch4        AS e_exch4,
        model.e_tot          AS e_tot,
        model.volume         AS volume
    FROM model
        INNER JOIN metadata ON model.mdata_id = metadata.id
        INNER JOIN db_user ON metadata.db_user_id = db_user.id
        INNER JOIN project ON metadata.project_id = project.id
        INNER JOIN running_status ON model.running_status_id = running_status.id
        INNER JOIN geometry ON model.geometry_id = geometry.id
        INNER JOIN model_material_association AS mma ON model.id = mma.model_id
        INNER JOIN material ON material.id = mma.material_id
    WHERE
        db_user.user_name LIKE :db_user AND
        project.name LIKE :project_name AND
        running_status.name LIKE :model_status
"#;

/// Read-only access to the model catalog.
pub trait Catalog {
    /// Finished models whose user and project match the filter's `LIKE` patterns,
    /// in catalog order.
    fn fetch_models(&self, filter: &ModelFilter) -> Result<Vec<ModelRecord>, M4dbError>;

    fn count_rows(&self, table: &str) -> Result<u64, M4dbError>;
}

/// Catalog backed by an SQLite file. The connection is opened read-only and
/// closed when the client is dropped.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn open(config: &CatalogConfig) -> Result<Self, M4dbError> {
        let conn = Connection::open_with_flags(
            config.path.as_std_path(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| M4dbError::CatalogUnavailable(format!("{}: {err}", config.path)))?;
        // Patterns match case-sensitively, as on the PostgreSQL catalog.
        conn.pragma_update(None, "case_sensitive_like", true)
            .map_err(|err| M4dbError::CatalogUnavailable(err.to_string()))?;
        tracing::debug!(catalog = %config.path, "catalog opened");
        Ok(Self { conn })
    }
}

impl Catalog for SqliteCatalog {
    fn fetch_models(&self, filter: &ModelFilter) -> Result<Vec<ModelRecord>, M4dbError> {
        let mut stmt = self.conn.prepare(MODELS_BY_USER_PROJECT)?;
        let records = stmt
            .query_map(
                named_params! {
                    ":db_user": filter.db_user,
                    ":project_name": filter.project_name,
                    ":model_status": FINISHED_STATUS,
                },
                model_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        tracing::debug!(
            db_user = %filter.db_user,
            project = %filter.project_name,
            count = records.len(),
            "fetched models"
        );
        Ok(records)
    }

    fn count_rows(&self, table: &str) -> Result<u64, M4dbError> {
        validate_table_name(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(1) FROM \"{table}\""),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

pub fn validate_table_name(table: &str) -> Result<(), M4dbError> {
    if TABLE_NAME_REGEX.is_match(table) {
        Ok(())
    } else {
        Err(M4dbError::InvalidTableName(table.to_string()))
    }
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<ModelRecord> {
    Ok(ModelRecord {
        unique_id: row.get("unique_id")?,
        db_user: row.get("db_user")?,
        project_name: row.get("project_name")?,
        material: row.get("material")?,
        temperature: row.get("temperature")?,
        geometry: row.get("geometry")?,
        size: row.get("size")?,
        mx_tot: row.get("mx_tot")?,
        my_tot: row.get("my_tot")?,
        mz_tot: row.get("mz_tot")?,
        vx_tot: row.get("vx_tot")?,
        vy_tot: row.get("vy_tot")?,
        vz_tot: row.get("vz_tot")?,
        h_tot: row.get("h_tot")?,
        adm_tot: row.get("adm_tot")?,
        e_typical: row.get("e_typical")?,
        e_anis: row.get("e_anis")?,
        e_ext: row.get("e_ext")?,
        e_demag: row.get("e_demag")?,
        e_exch1: row.get("e_exch1")?,
        e_exch2: row.get("e_exch2")?,
        e_exch3: row.get("e_exch3")?,
        e_exch4: row.get("e_exch4")?,
        e_tot: row.get("e_tot")?,
        volume: row.get("volume")?,
    })
}
