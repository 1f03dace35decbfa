use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::M4dbError;

static UID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .unwrap()
});

/// Canonical hyphenated model identifier. Case is kept exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid(String);

impl Uid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 32 hex digits split into 16 consecutive pairs.
    pub fn hex_pairs(&self) -> Vec<String> {
        let digits = self.0.replace('-', "");
        digits
            .as_bytes()
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).into_owned())
            .collect()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = M4dbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !UID_REGEX.is_match(value) {
            return Err(M4dbError::InvalidUidFormat(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// `LIKE` patterns selecting the models of one user and project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelFilter {
    pub db_user: String,
    pub project_name: String,
}

impl ModelFilter {
    pub fn new(db_user: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            db_user: db_user.into(),
            project_name: project_name.into(),
        }
    }
}

/// One finished model joined with its owner, project, material and geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    pub unique_id: String,
    pub db_user: String,
    pub project_name: String,
    pub material: String,
    pub temperature: f64,
    pub geometry: String,
    pub size: f64,
    pub mx_tot: Option<f64>,
    pub my_tot: Option<f64>,
    pub mz_tot: Option<f64>,
    pub vx_tot: Option<f64>,
    pub vy_tot: Option<f64>,
    pub vz_tot: Option<f64>,
    pub h_tot: Option<f64>,
    pub adm_tot: Option<f64>,
    pub e_typical: Option<f64>,
    pub e_anis: Option<f64>,
    pub e_ext: Option<f64>,
    pub e_demag: Option<f64>,
    pub e_exch1: Option<f64>,
    pub e_exch2: Option<f64>,
    pub e_exch3: Option<f64>,
    pub e_exch4: Option<f64>,
    pub e_tot: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingArchivePolicy {
    #[default]
    Abort,
    Skip,
}

impl fmt::Display for MissingArchivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingArchivePolicy::Abort => write!(f, "abort"),
            MissingArchivePolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Renders a catalog number the way it appears in directory names and exports.
/// Integral values keep a single fractional digit (`40.0`). Magnitudes below
/// `1e-4` or from `1e16` up use exponent form with a signed two-digit exponent
/// (`-1e-17`, `1.25e-22`, `1e+16`).
pub fn decimal(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return exponent_form(value);
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn exponent_form(value: f64) -> String {
    let shortest = format!("{value:e}");
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => shortest,
    }
}
