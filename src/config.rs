use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tolerance (% of max deviation) for the dose-rate/gantry-speed test (T2).
pub const DRGS_TOLERANCE: f64 = 1.5;
/// Tolerance (% of max deviation) for the dose-rate/MLC-speed test (T3).
pub const DRMLC_TOLERANCE: f64 = 1.5;

/// Meterset exposure below which a T2 image belongs to the Halcyon dose-rate test.
pub const DOSE_RATE_EXPOSURE_LIMIT: f64 = 100.0;
/// First jaw position (mm) of the 14 cm x 14 cm Halcyon gantry-speed field.
pub const GANTRY_SPEED_JAW_POSITION: f64 = -140.0;

const T2_DR_ROI_HALCYON: &[(&str, f64)] = &[
    ("-6 cm", -60.0),
    ("-4 cm", -40.0),
    ("-2 cm", -20.0),
    ("0 cm", 0.0),
    ("+2 cm", 20.0),
    ("+4 cm", 40.0),
    ("+6 cm", 60.0),
];

const T2_GS_ROI_HALCYON: &[(&str, f64)] = &[
    ("-12 cm", -120.0),
    ("-8 cm", -80.0),
    ("-4 cm", -40.0),
    ("0 cm", 0.0),
    ("+4 cm", 40.0),
    ("+8 cm", 80.0),
    ("+12 cm", 120.0),
];

const T3_MLC_ROI_HALCYON: &[(&str, f64)] = &[
    ("-11.2 cm", -112.0),
    ("-5.6 cm", -56.0),
    ("0 cm", 0.0),
    ("+5.6 cm", 56.0),
    ("+11.2 cm", 112.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiSegment {
    pub name: String,
    pub offset_mm: f64,
}

/// Named segment offsets replacing the analyzer's default layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RoiTable(pub Vec<RoiSegment>);

impl RoiTable {
    fn from_static(entries: &[(&str, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(name, offset_mm)| RoiSegment {
                    name: (*name).to_string(),
                    offset_mm: *offset_mm,
                })
                .collect(),
        )
    }

    pub fn t2_dose_rate_halcyon() -> Self {
        Self::from_static(T2_DR_ROI_HALCYON)
    }

    pub fn t2_gantry_speed_halcyon() -> Self {
        Self::from_static(T2_GS_ROI_HALCYON)
    }

    pub fn t3_mlc_speed_halcyon() -> Self {
        Self::from_static(T3_MLC_ROI_HALCYON)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentOverrides {
    pub t2_dose_rate: Option<SegmentSize>,
    pub t2_gantry_speed: Option<SegmentSize>,
    pub t3: Option<SegmentSize>,
}

/// Catphan tolerance profile handed to the phantom analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhantomTolerances {
    pub hu_tolerance: f64,
    pub scaling_tolerance: f64,
    pub thickness_tolerance: f64,
    pub low_contrast_tolerance: f64,
    pub expected_hu_values: BTreeMap<String, f64>,
}

impl PhantomTolerances {
    fn with_hu_tolerance(hu_tolerance: f64) -> Self {
        let expected_hu_values = [
            ("Air", -983.0),
            ("PMP", -181.0),
            ("LDPE", -92.0),
            ("Poly", -37.0),
            ("Acrylic", 122.0),
            ("Delrin", 343.0),
            ("Teflon", 936.0),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            hu_tolerance,
            scaling_tolerance: 0.5,
            thickness_tolerance: 0.1,
            low_contrast_tolerance: 5.0,
            expected_hu_values,
        }
    }

    /// Diagnostic CT scanners.
    pub fn diagnostic() -> Self {
        Self::with_hu_tolerance(10.0)
    }

    /// Linac cone-beam CT, looser on Hounsfield units.
    pub fn cbct() -> Self {
        Self::with_hu_tolerance(20.0)
    }
}

/// How long to wait for a file held open by another process.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LockWait {
    pub retry_secs: u64,
    pub timeout_mins: u64,
}

impl Default for LockWait {
    fn default() -> Self {
        Self {
            retry_secs: 5,
            timeout_mins: 120,
        }
    }
}

impl LockWait {
    pub fn retry(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_mins * 60)
    }
}

/// Immutable settings of one batch pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub processed_path: PathBuf,
    pub save_path: PathBuf,
    pub file_types: Vec<String>,
    pub catphan_model: String,
    /// Tesla, written to ACR phantom images before analysis.
    pub field_strength: f64,
    pub bb_size_mm: f64,
    pub pdf: bool,
    pub plot: bool,
    pub settle_secs: u64,
    pub ledger_wait: LockWait,
    pub phantom_timeout_mins: u64,
    pub segment_sizes: SegmentOverrides,
    /// Program and leading arguments of the external analyzer.
    pub analyzer_command: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data"),
            processed_path: PathBuf::from("processed"),
            save_path: PathBuf::from("results"),
            file_types: vec![".dcm".into(), ".tiff".into(), ".tif".into()],
            catphan_model: "CustomCP504".to_string(),
            field_strength: 3.0,
            bb_size_mm: 6.0,
            pdf: false,
            plot: false,
            settle_secs: 0,
            ledger_wait: LockWait::default(),
            phantom_timeout_mins: 5,
            segment_sizes: SegmentOverrides::default(),
            analyzer_command: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn phantom_timeout(&self) -> Duration {
        Duration::from_secs(self.phantom_timeout_mins * 60)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Case-insensitive match against the configured extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.file_types
            .iter()
            .any(|ext| name.ends_with(&ext.to_ascii_lowercase()))
    }
}
