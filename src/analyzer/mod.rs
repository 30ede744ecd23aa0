//! Contract with the external QA analyzer.
//!
//! Requests and results are tagged unions serialized as JSON. Results are
//! validated once, when they cross this boundary; dispatch code only sees the
//! typed structs.

pub mod command;

pub use command::CommandAnalyzer;

use crate::config::{PhantomTolerances, RoiTable, SegmentSize};
use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional outputs the analyzer may render besides its numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOptions {
    pub pdf: Option<PathBuf>,
    pub notes: Vec<String>,
    pub plot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseRateRequest {
    /// Open-beam image first, MLC image second.
    pub images: [PathBuf; 2],
    pub tolerance_percent: f64,
    pub roi: Option<RoiTable>,
    pub segment_size_mm: Option<SegmentSize>,
    pub report: ReportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhantomRequest {
    pub folder: PathBuf,
    pub model: String,
    pub tolerances: PhantomTolerances,
    pub report: ReportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MrPhantomRequest {
    pub folder: PathBuf,
    pub report: ReportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinstonLutzRequest {
    pub folder: PathBuf,
    pub bb_size_mm: f64,
    pub report: ReportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiographicRequest {
    pub image: PathBuf,
    pub report: ReportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum AnalysisRequest {
    /// Dose rate and gantry speed (T2).
    Drgs(DoseRateRequest),
    /// Dose rate and MLC speed (T3).
    Drmlc(DoseRateRequest),
    Phantom(PhantomRequest),
    MrPhantom(MrPhantomRequest),
    WinstonLutz(WinstonLutzRequest),
    Radiographic(RadiographicRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DoseRateResult {
    pub passed: bool,
    pub max_deviation_percent: f64,
    pub abs_mean_deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HuDifferences {
    #[serde(rename = "Air")]
    pub air: f64,
    #[serde(rename = "PMP")]
    pub pmp: f64,
    #[serde(rename = "LDPE")]
    pub ldpe: f64,
    #[serde(rename = "Poly")]
    pub poly: f64,
    #[serde(rename = "Acrylic")]
    pub acrylic: f64,
    #[serde(rename = "Delrin")]
    pub delrin: f64,
    #[serde(rename = "Teflon")]
    pub teflon: f64,
}

impl HuDifferences {
    pub fn values(&self) -> [f64; 7] {
        [
            self.air,
            self.pmp,
            self.ldpe,
            self.poly,
            self.acrylic,
            self.delrin,
            self.teflon,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UniformityValues {
    pub center: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl UniformityValues {
    pub fn values(&self) -> [f64; 5] {
        [self.center, self.top, self.right, self.bottom, self.left]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MtfPercentiles {
    pub mtf_80: f64,
    pub mtf_50: f64,
    pub mtf_30: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MtfPoint {
    pub line_pairs_per_mm: f64,
    pub value: f64,
}

/// Number of line-pair frequencies the phantom ledger records.
pub const MTF_LINE_PAIR_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhantomResult {
    pub passed: bool,
    pub hu_differences: HuDifferences,
    pub avg_line_distance_mm: f64,
    pub measured_slice_thickness_mm: f64,
    pub uniformity: UniformityValues,
    pub low_contrast_visibility: f64,
    pub low_contrast_rois_seen: u32,
    pub mtf_lp_mm: MtfPercentiles,
    pub mtf_points: Vec<MtfPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MrPhantomResult {
    pub passed: bool,
    pub geometric_distortion_mm: f64,
    pub uniformity_piu_percent: f64,
    pub ghosting_ratio_percent: f64,
    pub slice_thickness_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WinstonLutzResult {
    pub passed: bool,
    pub max_2d_cax_to_bb_mm: f64,
    pub median_2d_cax_to_bb_mm: f64,
    pub num_total_images: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RadiographicResult {
    pub passed: bool,
    pub max_deviation: f64,
    pub low_contrast_rois_seen: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum AnalysisResult {
    DoseRate(DoseRateResult),
    Phantom(PhantomResult),
    MrPhantom(MrPhantomResult),
    WinstonLutz(WinstonLutzResult),
    Radiographic(RadiographicResult),
}

impl AnalysisResult {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DoseRate(_) => "dose_rate",
            Self::Phantom(_) => "phantom",
            Self::MrPhantom(_) => "mr_phantom",
            Self::WinstonLutz(_) => "winston_lutz",
            Self::Radiographic(_) => "radiographic",
        }
    }

    /// Rejects results no ledger row can be built from.
    pub fn validate(self) -> Result<Self, AnalyzerError> {
        let numbers: Vec<f64> = match &self {
            Self::DoseRate(r) => vec![r.max_deviation_percent, r.abs_mean_deviation],
            Self::Phantom(r) => {
                if r.mtf_points.len() < MTF_LINE_PAIR_COUNT {
                    return Err(AnalyzerError::Invalid(format!(
                        "expected {MTF_LINE_PAIR_COUNT} MTF points, got {}",
                        r.mtf_points.len()
                    )));
                }
                let mut numbers = r.hu_differences.values().to_vec();
                numbers.extend(r.uniformity.values());
                numbers.extend([
                    r.avg_line_distance_mm,
                    r.measured_slice_thickness_mm,
                    r.low_contrast_visibility,
                    r.mtf_lp_mm.mtf_80,
                    r.mtf_lp_mm.mtf_50,
                    r.mtf_lp_mm.mtf_30,
                ]);
                for point in &r.mtf_points {
                    numbers.extend([point.line_pairs_per_mm, point.value]);
                }
                numbers
            }
            Self::MrPhantom(r) => vec![
                r.geometric_distortion_mm,
                r.uniformity_piu_percent,
                r.ghosting_ratio_percent,
                r.slice_thickness_mm,
            ],
            Self::WinstonLutz(r) => vec![r.max_2d_cax_to_bb_mm, r.median_2d_cax_to_bb_mm],
            Self::Radiographic(r) => vec![r.max_deviation],
        };

        if numbers.iter().any(|value| !value.is_finite()) {
            return Err(AnalyzerError::Invalid(format!(
                "{} result contains a non-finite value",
                self.kind()
            )));
        }
        Ok(self)
    }
}

macro_rules! expect_result {
    ($result:expr, $variant:ident, $expected:literal) => {
        match $result {
            AnalysisResult::$variant(inner) => Ok(inner),
            other => Err(AnalyzerError::UnexpectedResult {
                expected: $expected,
                actual: other.kind(),
            }),
        }
    };
}

/// The capability that produces numeric QA verdicts.
pub trait Analyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzerError>;

    fn dose_rate(&self, request: &AnalysisRequest) -> Result<DoseRateResult, AnalyzerError> {
        let result = self.analyze(request)?.validate()?;
        expect_result!(result, DoseRate, "dose_rate")
    }

    fn phantom(&self, request: PhantomRequest) -> Result<PhantomResult, AnalyzerError> {
        let request = AnalysisRequest::Phantom(request);
        let result = self.analyze(&request)?.validate()?;
        expect_result!(result, Phantom, "phantom")
    }

    fn mr_phantom(&self, request: MrPhantomRequest) -> Result<MrPhantomResult, AnalyzerError> {
        let request = AnalysisRequest::MrPhantom(request);
        let result = self.analyze(&request)?.validate()?;
        expect_result!(result, MrPhantom, "mr_phantom")
    }

    fn winston_lutz(
        &self,
        request: WinstonLutzRequest,
    ) -> Result<WinstonLutzResult, AnalyzerError> {
        let request = AnalysisRequest::WinstonLutz(request);
        let result = self.analyze(&request)?.validate()?;
        expect_result!(result, WinstonLutz, "winston_lutz")
    }

    fn radiographic(
        &self,
        request: RadiographicRequest,
    ) -> Result<RadiographicResult, AnalyzerError> {
        let request = AnalysisRequest::Radiographic(request);
        let result = self.analyze(&request)?.validate()?;
        expect_result!(result, Radiographic, "radiographic")
    }
}
