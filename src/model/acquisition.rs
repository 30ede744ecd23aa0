use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Ct,
    Mr,
    RtImage,
    Cr,
    Dx,
    Other,
}

impl Modality {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "CT" => Self::Ct,
            "MR" => Self::Mr,
            "RTIMAGE" => Self::RtImage,
            "CR" => Self::Cr,
            "DX" => Self::Dx,
            _ => Self::Other,
        }
    }

    pub fn is_radiograph(self) -> bool {
        matches!(self, Self::Cr | Self::Dx)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Ct => "CT",
            Self::Mr => "MR",
            Self::RtImage => "RTIMAGE",
            Self::Cr => "CR",
            Self::Dx => "DX",
            Self::Other => "OT",
        };
        f.write_str(code)
    }
}

/// Reference from a CBCT slice to the plan it verifies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanLinkage {
    pub sop_class_uid: Option<String>,
    pub purpose_meaning: Option<String>,
}

/// Acquisition technique of a CT slice, copied into the phantom ledger row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtTechnique {
    pub kvp: Option<f64>,
    pub exposure_mas: Option<f64>,
    pub filter_type: Option<String>,
    pub convolution_kernel: Option<String>,
    pub ctdi_vol: Option<f64>,
}

/// The metadata fields detectors and ledger rows read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTags {
    pub rt_image_label: Option<String>,
    pub has_curve_label: bool,
    pub meterset_exposure: Option<f64>,
    pub first_jaw_position: Option<f64>,
    pub patient_position: Option<String>,
    pub image_position: Option<[f64; 3]>,
    pub plan_linkage: Option<PlanLinkage>,
    pub referenced_image_class_uid: Option<String>,
    pub technique: CtTechnique,
    pub series_description: Option<String>,
    pub station_name: Option<String>,
    pub operators_name: Option<String>,
    pub magnetic_field_strength: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRecord {
    pub path: PathBuf,
    pub modality: Modality,
    pub acquisition_date: String,
    pub acquisition_time: String,
    pub subject_id: String,
    pub tags: LabelTags,
}

impl AcquisitionRecord {
    /// Folder holding the record's series; multi-slice studies share one.
    pub fn series_folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn same_series_as(&self, other: &AcquisitionRecord) -> bool {
        self.series_folder() == other.series_folder()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
