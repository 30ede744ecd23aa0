#![allow(dead_code)]

use dicom::core::value::DataSetSequence;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::object::{open_file, FileMetaTableBuilder, InMemDicomObject};
use qa_triage::analyzer::{
    AnalysisRequest, AnalysisResult, Analyzer, DoseRateResult, HuDifferences, MrPhantomResult,
    MtfPercentiles, MtfPoint, PhantomResult, RadiographicResult, UniformityValues,
    WinstonLutzResult,
};
use qa_triage::config::LockWait;
use qa_triage::error::AnalyzerError;
use qa_triage::ledger::workbook::Workbook;
use qa_triage::model::tags;
use qa_triage::source::DicomSourceEditor;
use qa_triage::{run_pass, PassSummary, RunConfig};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;

const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

static INSTANCE: AtomicUsize = AtomicUsize::new(1);

pub struct Workspace {
    pub temp: TempDir,
    pub config: RunConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let config = RunConfig {
            data_path: temp.path().join("data"),
            processed_path: temp.path().join("processed"),
            save_path: temp.path().join("results"),
            ledger_wait: LockWait {
                retry_secs: 0,
                timeout_mins: 0,
            },
            ..RunConfig::default()
        };
        fs::create_dir_all(&config.data_path).expect("data dir");
        Self { temp, config }
    }

    pub fn incoming(&self, relative: &str) -> PathBuf {
        self.config.data_path.join(relative)
    }

    pub fn processed(&self, relative: &str) -> PathBuf {
        self.config.processed_path.join(relative)
    }

    pub fn workbook(&self, subject: &str) -> PathBuf {
        let name = format!("Results_{subject}.xlsx");
        self.config.save_path.join(name)
    }

    /// Writes `object` under the incoming tree and returns its path.
    pub fn place(&self, object: InMemDicomObject, relative: &str) -> PathBuf {
        let path = self.incoming(relative);
        write(object, &path);
        path
    }

    /// Runs one pass with the real source editor.
    pub fn pass(&self, analyzer: &dyn Analyzer) -> PassSummary {
        self.pass_with(analyzer, &AtomicBool::new(false))
    }

    pub fn pass_with(&self, analyzer: &dyn Analyzer, shutdown: &AtomicBool) -> PassSummary {
        run_pass(&self.config, analyzer, &DicomSourceEditor, shutdown)
            .expect("pass")
    }

    pub fn rows(&self, subject: &str, sheet: &str) -> Vec<Vec<String>> {
        let book = Workbook::open(&self.workbook(subject)).expect("workbook");
        book.rows(sheet).expect("rows")
    }
}

fn text(tag: Tag, vr: VR, value: &str) -> DataElement<InMemDicomObject> {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

fn sequence(tag: Tag, items: Vec<InMemDicomObject>) -> DataElement<InMemDicomObject> {
    DataElement::new(tag, VR::SQ, DataSetSequence::from(items))
}

/// Minimal object every acquisition carries.
pub fn acquisition(modality: &str, date: &str, time: &str, subject: &str) -> InMemDicomObject {
    InMemDicomObject::from_element_iter([
        text(tags::MODALITY, VR::CS, modality),
        text(tags::SERIES_DATE, VR::DA, date),
        text(tags::SERIES_TIME, VR::TM, time),
        text(tags::PATIENT_ID, VR::LO, subject),
        text(tags::STATION_NAME, VR::SH, "TrueBeam1"),
    ])
}

pub fn portal_image(label: &str, open_beam: bool, exposure: &str, jaw: &str) -> InMemDicomObject {
    let mut object = acquisition("RTIMAGE", "20240419", "093310", "LINAC1");
    object.put(text(tags::RT_IMAGE_LABEL, VR::SH, label));
    if open_beam {
        let element = text(tags::CURVE_LABEL, VR::LO, "Field Edge (Open)");
        object.put(element);
    }
    let device = InMemDicomObject::from_element_iter([text(
        tags::LEAF_JAW_POSITIONS,
        VR::DS,
        &format!("{jaw}\\100"),
    )]);
    let exposure_item = InMemDicomObject::from_element_iter([
        text(tags::METERSET_EXPOSURE, VR::DS, exposure),
        sequence(tags::BEAM_LIMITING_DEVICE_SEQUENCE, vec![device]),
    ]);
    let element = sequence(tags::EXPOSURE_SEQUENCE, vec![exposure_item]);
    object.put(element);
    object
}

pub fn cbct_slice(z: &str, position: &str) -> InMemDicomObject {
    let mut object = acquisition("CT", "20240420", "071500", "CBCT1");
    object.put(text(tags::PATIENT_POSITION, VR::CS, position));
    let image_position = format!("-120\\-120\\{z}");
    let element = text(tags::IMAGE_POSITION_PATIENT, VR::DS, &image_position);
    object.put(element);
    object.put(text(tags::KVP, VR::DS, "125"));
    let reference = InMemDicomObject::from_element_iter([text(
        tags::REFERENCED_SOP_CLASS_UID,
        VR::UI,
        "1.2.840.10008.5.1.4.1.1.481.5",
    )]);
    let references = sequence(tags::REFERENCED_INSTANCE_SEQUENCE, vec![reference]);
    object.put(references);
    object
}

/// Diagnostic CT slice referencing another CT image, no plan linkage.
pub fn diagnostic_ct_slice(z: &str) -> InMemDicomObject {
    let mut object = acquisition("CT", "20240425", "083000", "CT1");
    object.put(text(tags::PATIENT_POSITION, VR::CS, "HFS"));
    let image_position = format!("-250\\-250\\{z}");
    let element = text(tags::IMAGE_POSITION_PATIENT, VR::DS, &image_position);
    object.put(element);
    let reference = InMemDicomObject::from_element_iter([text(
        tags::REFERENCED_SOP_CLASS_UID,
        VR::UI,
        "1.2.840.10008.5.1.4.1.1.2",
    )]);
    let element = sequence(tags::REFERENCED_IMAGE_SEQUENCE, vec![reference]);
    object.put(element);
    object
}

/// Portal image without an RT image label, as taken for Winston-Lutz.
pub fn winston_image() -> InMemDicomObject {
    acquisition("RTIMAGE", "20240424", "140000", "LINAC2")
}

pub fn mr_slice(field_strength: &str) -> InMemDicomObject {
    let mut object = acquisition("MR", "20240421", "120000", "MRI1");
    let element = text(tags::MAGNETIC_FIELD_STRENGTH, VR::DS, field_strength);
    object.put(element);
    object
}

pub fn write(object: InMemDicomObject, path: &Path) {
    fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
    let serial = INSTANCE.fetch_add(1, Ordering::SeqCst);
    let instance = format!("1.2.826.0.1.3680043.2.1125.{serial}");
    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .media_storage_sop_class_uid(SECONDARY_CAPTURE)
                .media_storage_sop_instance_uid(instance)
                .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN),
        )
        .expect("file meta");
    file.write_to_file(path).expect("write dicom");
}

/// Text of `tag` in the file at `path`, trimmed.
pub fn read_text(path: &Path, tag: Tag) -> Option<String> {
    let object = open_file(path).expect("open dicom");
    object
        .get(tag)
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim_end_matches('\0').trim().to_string())
}

/// Answers every request with a canned result of the matching shape.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    pub requests: RefCell<Vec<AnalysisRequest>>,
}

impl ScriptedAnalyzer {
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.borrow().clone()
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzerError> {
        self.requests.borrow_mut().push(request.clone());
        Ok(match request {
            AnalysisRequest::Drgs(_) | AnalysisRequest::Drmlc(_) => {
                AnalysisResult::DoseRate(DoseRateResult {
                    passed: true,
                    max_deviation_percent: 0.75,
                    abs_mean_deviation: 0.25,
                })
            }
            AnalysisRequest::Phantom(_) => AnalysisResult::Phantom(PhantomResult {
                passed: true,
                hu_differences: HuDifferences {
                    air: 4.0,
                    pmp: -2.0,
                    ldpe: 1.0,
                    poly: 0.0,
                    acrylic: 3.0,
                    delrin: -5.0,
                    teflon: 7.0,
                },
                avg_line_distance_mm: 50.0,
                measured_slice_thickness_mm: 2.0,
                uniformity: UniformityValues {
                    center: 1.0,
                    top: 2.0,
                    right: 3.0,
                    bottom: 4.0,
                    left: 5.0,
                },
                low_contrast_visibility: 1.5,
                low_contrast_rois_seen: 6,
                mtf_lp_mm: MtfPercentiles {
                    mtf_80: 0.3,
                    mtf_50: 0.45,
                    mtf_30: 0.6,
                },
                mtf_points: (1..=7)
                    .map(|step| MtfPoint {
                        line_pairs_per_mm: f64::from(step) / 10.0,
                        value: 1.0 - f64::from(step) / 10.0,
                    })
                    .collect(),
            }),
            AnalysisRequest::MrPhantom(_) => AnalysisResult::MrPhantom(MrPhantomResult {
                passed: true,
                geometric_distortion_mm: 0.4,
                uniformity_piu_percent: 92.5,
                ghosting_ratio_percent: 0.2,
                slice_thickness_mm: 5.1,
            }),
            AnalysisRequest::WinstonLutz(_) => AnalysisResult::WinstonLutz(WinstonLutzResult {
                passed: true,
                max_2d_cax_to_bb_mm: 0.6,
                median_2d_cax_to_bb_mm: 0.3,
                num_total_images: 8,
            }),
            AnalysisRequest::Radiographic(_) => AnalysisResult::Radiographic(RadiographicResult {
                passed: true,
                max_deviation: 0.1,
                low_contrast_rois_seen: Some(5),
            }),
        })
    }
}
