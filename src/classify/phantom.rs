use crate::error::{ClassifyError, SourceError};
use crate::model::tags::{is_sop_class, CT_IMAGE_STORAGE, RT_PLAN_STORAGE};
use crate::model::{AcquisitionRecord, ImageSlot, Modality, PlanLinkage, SlotMap};
use crate::source::SourceEditor;

/// Purpose-of-reference code meaning written by linac CBCT acquisitions.
pub const PLAN_VERIFICATION_PURPOSE: &str =
    "RT Plan or RT Ion Plan or Radiation Set to be verified";

const FEET_FIRST_SUPINE: &str = "FFS";
const HEAD_FIRST_SUPINE: &str = "HFS";

/// Rewrites a feet-first-supine slice to head-first-supine.
///
/// Precondition: the record's patient position is `FFS`; anything else is
/// left alone and `false` is returned. Postcondition: the file on disk and the
/// record both hold `HFS` and a negated longitudinal image position, so a
/// second call is a no-op.
pub fn normalize_orientation(
    record: &mut AcquisitionRecord,
    editor: &dyn SourceEditor,
) -> Result<bool, SourceError> {
    if record.tags.patient_position.as_deref() != Some(FEET_FIRST_SUPINE) {
        return Ok(false);
    }

    let mut position = record
        .tags
        .image_position
        .ok_or_else(|| SourceError::MissingAttribute {
            path: record.path.clone(),
            attribute: "ImagePositionPatient",
        })?;
    position[2] = -position[2];

    editor
        .write_orientation(&record.path, HEAD_FIRST_SUPINE, position)?;
    record.tags.patient_position = Some(HEAD_FIRST_SUPINE.to_string());
    record.tags.image_position = Some(position);
    Ok(true)
}

pub fn detect(
    record: &mut AcquisitionRecord,
    slots: &mut SlotMap,
    editor: &dyn SourceEditor,
) -> Result<(), ClassifyError> {
    if record.modality != Modality::Ct {
        return Ok(());
    }

    normalize_orientation(record, editor)?;

    let folder = record.series_folder();
    if let Some(linkage) = &record.tags.plan_linkage {
        if is_plan_verification(linkage) && slots.fill_first(ImageSlot::CatphanLinac, record) {
            log::debug!("Linac CBCT phantom series found at {}", folder.display());
        }
    } else if references_ct_image(record) && slots.fill_first(ImageSlot::Catphan, record) {
        log::debug!("Diagnostic CT phantom series found at {}", folder.display());
    }

    Ok(())
}

fn references_ct_image(record: &AcquisitionRecord) -> bool {
    let Some(uid) = record.tags.referenced_image_class_uid.as_deref() else {
        return false;
    };
    is_sop_class(uid, CT_IMAGE_STORAGE, "CT Image Storage")
}

fn is_plan_verification(linkage: &PlanLinkage) -> bool {
    let plan_class = linkage
        .sop_class_uid
        .as_deref()
        .is_some_and(|uid| is_sop_class(uid, RT_PLAN_STORAGE, "RT Plan Storage"));
    let purpose = linkage.purpose_meaning.as_deref() == Some(PLAN_VERIFICATION_PURPOSE);
    plan_class || purpose
}
