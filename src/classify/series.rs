//! Detectors for tests whose analysis reads a whole series folder.

use crate::error::ClassifyError;
use crate::model::{AcquisitionRecord, ImageSlot, Modality, SlotMap};
use crate::source::SourceEditor;

/// ACR large MR phantom.
///
/// The first MR image claims the slot. Before it does, its field strength is
/// set to `field_strength` and saved, because the analyzer derives its
/// expectations from that attribute.
pub fn detect_acr(
    record: &mut AcquisitionRecord,
    slots: &mut SlotMap,
    field_strength: f64,
    editor: &dyn SourceEditor,
) -> Result<(), ClassifyError> {
    if record.modality != Modality::Mr || already_claimed(record, slots, ImageSlot::Acr) {
        return Ok(());
    }

    editor.write_field_strength(&record.path, field_strength)?;
    record.tags.magnetic_field_strength = Some(field_strength);
    slots.set(ImageSlot::Acr, record);
    Ok(())
}

/// Winston-Lutz ball-bearing images.
pub fn detect_winston(record: &AcquisitionRecord, slots: &mut SlotMap) {
    if record.modality != Modality::RtImage || already_claimed(record, slots, ImageSlot::Winston) {
        return;
    }
    slots.set(ImageSlot::Winston, record);
}

/// Normi-13 radiographic test object; one image per cohort.
pub fn detect_normi_13(record: &AcquisitionRecord, slots: &mut SlotMap) {
    if record.modality.is_radiograph() {
        slots.fill_first(ImageSlot::Normi13, record);
    }
}

fn already_claimed(record: &AcquisitionRecord, slots: &SlotMap, slot: ImageSlot) -> bool {
    let Some(existing) = slots.get(slot) else {
        return false;
    };
    if !existing.same_series_as(record) {
        // The later series stays unclaimed and is swept.
        log::debug!(
            "{} is from another series than {} for {}; keeping the first",
            record.path.display(),
            existing.series_folder().display(),
            slot.name()
        );
    }
    true
}
