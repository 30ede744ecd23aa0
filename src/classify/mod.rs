pub mod beam;
pub mod phantom;
pub mod series;

use crate::config::RunConfig;
use crate::error::ClassifyError;
use crate::model::{AcquisitionRecord, SegmentSlot, SlotMap};
use crate::source::SourceEditor;

/// Runs every detector over every record of a cohort, in time order.
///
/// Detectors are independent: each one reads only its own test family's
/// fields and slots. Source corrections (orientation, field strength) are
/// persisted as soon as a detector's precondition holds.
pub fn classify(
    records: &mut [AcquisitionRecord],
    config: &RunConfig,
    editor: &dyn SourceEditor,
) -> Result<SlotMap, ClassifyError> {
    let mut slots = seeded_slots(config);

    for record in records.iter_mut() {
        beam::detect(record, &mut slots)?;
        phantom::detect(record, &mut slots, editor)?;
        series::detect_acr(record, &mut slots, config.field_strength, editor)?;
        series::detect_winston(record, &mut slots);
        series::detect_normi_13(record, &mut slots);
    }

    Ok(slots)
}

fn seeded_slots(config: &RunConfig) -> SlotMap {
    let mut slots = SlotMap::default();
    let overrides = &config.segment_sizes;
    for (slot, size) in [
        (SegmentSlot::T2DoseRate, overrides.t2_dose_rate),
        (SegmentSlot::T2GantrySpeed, overrides.t2_gantry_speed),
        (SegmentSlot::T3, overrides.t3),
    ] {
        if let Some(size) = size {
            slots.set_segment_size(slot, size);
        }
    }
    slots
}
