//! T2 (dose rate / gantry speed) and T3 (dose rate / MLC speed) portal images.
//!
//! Label conventions of the delivery plans:
//! - T2: RT image label contains `MV_243`.
//! - T3: `MV_32`, or `MV_190` (open) and `MV_40` (MLC) on Halcyon.
//! - Open-beam images carry a curve label (`Field Edge (Open` or
//!   `CIAO (OpenBeam)` on Halcyon), MLC images do not.
//! - Halcyon dose-rate T2 fields are delivered with ~60 MU, gantry-speed
//!   fields with a -140 mm jaw.

use crate::config::{RoiTable, DOSE_RATE_EXPOSURE_LIMIT, GANTRY_SPEED_JAW_POSITION};
use crate::error::ClassifyError;
use crate::model::{AcquisitionRecord, ImageSlot, SegmentSlot, SlotMap};

const T2_LABEL: &str = "MV_243";
const T3_LABEL: &str = "MV_32";
const T3_HALCYON_OPEN_LABEL: &str = "MV_190";
const T3_HALCYON_MLC_LABEL: &str = "MV_40";

pub fn detect(record: &AcquisitionRecord, slots: &mut SlotMap) -> Result<(), ClassifyError> {
    let Some(label) = record.tags.rt_image_label.as_deref() else {
        return Ok(());
    };
    let open_beam = record.tags.has_curve_label;

    if label.contains(T2_LABEL) {
        let slot_name = if open_beam { "t2 open" } else { "t2 mlc" };
        let exposure = require(
            record,
            record.tags.meterset_exposure,
            "MetersetExposure",
            slot_name,
        )?;
        let dose_rate = exposure < DOSE_RATE_EXPOSURE_LIMIT;

        match (open_beam, dose_rate) {
            (true, true) => {
                slots.set(ImageSlot::T2DoseRateOpen, record);
                let roi = RoiTable::t2_dose_rate_halcyon();
                slots.set_roi(SegmentSlot::T2DoseRate, roi);
            }
            (true, false) => slots.set(ImageSlot::T2Open, record),
            (false, true) => {
                slots.set(ImageSlot::T2DoseRateMlc, record);
                let roi = RoiTable::t2_dose_rate_halcyon();
                slots.set_roi(SegmentSlot::T2DoseRate, roi);
            }
            (false, false) => {
                slots.set(ImageSlot::T2Mlc, record);
                let jaw = require(
                    record,
                    record.tags.first_jaw_position,
                    "LeafJawPositions",
                    slot_name,
                )?;
                if jaw.trunc() == GANTRY_SPEED_JAW_POSITION {
                    let roi = RoiTable::t2_gantry_speed_halcyon();
                    slots.set_roi(SegmentSlot::T2GantrySpeed, roi);
                }
            }
        }
    } else if open_beam && (label.contains(T3_LABEL) || label.contains(T3_HALCYON_OPEN_LABEL)) {
        slots.set(ImageSlot::T3Open, record);
        if label.contains(T3_HALCYON_OPEN_LABEL) {
            let roi = RoiTable::t3_mlc_speed_halcyon();
            slots.set_roi(SegmentSlot::T3, roi);
        }
    } else if !open_beam && (label.contains(T3_LABEL) || label.contains(T3_HALCYON_MLC_LABEL)) {
        slots.set(ImageSlot::T3Mlc, record);
    }

    Ok(())
}

fn require(
    record: &AcquisitionRecord,
    value: Option<f64>,
    field: &'static str,
    slot: &'static str,
) -> Result<f64, ClassifyError> {
    value.ok_or_else(|| ClassifyError::MissingField {
        path: record.path.clone(),
        field,
        slot,
    })
}
