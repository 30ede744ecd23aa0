use super::AcquisitionRecord;
use crate::config::{RoiTable, SegmentSize};
use crate::error::DispatchError;
use std::collections::BTreeMap;

/// Role an acquisition plays in one of the QA tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSlot {
    T2Open,
    T2Mlc,
    T2DoseRateOpen,
    T2DoseRateMlc,
    T3Open,
    T3Mlc,
    Catphan,
    CatphanLinac,
    Acr,
    Winston,
    Normi13,
}

impl ImageSlot {
    pub const T2_T3: [ImageSlot; 6] = [
        ImageSlot::T2Mlc,
        ImageSlot::T2Open,
        ImageSlot::T3Mlc,
        ImageSlot::T3Open,
        ImageSlot::T2DoseRateMlc,
        ImageSlot::T2DoseRateOpen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::T2Open => "t2_open",
            Self::T2Mlc => "t2_mlc",
            Self::T2DoseRateOpen => "t2_dr_open",
            Self::T2DoseRateMlc => "t2_dr_mlc",
            Self::T3Open => "t3_open",
            Self::T3Mlc => "t3_mlc",
            Self::Catphan => "catphan",
            Self::CatphanLinac => "catphan_linac",
            Self::Acr => "acr",
            Self::Winston => "winston",
            Self::Normi13 => "normi_13",
        }
    }
}

/// Analysis whose segment layout can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentSlot {
    T2DoseRate,
    T2GantrySpeed,
    T3,
}

/// Evidence gathered for one cohort.
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    images: BTreeMap<ImageSlot, AcquisitionRecord>,
    rois: BTreeMap<SegmentSlot, RoiTable>,
    segment_sizes: BTreeMap<SegmentSlot, SegmentSize>,
}

impl SlotMap {
    pub fn contains(&self, slot: ImageSlot) -> bool {
        self.images.contains_key(&slot)
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&AcquisitionRecord> {
        self.images.get(&slot)
    }

    pub fn image(&self, slot: ImageSlot) -> Result<&AcquisitionRecord, DispatchError> {
        self.get(slot)
            .ok_or(DispatchError::MissingSlot(slot.name()))
    }

    /// Stores `record`, replacing whatever the slot held.
    pub fn set(&mut self, slot: ImageSlot, record: &AcquisitionRecord) {
        self.images.insert(slot, record.clone());
    }

    /// Stores `record` only when the slot is empty. Returns whether it was stored.
    pub fn fill_first(&mut self, slot: ImageSlot, record: &AcquisitionRecord) -> bool {
        if self.contains(slot) {
            return false;
        }
        self.set(slot, record);
        true
    }

    pub fn set_roi(&mut self, slot: SegmentSlot, table: RoiTable) {
        self.rois.insert(slot, table);
    }

    pub fn roi(&self, slot: SegmentSlot) -> Option<&RoiTable> {
        self.rois.get(&slot)
    }

    pub fn set_segment_size(&mut self, slot: SegmentSlot, size: SegmentSize) {
        self.segment_sizes.insert(slot, size);
    }

    pub fn segment_size(&self, slot: SegmentSlot) -> Option<SegmentSize> {
        self.segment_sizes.get(&slot).copied()
    }

    pub fn filled_names(&self) -> Vec<&'static str> {
        self.images.keys().map(|slot| slot.name()).collect()
    }
}
