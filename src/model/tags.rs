//! Attribute tags read or written by the triage engine.

use dicom::core::Tag;

pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
pub const OPERATORS_NAME: Tag = Tag(0x0008, 0x1070);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);

pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);
pub const REFERENCED_INSTANCE_SEQUENCE: Tag = Tag(0x0008, 0x114A);
pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
pub const PURPOSE_OF_REFERENCE_CODE_SEQUENCE: Tag = Tag(0x0040, 0xA170);
pub const CODE_MEANING: Tag = Tag(0x0008, 0x0104);

pub const KVP: Tag = Tag(0x0018, 0x0060);
pub const MAGNETIC_FIELD_STRENGTH: Tag = Tag(0x0018, 0x0087);
pub const EXPOSURE: Tag = Tag(0x0018, 0x1152);
pub const FILTER_TYPE: Tag = Tag(0x0018, 0x1160);
pub const CONVOLUTION_KERNEL: Tag = Tag(0x0018, 0x1210);
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);
pub const CTDI_VOL: Tag = Tag(0x0018, 0x9345);
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);

pub const RT_IMAGE_LABEL: Tag = Tag(0x3002, 0x0002);
pub const EXPOSURE_SEQUENCE: Tag = Tag(0x3002, 0x0030);
pub const METERSET_EXPOSURE: Tag = Tag(0x3002, 0x0032);
pub const BEAM_LIMITING_DEVICE_SEQUENCE: Tag = Tag(0x300A, 0x00B6);
pub const LEAF_JAW_POSITIONS: Tag = Tag(0x300A, 0x011C);

/// Retired overlay curve label; portal imagers still write it on open fields.
pub const CURVE_LABEL: Tag = Tag(0x5000, 0x2500);

pub const RT_PLAN_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.5";
pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

/// Some vendors write the SOP class keyword instead of the UID.
pub fn is_sop_class(value: &str, uid: &str, name: &str) -> bool {
    let value = value.trim_end_matches('\0').trim();
    value == uid || value.eq_ignore_ascii_case(name)
}
