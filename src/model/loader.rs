use super::tags;
use super::{AcquisitionRecord, CtTechnique, LabelTags, Modality, PlanLinkage};
use crate::error::LoadError;
use dicom::core::Tag;
use dicom::object::{open_file, InMemDicomObject};
use std::path::PathBuf;

pub fn load_acquisition(path: PathBuf) -> Result<AcquisitionRecord, LoadError> {
    log::debug!("Loading DICOM file: {}", path.display());
    let object = open_file(&path).map_err(|err| LoadError::Open {
        path: path.clone(),
        message: err.to_string(),
    })?;

    let required = |tag: Tag, attribute: &'static str| {
        attribute_text(&object, tag).ok_or_else(|| LoadError::MissingAttribute {
            path: path.clone(),
            attribute,
        })
    };
    let acquisition_date = required(tags::SERIES_DATE, "SeriesDate")?;
    let acquisition_time = required(tags::SERIES_TIME, "SeriesTime")?;
    let subject_id = required(tags::PATIENT_ID, "PatientID")?;

    let modality = attribute_text(&object, tags::MODALITY)
        .map(|code| Modality::from_code(&code))
        .unwrap_or(Modality::Other);

    let tags = read_label_tags(&object);

    Ok(AcquisitionRecord {
        path,
        modality,
        acquisition_date,
        acquisition_time,
        subject_id,
        tags,
    })
}

fn read_label_tags(object: &InMemDicomObject) -> LabelTags {
    let exposure_item = first_item(object, tags::EXPOSURE_SEQUENCE);
    let meterset_exposure = exposure_item.and_then(|item| {
        attribute_f64(item, tags::METERSET_EXPOSURE)
    });
    let first_jaw_position = exposure_item
        .and_then(|item| first_item(item, tags::BEAM_LIMITING_DEVICE_SEQUENCE))
        .and_then(|d| attribute_multi_f64(d, tags::LEAF_JAW_POSITIONS))
        .and_then(|positions| positions.first().copied());

    let image_position = attribute_multi_f64(object, tags::IMAGE_POSITION_PATIENT)
        .and_then(|values| <[f64; 3]>::try_from(values.as_slice()).ok());

    let plan_linkage = object.get(tags::REFERENCED_INSTANCE_SEQUENCE).map(|_| {
        let item = first_item(object, tags::REFERENCED_INSTANCE_SEQUENCE);
        let purpose = item.and_then(|i| {
            first_item(i, tags::PURPOSE_OF_REFERENCE_CODE_SEQUENCE)
        });
        PlanLinkage {
            sop_class_uid: item.and_then(|i| {
                attribute_text(i, tags::REFERENCED_SOP_CLASS_UID)
            }),
            purpose_meaning: purpose.and_then(|code| {
                attribute_text(code, tags::CODE_MEANING)
            }),
        }
    });

    let referenced_image_class_uid = first_item(object, tags::REFERENCED_IMAGE_SEQUENCE)
        .and_then(|item| attribute_text(item, tags::REFERENCED_SOP_CLASS_UID));

    LabelTags {
        rt_image_label: attribute_text(object, tags::RT_IMAGE_LABEL),
        has_curve_label: object.get(tags::CURVE_LABEL).is_some(),
        meterset_exposure,
        first_jaw_position,
        patient_position: attribute_text(object, tags::PATIENT_POSITION),
        image_position,
        plan_linkage,
        referenced_image_class_uid,
        technique: CtTechnique {
            kvp: attribute_f64(object, tags::KVP),
            exposure_mas: attribute_f64(object, tags::EXPOSURE),
            filter_type: attribute_text(object, tags::FILTER_TYPE),
            convolution_kernel: attribute_text(object, tags::CONVOLUTION_KERNEL),
            ctdi_vol: attribute_f64(object, tags::CTDI_VOL),
        },
        series_description: attribute_text(object, tags::SERIES_DESCRIPTION),
        station_name: attribute_text(object, tags::STATION_NAME),
        operators_name: attribute_text(object, tags::OPERATORS_NAME),
        magnetic_field_strength: attribute_f64(object, tags::MAGNETIC_FIELD_STRENGTH),
    }
}

fn first_item(object: &InMemDicomObject, tag: Tag) -> Option<&InMemDicomObject> {
    object
        .get(tag)
        .and_then(|element| element.items())
        .and_then(|items| items.first())
}

fn attribute_text(object: &InMemDicomObject, tag: Tag) -> Option<String> {
    object
        .get(tag)
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim_end_matches('\0').trim().to_string())
        .filter(|value| !value.is_empty())
}

fn attribute_f64(object: &InMemDicomObject, tag: Tag) -> Option<f64> {
    object.get(tag).and_then(|e| e.to_float64().ok())
}

fn attribute_multi_f64(object: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    object
        .get(tag)
        .and_then(|element| element.to_multi_float64().ok())
        .filter(|values| !values.is_empty())
}
