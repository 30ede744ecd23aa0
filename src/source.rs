//! Metadata corrections written back to the source DICOM files.

use crate::error::SourceError;
use crate::model::tags;
use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::{open_file, DefaultDicomObject};
use std::path::Path;

/// Persists the two corrections the classifier is allowed to make.
pub trait SourceEditor {
    fn write_orientation(
        &self,
        path: &Path,
        patient_position: &str,
        image_position: [f64; 3],
    ) -> Result<(), SourceError>;

    fn write_field_strength(&self, path: &Path, tesla: f64) -> Result<(), SourceError>;
}

/// Rewrites files in place with the `dicom` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomSourceEditor;

impl DicomSourceEditor {
    fn update(path: &Path, edit: impl FnOnce(&mut DefaultDicomObject)) -> Result<(), SourceError> {
        let mut object = open_file(path).map_err(|err| SourceError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        edit(&mut object);
        object.write_to_file(path).map_err(|err| SourceError::Dicom {
            path: path.to_path_buf(),
            message: format!("failed to save DICOM file ({err})"),
        })
    }
}

impl SourceEditor for DicomSourceEditor {
    fn write_orientation(
        &self,
        path: &Path,
        patient_position: &str,
        image_position: [f64; 3],
    ) -> Result<(), SourceError> {
        let position = image_position
            .iter()
            .map(|value| format_decimal(*value))
            .collect::<Vec<_>>()
            .join("\\");
        Self::update(path, |object| {
            object.put(DataElement::new(
                tags::PATIENT_POSITION,
                VR::CS,
                PrimitiveValue::from(patient_position),
            ));
            object.put(DataElement::new(
                tags::IMAGE_POSITION_PATIENT,
                VR::DS,
                PrimitiveValue::from(position),
            ));
        })?;
        log::debug!("Normalized orientation of {}", path.display());
        Ok(())
    }

    fn write_field_strength(&self, path: &Path, tesla: f64) -> Result<(), SourceError> {
        Self::update(path, |object| {
            object.put(DataElement::new(
                tags::MAGNETIC_FIELD_STRENGTH,
                VR::DS,
                PrimitiveValue::from(format_decimal(tesla)),
            ));
        })?;
        log::debug!("Set field strength {tesla} T on {}", path.display());
        Ok(())
    }
}

/// Decimal string value, at most 16 characters.
fn format_decimal(value: f64) -> String {
    let rendered = value.to_string();
    if rendered.len() <= 16 {
        return rendered;
    }
    let mut rendered = format!("{value:.6}");
    while rendered.contains('.') && (rendered.ends_with('0') || rendered.ends_with('.')) {
        rendered.pop();
    }
    rendered
}
