//! Row layouts, one per results sheet.

use super::{CellValue, LedgerRow};
use crate::analyzer::{
    DoseRateResult, MrPhantomResult, PhantomResult, RadiographicResult, WinstonLutzResult,
    MTF_LINE_PAIR_COUNT,
};
use crate::config::PhantomTolerances;
use crate::error::LedgerError;
use crate::model::AcquisitionRecord;
use crate::utils::{format_series_date, format_series_time, round_to, PRECISION};

fn rounded(value: f64) -> CellValue {
    CellValue::Number(round_to(value, PRECISION))
}

fn truncated(value: f64) -> CellValue {
    CellValue::Number(value.trunc())
}

/// Starts a row with the series date and time of `record`.
fn dated_row(record: &AcquisitionRecord) -> Result<LedgerRow, LedgerError> {
    let date = format_series_date(&record.acquisition_date).ok_or_else(|| LedgerError::Format {
        field: "series date",
        value: record.acquisition_date.clone(),
    })?;
    let time = format_series_time(&record.acquisition_time).ok_or_else(|| LedgerError::Format {
        field: "series time",
        value: record.acquisition_time.clone(),
    })?;

    let mut row = LedgerRow::default();
    row.push("Series date", date);
    row.push("Series time", time);
    Ok(row)
}

/// Which T2 variants ran alongside T3.
#[derive(Debug, Clone, Copy)]
pub enum T2Results<'a> {
    Standard(&'a DoseRateResult),
    /// Halcyon layout; the gantry-speed cells stay blank if that pair was not acquired.
    WithDoseRate {
        dose_rate: &'a DoseRateResult,
        gantry_speed: Option<&'a DoseRateResult>,
    },
}

pub fn t2_t3_row(
    record: &AcquisitionRecord,
    t2: T2Results<'_>,
    t3: &DoseRateResult,
) -> Result<LedgerRow, LedgerError> {
    let mut row = dated_row(record)?;
    match t2 {
        T2Results::Standard(t2) => {
            row.push("T2_Pass/Fail", t2.passed);
            row.push("T2_Max_deviation", rounded(t2.max_deviation_percent));
            row.push("T3_Pass/Fail", t3.passed);
            row.push("T3_Max_deviation", rounded(t3.max_deviation_percent));
            row.push("T2 DR GS (Avg)", rounded(t2.abs_mean_deviation));
            row.push("T3 MLC SPEED (Avg)", rounded(t3.abs_mean_deviation));
        }
        T2Results::WithDoseRate {
            dose_rate,
            gantry_speed,
        } => {
            row.push("T2DR_Pass/Fail", dose_rate.passed);
            let dr_max = rounded(dose_rate.max_deviation_percent);
            row.push("T2DR_Max_deviation", dr_max);
            row.push("T2GS_Pass/Fail", gantry_speed.map(|gs| gs.passed));
            row.push(
                "T2GS_Max_deviation",
                gantry_speed.map(|gs| rounded(gs.max_deviation_percent)),
            );
            row.push("T3_Pass/Fail", t3.passed);
            row.push("T3_Max_deviation", rounded(t3.max_deviation_percent));
            row.push("T2 DR (Avg)", rounded(dose_rate.abs_mean_deviation));
            row.push(
                "T2 GS (Avg)",
                gantry_speed.map(|gs| rounded(gs.abs_mean_deviation)),
            );
            row.push("T3 LS (Avg)", rounded(t3.abs_mean_deviation));
        }
    }
    Ok(row)
}

/// Catphan row. Tolerances and MTF frequencies are part of the header text.
pub fn phantom_row(
    record: &AcquisitionRecord,
    result: &PhantomResult,
    tolerances: &PhantomTolerances,
) -> Result<LedgerRow, LedgerError> {
    let technique = &record.tags.technique;
    let mut row = dated_row(record)?;

    row.push("Series description", record.tags.series_description.clone());
    row.push("KVP", technique.kvp.map(f64::trunc));
    row.push("mAs", technique.exposure_mas.map(f64::trunc));
    row.push("Filter type", technique.filter_type.clone());
    row.push("Convolution kernel", technique.convolution_kernel.clone());
    let ctdi_vol = technique.ctdi_vol.map(|v| round_to(v, PRECISION));
    row.push("CTDIvol", ctdi_vol);

    let hu = result.hu_differences.values();
    let hu_headers = [
        format!("Linearity (HU, +/-{}), Air", tolerances.hu_tolerance),
        "PMP".to_string(),
        "LDPE".to_string(),
        "Polystyrene".to_string(),
        "Acrylic".to_string(),
        "Delrin".to_string(),
        "Teflon".to_string(),
    ];
    for (header, value) in hu_headers.into_iter().zip(hu) {
        row.push(header, truncated(value));
    }

    let scaling = tolerances.scaling_tolerance;
    row.push(
        format!("Average line distance (mm, < {scaling}mm error)"),
        rounded(result.avg_line_distance_mm),
    );
    let thickness = tolerances.thickness_tolerance;
    row.push(
        format!("Slice thickness (mm, < {thickness}mm error)"),
        rounded(result.measured_slice_thickness_mm),
    );

    let uniformity_headers = [
        format!("Uniformity (HU, +/-{}), Center", tolerances.hu_tolerance),
        "Top".to_string(),
        "Right".to_string(),
        "Bottom".to_string(),
        "Left".to_string(),
    ];
    let uniformity = result.uniformity.values();
    for (header, value) in uniformity_headers.into_iter().zip(uniformity) {
        row.push(header, truncated(value));
    }

    let visibility = rounded(result.low_contrast_visibility);
    row.push("Low contrast visibility", visibility);
    let low_contrast = tolerances.low_contrast_tolerance;
    row.push(
        format!("Low contrast ROIs seen (> {low_contrast})"),
        f64::from(result.low_contrast_rois_seen),
    );

    row.push("MTF 80%", rounded(result.mtf_lp_mm.mtf_80));
    row.push("MTF 50%", rounded(result.mtf_lp_mm.mtf_50));
    row.push("MTF 30%", rounded(result.mtf_lp_mm.mtf_30));
    for point in result.mtf_points.iter().take(MTF_LINE_PAIR_COUNT) {
        let header = format!("MTF {} lp/mm", point.line_pairs_per_mm);
        row.push(header, rounded(point.value));
    }
    Ok(row)
}

pub fn acr_row(
    record: &AcquisitionRecord,
    result: &MrPhantomResult,
) -> Result<LedgerRow, LedgerError> {
    let mut row = dated_row(record)?;
    row.push("Pass/Fail", result.passed);
    let distortion = rounded(result.geometric_distortion_mm);
    row.push("Geometric distortion (mm)", distortion);
    row.push("Uniformity PIU (%)", rounded(result.uniformity_piu_percent));
    row.push("Ghosting ratio (%)", rounded(result.ghosting_ratio_percent));
    row.push("Slice thickness (mm)", rounded(result.slice_thickness_mm));
    Ok(row)
}

pub fn winston_row(
    record: &AcquisitionRecord,
    result: &WinstonLutzResult,
) -> Result<LedgerRow, LedgerError> {
    let mut row = dated_row(record)?;
    row.push("Pass/Fail", result.passed);
    row.push("Max 2D CAX->BB (mm)", rounded(result.max_2d_cax_to_bb_mm));
    let median = rounded(result.median_2d_cax_to_bb_mm);
    row.push("Median 2D CAX->BB (mm)", median);
    row.push("Images analyzed", f64::from(result.num_total_images));
    Ok(row)
}

pub fn radiographic_row(
    record: &AcquisitionRecord,
    result: &RadiographicResult,
) -> Result<LedgerRow, LedgerError> {
    let mut row = dated_row(record)?;
    row.push("Pass/Fail", result.passed);
    row.push("Max deviation", rounded(result.max_deviation));
    let seen = result.low_contrast_rois_seen.map(f64::from);
    row.push("Low contrast ROIs seen", seen);
    Ok(row)
}
