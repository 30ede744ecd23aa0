//! Chooses one analysis per cohort and carries it through to the ledger and
//! the archive.

use crate::analyzer::{
    AnalysisRequest, Analyzer, DoseRateRequest, DoseRateResult, MrPhantomRequest, PhantomRequest,
    RadiographicRequest, ReportOptions, WinstonLutzRequest,
};
use crate::archive::Archive;
use crate::config::{PhantomTolerances, RunConfig, DRGS_TOLERANCE, DRMLC_TOLERANCE};
use crate::error::{DispatchError, SourceError};
use crate::ledger::schema::{self, T2Results};
use crate::ledger::{lock, AppendOutcome, Ledger, LedgerRow};
use crate::model::loader::load_acquisition;
use crate::model::{AcquisitionRecord, ImageSlot, SegmentSlot, SlotMap, TestKind};
use crate::scan::list_series_files;
use crate::source::SourceEditor;
use crate::utils::file_name_component;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    T2T3,
    Catphan,
    CatphanLinac,
    Acr,
    WinstonLutz,
    Normi13,
}

/// Trigger slot and branch, highest priority first.
pub const RULES: [(ImageSlot, Branch); 6] = [
    (ImageSlot::T3Mlc, Branch::T2T3),
    (ImageSlot::Catphan, Branch::Catphan),
    (ImageSlot::CatphanLinac, Branch::CatphanLinac),
    (ImageSlot::Acr, Branch::Acr),
    (ImageSlot::Winston, Branch::WinstonLutz),
    (ImageSlot::Normi13, Branch::Normi13),
];

/// First rule whose trigger slot is filled.
pub fn resolve(slots: &SlotMap) -> Option<Branch> {
    RULES
        .iter()
        .find(|(trigger, _)| slots.contains(*trigger))
        .map(|(_, branch)| *branch)
}

/// What one successful dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub branch: Branch,
    pub ledger: AppendOutcome,
    pub moved: usize,
}

/// Everything a handler needs besides the slot map.
pub struct Dispatcher<'a> {
    pub config: &'a RunConfig,
    pub analyzer: &'a dyn Analyzer,
    pub editor: &'a dyn SourceEditor,
    pub ledger: &'a Ledger,
    pub archive: &'a Archive,
}

impl Dispatcher<'_> {
    /// Runs the branch chosen by [`resolve`]. `Ok(None)` means no rule matched
    /// and nothing was touched.
    pub fn dispatch(&self, slots: &SlotMap) -> Result<Option<Dispatched>, DispatchError> {
        let Some(branch) = resolve(slots) else {
            return Ok(None);
        };

        let (ledger, moved) = match branch {
            Branch::T2T3 => self.run_t2_t3(slots)?,
            Branch::Catphan => self.run_phantom(
                slots.image(ImageSlot::Catphan)?,
                PhantomTolerances::diagnostic(),
            )?,
            Branch::CatphanLinac => self.run_phantom(
                slots.image(ImageSlot::CatphanLinac)?,
                PhantomTolerances::cbct(),
            )?,
            Branch::Acr => self.run_acr(slots.image(ImageSlot::Acr)?)?,
            Branch::WinstonLutz => self.run_winston(slots.image(ImageSlot::Winston)?)?,
            Branch::Normi13 => self.run_normi_13(slots.image(ImageSlot::Normi13)?)?,
        };

        Ok(Some(Dispatched {
            branch,
            ledger,
            moved,
        }))
    }

    /// Standard T2 needs its pair unless the dose-rate pair stands in for it.
    fn run_t2_t3(&self, slots: &SlotMap) -> Result<(AppendOutcome, usize), DispatchError> {
        let dose_rate_pair = slots
            .get(ImageSlot::T2DoseRateOpen)
            .zip(slots.get(ImageSlot::T2DoseRateMlc));
        let standard_pair = match dose_rate_pair {
            Some(_) => slots
                .get(ImageSlot::T2Open)
                .zip(slots.get(ImageSlot::T2Mlc)),
            None => Some((
                slots.image(ImageSlot::T2Open)?,
                slots.image(ImageSlot::T2Mlc)?,
            )),
        };
        let t3_mlc = slots.image(ImageSlot::T3Mlc)?;
        let t3_open = slots.image(ImageSlot::T3Open)?;

        let beam = Beam::GantrySpeed;
        let t2 = standard_pair
            .map(|(open, mlc)| self.dose_rate(slots, beam, open, mlc))
            .transpose()?;
        let t3 = self.dose_rate(slots, Beam::MlcSpeed, t3_open, t3_mlc)?;
        let beam = Beam::DoseRate;
        let t2_dose_rate = dose_rate_pair
            .map(|(open, mlc)| self.dose_rate(slots, beam, open, mlc))
            .transpose()?;

        let (t2_results, timestamp) = match (&t2_dose_rate, &t2, dose_rate_pair, standard_pair) {
            (Some(dose_rate), gantry_speed, Some((_, dr_mlc)), pair) => (
                T2Results::WithDoseRate {
                    dose_rate,
                    gantry_speed: gantry_speed.as_ref(),
                },
                pair.map_or(dr_mlc, |(_, mlc)| mlc),
            ),
            (_, Some(t2), _, Some((_, mlc))) => (T2Results::Standard(t2), mlc),
            _ => return Err(DispatchError::MissingSlot(ImageSlot::T2Mlc.name())),
        };

        let row = schema::t2_t3_row(timestamp, t2_results, &t3)?;
        let outcome = self
            .ledger
            .append(&timestamp.subject_id, TestKind::T2T3, &row)?;

        let analyzed = ImageSlot::T2_T3
            .iter()
            .filter_map(|slot| slots.get(*slot))
            .map(|record| record.path.as_path());
        let moved = self.archive.relocate_all(analyzed, TestKind::T2T3.name())?;
        Ok((outcome, moved))
    }

    fn dose_rate(
        &self,
        slots: &SlotMap,
        beam: Beam,
        open: &AcquisitionRecord,
        mlc: &AcquisitionRecord,
    ) -> Result<DoseRateResult, DispatchError> {
        log::info!("Running {} test for {}", beam.label(), mlc.file_name());

        let segment = beam.segment();
        let roi = slots.roi(segment).cloned();
        let segment_size_mm = roi.as_ref().and_then(|_| slots.segment_size(segment));
        let request = DoseRateRequest {
            images: [open.path.clone(), mlc.path.clone()],
            tolerance_percent: beam.tolerance(),
            roi,
            segment_size_mm,
            report: self.report(
                TestKind::T2T3,
                report_stem(mlc, beam.report_suffix()),
                mlc,
            )?,
        };
        let request = match beam {
            Beam::MlcSpeed => AnalysisRequest::Drmlc(request),
            Beam::GantrySpeed | Beam::DoseRate => AnalysisRequest::Drgs(request),
        };
        Ok(self.analyzer.dose_rate(&request)?)
    }

    fn run_phantom(
        &self,
        record: &AcquisitionRecord,
        tolerances: PhantomTolerances,
    ) -> Result<(AppendOutcome, usize), DispatchError> {
        log::info!("Running Catphan analysis for {}", record.file_name());
        let folder = record.series_folder();
        self.analyze_series(folder, TestKind::Catphan, |_, representative| {
            let request = PhantomRequest {
                folder: folder.to_path_buf(),
                model: self.config.catphan_model.clone(),
                tolerances: tolerances.clone(),
                report: self.report(
                    TestKind::Catphan,
                    report_stem(representative, "Catphan"),
                    representative,
                )?,
            };
            let result = self.analyzer.phantom(request)?;
            Ok(schema::phantom_row(representative, &result, &tolerances)?)
        })
    }

    fn run_acr(&self, record: &AcquisitionRecord) -> Result<(AppendOutcome, usize), DispatchError> {
        log::info!("Running ACR analysis for {}", record.file_name());
        let folder = record.series_folder();
        let tesla = self.config.field_strength;
        self.analyze_series(folder, TestKind::Acr, |files, representative| {
            for file in files {
                match self.editor.write_field_strength(file, tesla) {
                    Ok(()) => {}
                    Err(SourceError::Unreadable { path, message }) => {
                        log::debug!("Not patching {} ({message})", path.display());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            let request = MrPhantomRequest {
                folder: folder.to_path_buf(),
                report: self.report(
                    TestKind::Acr,
                    report_stem(representative, "ACR"),
                    representative,
                )?,
            };
            let result = self.analyzer.mr_phantom(request)?;
            Ok(schema::acr_row(representative, &result)?)
        })
    }

    fn run_winston(
        &self,
        record: &AcquisitionRecord,
    ) -> Result<(AppendOutcome, usize), DispatchError> {
        log::info!("Running Winston-Lutz analysis for {}", record.file_name());
        let kind = TestKind::WinstonLutz;
        let folder = record.series_folder();
        let stem = format!(
            "{}_{}_{}_{}_Winston_Lutz",
            record.subject_id,
            record.tags.station_name.as_deref().unwrap_or_default(),
            record.acquisition_date,
            record.acquisition_time
        );
        let request = WinstonLutzRequest {
            folder: folder.to_path_buf(),
            bb_size_mm: self.config.bb_size_mm,
            report: self.report(kind, stem, record)?,
        };
        let result = self.analyzer.winston_lutz(request)?;

        let row = schema::winston_row(record, &result)?;
        let outcome = self.ledger.append(&record.subject_id, kind, &row)?;
        let files = list_series_files(folder);
        let paths = files.iter().map(PathBuf::as_path);
        let moved = self.archive.relocate_all(paths, kind.name())?;
        Ok((outcome, moved))
    }

    fn run_normi_13(
        &self,
        record: &AcquisitionRecord,
    ) -> Result<(AppendOutcome, usize), DispatchError> {
        log::info!("Running Normi-13 analysis for {}", record.file_name());
        let kind = TestKind::Normi13;
        let request = RadiographicRequest {
            image: record.path.clone(),
            report: self.report(kind, report_stem(record, "Normi13"), record)?,
        };
        let result = self.analyzer.radiographic(request)?;

        let row = schema::radiographic_row(record, &result)?;
        let outcome = self.ledger.append(&record.subject_id, kind, &row)?;
        let paths = [record.path.as_path()];
        let moved = self.archive.relocate_all(paths, kind.name())?;
        Ok((outcome, moved))
    }

    /// Analyses a series folder until it is empty, a round moves nothing or
    /// the phantom timeout passes. Late-arriving slices get their own round.
    fn analyze_series<F>(
        &self,
        folder: &Path,
        kind: TestKind,
        mut round: F,
    ) -> Result<(AppendOutcome, usize), DispatchError>
    where
        F: FnMut(&[PathBuf], &AcquisitionRecord) -> Result<LedgerRow, DispatchError>,
    {
        let start = Instant::now();
        let mut outcome = None;
        let mut moved_total = 0;

        loop {
            let files = list_series_files(folder);
            if files.is_empty() {
                break;
            }
            let Some(representative) = first_readable(&files) else {
                return Err(DispatchError::EmptySeries {
                    folder: folder.to_path_buf(),
                });
            };

            let row = round(&files, &representative)?;
            outcome = Some(self.ledger.append(&representative.subject_id, kind, &row)?);

            let paths = files.iter().map(PathBuf::as_path);
            let moved = self.archive.relocate_all(paths, kind.name())?;
            moved_total += moved;
            if moved == 0 || start.elapsed() >= self.config.phantom_timeout() {
                break;
            }
        }

        let outcome = outcome.ok_or_else(|| DispatchError::EmptySeries {
            folder: folder.to_path_buf(),
        })?;
        Ok((outcome, moved_total))
    }

    /// Report options for one analysis; no PDF path unless reports are on and
    /// an existing report is not held open.
    fn report(
        &self,
        kind: TestKind,
        stem: String,
        record: &AcquisitionRecord,
    ) -> Result<ReportOptions, DispatchError> {
        let mut options = ReportOptions {
            plot: self.config.plot,
            ..ReportOptions::default()
        };
        if !self.config.pdf {
            return Ok(options);
        }

        let dir = self.config.save_path.join(kind.report_folder());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.pdf", file_name_component(&stem)));
        if !lock::wait_until_writable(&path, &self.config.ledger_wait)? {
            log::debug!("Skipping report {}", path.display());
            return Ok(options);
        }

        options.pdf = Some(path);
        let station = record.tags.station_name.as_deref().unwrap_or_default();
        let operator = record.tags.operators_name.as_deref().unwrap_or_default();
        options.notes = vec![
            format!("Device: {station}"),
            format!("Operator: {operator}"),
        ];
        Ok(options)
    }
}

#[derive(Debug, Clone, Copy)]
enum Beam {
    GantrySpeed,
    MlcSpeed,
    DoseRate,
}

impl Beam {
    fn label(self) -> &'static str {
        match self {
            Self::GantrySpeed => "DRGS",
            Self::MlcSpeed => "DRMLC",
            Self::DoseRate => "DRGS (dose rate)",
        }
    }

    fn segment(self) -> SegmentSlot {
        match self {
            Self::GantrySpeed => SegmentSlot::T2GantrySpeed,
            Self::MlcSpeed => SegmentSlot::T3,
            Self::DoseRate => SegmentSlot::T2DoseRate,
        }
    }

    fn tolerance(self) -> f64 {
        match self {
            Self::GantrySpeed | Self::DoseRate => DRGS_TOLERANCE,
            Self::MlcSpeed => DRMLC_TOLERANCE,
        }
    }

    fn report_suffix(self) -> &'static str {
        match self {
            Self::GantrySpeed => "t2",
            Self::MlcSpeed => "t3",
            Self::DoseRate => "t2dr",
        }
    }
}

fn report_stem(record: &AcquisitionRecord, suffix: &str) -> String {
    format!(
        "{}_{}_{}_{suffix}",
        record.subject_id, record.acquisition_date, record.acquisition_time
    )
}

fn first_readable(files: &[PathBuf]) -> Option<AcquisitionRecord> {
    files.iter().find_map(|path| match load_acquisition(path.clone()) {
        Ok(record) => Some(record),
        Err(e) => {
            log::debug!("Skipping unreadable slice: {e}");
            None
        }
    })
}
