mod common;

use common::{
    acquisition, cbct_slice, diagnostic_ct_slice, mr_slice, portal_image, read_text, winston_image,
    ScriptedAnalyzer, Workspace,
};
use pretty_assertions::assert_eq;
use qa_triage::analyzer::AnalysisRequest;
use qa_triage::model::tags;
use std::fs;
use std::sync::atomic::AtomicBool;

#[test]
fn halcyon_dose_rate_cohort_runs_t2_t3() {
    let ws = Workspace::new();
    for (label, open_beam, exposure, name) in [
        ("MV_243_DR", true, "60", "dr_open.dcm"),
        ("MV_243_DR", false, "60", "dr_mlc.dcm"),
        ("MV_32", true, "120", "t3_open.dcm"),
        ("MV_32", false, "120", "t3_mlc.dcm"),
    ] {
        let image = portal_image(label, open_beam, exposure, "-100");
        ws.place(image, &format!("LINAC1/{name}"));
    }

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);

    assert_eq!(summary.cohorts, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.swept, 0);

    let requests = analyzer.requests();
    assert_eq!(requests.len(), 2);
    assert!(matches!(requests[0], AnalysisRequest::Drmlc(_)));
    let AnalysisRequest::Drgs(dose_rate) = &requests[1] else {
        panic!("expected a dose-rate T2 request, got {:?}", requests[1]);
    };
    assert_eq!(dose_rate.images[0], ws.incoming("LINAC1/dr_open.dcm"));
    assert_eq!(dose_rate.roi.as_ref().map(|roi| roi.len()), Some(7));

    let rows = ws.rows("LINAC1", "T2-T3");
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0],
        vec![
            "Series date",
            "Series time",
            "T2DR_Pass/Fail",
            "T2DR_Max_deviation",
            "T2GS_Pass/Fail",
            "T2GS_Max_deviation",
            "T3_Pass/Fail",
            "T3_Max_deviation",
            "T2 DR (Avg)",
            "T2 GS (Avg)",
            "T3 LS (Avg)",
        ]
    );
    assert_eq!(rows[1][0], "19.04.2024");
    assert_eq!(rows[1][1], "09:33:10");

    for name in ["dr_open.dcm", "dr_mlc.dcm", "t3_open.dcm", "t3_mlc.dcm"] {
        let archived = ws.processed(&format!("T2-T3/LINAC1/{name}"));
        assert!(archived.is_file(), "{name} not archived");
    }
    assert!(!ws.incoming("LINAC1").exists());
}

#[test]
fn linac_cbct_uses_cbct_tolerances_and_archives_whole_series() {
    let ws = Workspace::new();
    for (index, z) in ["10", "12.5", "15"].iter().enumerate() {
        ws.place(cbct_slice(z, "FFS"), &format!("CBCT1/cat/{index}.dcm"));
    }

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);
    assert_eq!(summary.dispatched, 1);

    let requests = analyzer.requests();
    assert_eq!(requests.len(), 1);
    let AnalysisRequest::Phantom(phantom) = &requests[0] else {
        panic!("expected a phantom request, got {:?}", requests[0]);
    };
    assert_eq!(phantom.tolerances.hu_tolerance, 20.0);
    assert_eq!(phantom.folder, ws.incoming("CBCT1/cat"));
    assert_eq!(phantom.model, "CustomCP504");

    for index in 0..3 {
        let archived = ws.processed(&format!("Catphan/CBCT1/cat/{index}.dcm"));
        assert!(archived.is_file());
        let position = read_text(&archived, tags::PATIENT_POSITION);
        assert_eq!(position.as_deref(), Some("HFS"));
    }
    let middle = ws.processed("Catphan/CBCT1/cat/1.dcm");
    let flipped = read_text(&middle, tags::IMAGE_POSITION_PATIENT).unwrap();
    assert_eq!(flipped, "-120\\-120\\-12.5");

    let rows = ws.rows("CBCT1", "Catphan");
    assert_eq!(rows[0][8], "Linearity (HU, +/-20), Air");
    assert_eq!(rows[1][3], "125");
}

#[test]
fn diagnostic_ct_uses_diagnostic_tolerances() {
    let ws = Workspace::new();
    for (index, z) in ["0", "5", "10"].iter().enumerate() {
        ws.place(diagnostic_ct_slice(z), &format!("CT1/cat/{index}.dcm"));
    }

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);
    assert_eq!(summary.dispatched, 1);

    let requests = analyzer.requests();
    assert_eq!(requests.len(), 1);
    let AnalysisRequest::Phantom(phantom) = &requests[0] else {
        panic!("expected a phantom request, got {:?}", requests[0]);
    };
    assert_eq!(phantom.tolerances.hu_tolerance, 10.0);

    let rows = ws.rows("CT1", "Catphan");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][8], "Linearity (HU, +/-10), Air");
    for index in 0..3 {
        let archived = ws.processed(&format!("Catphan/CT1/cat/{index}.dcm"));
        assert!(archived.is_file());
    }
}

#[test]
fn winston_lutz_analyses_and_archives_the_whole_folder() {
    let mut ws = Workspace::new();
    ws.config.bb_size_mm = 8.0;
    ws.config.pdf = true;
    for gantry in ["0", "90", "180", "270"] {
        ws.place(winston_image(), &format!("WL/LINAC2/g{gantry}.dcm"));
    }
    let setup = ws.incoming("WL/LINAC2/setup.txt");
    fs::write(setup, b"couch 0").unwrap();

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.swept, 0);

    let requests = analyzer.requests();
    assert_eq!(requests.len(), 1);
    let AnalysisRequest::WinstonLutz(wl) = &requests[0] else {
        panic!("expected a Winston-Lutz request, got {:?}", requests[0]);
    };
    assert_eq!(wl.bb_size_mm, 8.0);
    assert_eq!(wl.folder, ws.incoming("WL/LINAC2"));
    let reports = ws.config.save_path.join("Winston-Lutz reports");
    let stem = "LINAC2_TrueBeam1_20240424_140000_Winston_Lutz";
    let report = reports.join(format!("{stem}.pdf"));
    assert_eq!(wl.report.pdf, Some(report));
    assert_eq!(wl.report.notes[0], "Device: TrueBeam1");

    let rows = ws.rows("LINAC2", "Winston-Lutz");
    assert_eq!(
        rows[0],
        vec![
            "Series date",
            "Series time",
            "Pass/Fail",
            "Max 2D CAX->BB (mm)",
            "Median 2D CAX->BB (mm)",
            "Images analyzed",
        ]
    );
    assert_eq!(rows[1][0], "24.04.2024");
    assert_eq!(rows[1][5], "8");

    for name in ["g0.dcm", "g90.dcm", "g180.dcm", "g270.dcm", "setup.txt"] {
        let archived = ws.processed(&format!("Winston-Lutz/WL/LINAC2/{name}"));
        assert!(archived.is_file(), "{name} not archived");
    }
    assert!(!ws.incoming("WL").exists());
}

#[test]
fn acr_series_with_a_stray_text_file_is_still_analysed() {
    let ws = Workspace::new();
    for index in 0..3 {
        ws.place(mr_slice("3"), &format!("MR/series/{index}.dcm"));
    }
    let stray = ws.incoming("MR/series/notes.txt");
    fs::write(stray, b"coil: head").unwrap();

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);

    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.swept, 0);
    assert_eq!(analyzer.requests().len(), 1);
    assert!(ws.processed("ACR/MR/series/0.dcm").is_file());
    let notes = fs::read(ws.processed("ACR/MR/series/notes.txt")).unwrap();
    assert_eq!(notes, b"coil: head");
}

#[test]
fn acr_field_strength_is_written_before_analysis() {
    let mut ws = Workspace::new();
    ws.config.field_strength = 1.5;
    for index in 0..3 {
        ws.place(mr_slice("3"), &format!("ACR/series/{index}.dcm"));
    }

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);
    assert_eq!(summary.dispatched, 1);
    let requests = analyzer.requests();
    assert!(matches!(requests[0], AnalysisRequest::MrPhantom(_)));

    // The incoming path already has an ACR folder, so no second one is added.
    for index in 0..3 {
        let archived = ws.processed(&format!("ACR/series/{index}.dcm"));
        let strength = read_text(&archived, tags::MAGNETIC_FIELD_STRENGTH);
        assert_eq!(strength.as_deref(), Some("1.5"));
    }
    let rows = ws.rows("MRI1", "ACR");
    assert_eq!(rows[0][3], "Geometric distortion (mm)");
}

#[test]
fn repeated_pass_does_not_duplicate_rows() {
    let ws = Workspace::new();
    let analyzer = ScriptedAnalyzer::default();

    for _ in 0..2 {
        let radiograph = acquisition("CR", "20240422", "101010", "XRAY1");
        ws.place(radiograph, "XRAY/normi.dcm");
        let summary = ws.pass(&analyzer);
        assert_eq!(summary.dispatched, 1);
    }

    assert_eq!(analyzer.requests().len(), 2);
    assert_eq!(ws.rows("XRAY1", "Normi-13").len(), 2);
    assert!(ws.processed("Normi-13/XRAY/normi.dcm").is_file());
}

#[test]
fn analysed_file_that_cannot_be_archived_stays_for_the_next_pass() {
    let ws = Workspace::new();
    let radiograph = acquisition("CR", "20240422", "101010", "XRAY1");
    let image = ws.place(radiograph, "XRAY/normi.dcm");
    let blocked = ws.processed("Normi-13/XRAY/normi.dcm/blocked");
    fs::create_dir_all(blocked).unwrap();

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);

    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.swept, 0);
    assert!(image.is_file());
    assert!(!ws.processed("Not_analyzed").exists());
    assert_eq!(ws.rows("XRAY1", "Normi-13").len(), 2);
}

#[test]
fn unrecognised_and_foreign_files_are_swept() {
    let ws = Workspace::new();
    let plain_ct = acquisition("CT", "20240423", "080000", "SCANNER");
    ws.place(plain_ct, "misc/ct/plain.dcm");
    let readme = ws.incoming("misc/readme.txt");
    fs::write(readme, b"notes").unwrap();

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass(&analyzer);

    assert_eq!(summary.unrecognised, 1);
    assert_eq!(summary.swept, 2);
    assert!(analyzer.requests().is_empty());
    assert!(ws.processed("Not_analyzed/misc/ct/plain.dcm").is_file());
    assert!(ws.processed("Not_analyzed/misc/readme.txt").is_file());
    assert!(!ws.incoming("misc").exists());
    assert!(ws.config.data_path.is_dir());
    assert!(!ws.workbook("SCANNER").exists());
}

#[test]
fn interrupted_pass_leaves_files_in_place() {
    let ws = Workspace::new();
    let radiograph = acquisition("CR", "20240422", "101010", "XRAY1");
    let image = ws.place(radiograph, "XRAY/normi.dcm");

    let analyzer = ScriptedAnalyzer::default();
    let summary = ws.pass_with(&analyzer, &AtomicBool::new(true));

    assert!(summary.interrupted);
    assert_eq!(summary.dispatched, 0);
    assert!(image.is_file());
}
