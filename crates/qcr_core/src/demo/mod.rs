use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

const WELD_DEFECT: &str = "\
Case QC-2024-017: Welding defect (porosity) on bracket assembly line 3

Symptom: Blowholes and porosity were found in fillet welds during visual and X-ray inspection.
Defect rate rose from 0.4% to 3.1% over two shifts.

Root cause: Shielding gas flow dropped to 8 L/min because of a kinked hose, and the
base metal surface carried residual cutting oil.

Corrective action: Replaced the gas hose, restored shielding gas flow to 15-20 L/min,
and added degreasing of the weld joint before welding. All suspect lots were re-inspected
with X-ray and 42 parts were reworked.

Preventive measures: Gas flow check added to the start-of-shift checklist, flow meter
with low-flow alarm installed, and welders retrained on joint cleaning.
";

const DIMENSION_DEFECT: &str = "\
Case QC-2024-031: Dimensional defect on machined housing bore

Symptom: Bore diameter out of tolerance (+0.035 mm) on 18 housings found at final inspection.

Root cause: Tool wear on the boring bar was not compensated; the tool change interval
had been extended without validation.

Corrective action: Replaced the boring bar, re-measured the lot with a CMM and
quarantined nonconforming parts.

Preventive measures: Tool life counter enforced in the CNC program, first-article
inspection after each tool change, and SPC chart on bore diameter.
";

const PAINT_LOG: &str = "\
case_id,date,defect,cause,corrective_action
QC-2024-044,2024-05-12,Paint peeling on cover panel,Insufficient pretreatment rinse,Restored rinse conductivity limit and re-coated affected panels
QC-2024-052,2024-06-03,Orange peel texture,Spray gun pressure too high,Recalibrated spray gun pressure and added hourly texture check
";

/// Write a small, deterministic set of quality cases into `dir`.
///
/// Existing files with the same names are overwritten.
pub fn seed_demo_folder(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new("DEMO_SEED_FAILED", "Failed to create demo data folder")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let files = [
        ("weld_defect.txt", WELD_DEFECT),
        ("dimension_defect.txt", DIMENSION_DEFECT),
        ("paint_defects.csv", PAINT_LOG),
    ];
    let mut out = Vec::new();
    for (name, body) in files {
        let path = dir.join(name);
        fs::write(&path, body).map_err(|e| {
            AppError::new("DEMO_SEED_FAILED", "Failed to write demo case file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        out.push(path);
    }
    Ok(out)
}

/// Questions the demo asks after building the index.
pub fn sample_queries() -> [&'static str; 3] {
    [
        "What corrective actions were taken for welding defects?",
        "How can dimensional defects be prevented?",
        "What are the most common causes of past quality problems?",
    ]
}
