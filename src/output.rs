use std::fs;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::circle_detector::Circle;
use crate::errors::Result;

/// Per-image result row
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub filename: String,
    pub path: PathBuf,
    pub plates: Vec<Circle>,
    pub bowls: Vec<Circle>,
    pub bread_area: usize,
}

/// Format circles as `x:y:r` separated by `;`
pub fn format_circles(circles: &[Circle]) -> String {
    circles
        .iter()
        .map(|c| format!("{:.0}:{:.0}:{:.0}", c.x, c.y, c.radius))
        .collect::<Vec<_>>()
        .join(";")
}

/// Write one summary row per image to `<output_dir>/summary.csv`
pub fn write_summary_csv<P: AsRef<Path>>(summaries: &[ImageSummary], output_dir: P) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("summary.csv");

    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "File",
        "Plate_Count",
        "Plates",
        "Bowl_Count",
        "Bowls",
        "Bread_Area",
    ])?;

    for summary in summaries {
        writer.write_record(&[
            summary.path.display().to_string(),
            summary.plates.len().to_string(),
            format_circles(&summary.plates),
            summary.bowls.len().to_string(),
            format_circles(&summary.bowls),
            summary.bread_area.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(output_path)
}
