//! Tabular export of recorded samples.
use crate::error::StoreError;
use pat_core::Sample;
use std::io::Write;

/// Writes the header row followed by one row per sample.
pub fn write_csv<W: Write>(writer: W, samples: &[Sample]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(Sample::CSV_HEADER)?;
    for sample in samples {
        writer.write_record(sample.csv_record())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn render_csv(samples: &[Sample]) -> Result<String, StoreError> {
    let mut buf = vec![];
    write_csv(&mut buf, samples)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
