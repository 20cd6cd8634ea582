//! JSON report adapter.

use crate::domain::error::SigtestError;
use crate::ports::report_port::{Report, ReportPort};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn write_to<W: Write>(&self, report: &Report<'_>, mut writer: W) -> Result<(), SigtestError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, report)?;
        } else {
            serde_json::to_writer(&mut writer, report)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &Report<'_>, output_path: Option<&Path>) -> Result<(), SigtestError> {
        match output_path {
            Some(path) => {
                let file = File::create(path)?;
                self.write_to(report, BufWriter::new(file))?;
                info!(path = %path.display(), "Report written");
            }
            None => self.write_to(report, io::stdout().lock())?,
        }
        Ok(())
    }
}
