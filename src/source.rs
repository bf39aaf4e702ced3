//! Where raw coverage reports come from.
//!
//! A [`ReportSource`] hands back the bytes of one structured report per call.
//! Any failure to produce those bytes is `SourceUnavailable`; parsing them is
//! the parser's job.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::{CovtrackError, Result};

/// A source of raw coverage reports.
pub trait ReportSource {
    /// Produce the current report.
    fn fetch(&self) -> Result<Vec<u8>>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// An XML report that something else keeps up to date on disk.
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            CovtrackError::SourceUnavailable(format!(
                "cannot read report '{}': {e}",
                self.path.display()
            ))
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Pulls coverage from a running JaCoCo agent with `jacococli.jar`: `dump`
/// writes the execution data, `report` turns it into XML.
#[derive(Debug, Clone)]
pub struct JacocoCli {
    /// Java launcher.
    pub java: PathBuf,
    /// Path to `jacococli.jar`.
    pub cli_jar: PathBuf,
    pub address: String,
    pub port: u16,
    /// Compiled `.class` files of the instrumented application.
    pub classfiles: PathBuf,
    pub sourcefiles: Option<PathBuf>,
    /// Where the dumped `.exec` file is written.
    pub exec_file: PathBuf,
    /// Where the XML report is written.
    pub xml_file: PathBuf,
}

impl JacocoCli {
    pub fn dump_args(&self) -> Vec<String> {
        vec![
            "dump".to_string(),
            "--address".to_string(),
            self.address.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--destfile".to_string(),
            self.exec_file.display().to_string(),
        ]
    }

    pub fn report_args(&self) -> Vec<String> {
        let mut args = vec![
            "report".to_string(),
            self.exec_file.display().to_string(),
            "--classfiles".to_string(),
            self.classfiles.display().to_string(),
        ];
        if let Some(src) = &self.sourcefiles {
            args.push("--sourcefiles".to_string());
            args.push(src.display().to_string());
        }
        args.push("--xml".to_string());
        args.push(self.xml_file.display().to_string());
        args
    }

    /// Run one `jacococli.jar` command, failing on spawn errors and non-zero
    /// exits.
    fn run(&self, args: &[String]) -> Result<()> {
        debug!(command = %args[0], "running jacococli");
        let output = Command::new(&self.java)
            .arg("-jar")
            .arg(&self.cli_jar)
            .args(args)
            .output()
            .map_err(|e| {
                CovtrackError::SourceUnavailable(format!(
                    "failed to run {}: {e}",
                    self.java.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CovtrackError::SourceUnavailable(format!(
                "jacococli {} failed ({}): {}",
                args[0],
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl ReportSource for JacocoCli {
    fn fetch(&self) -> Result<Vec<u8>> {
        self.run(&self.dump_args())?;
        self.run(&self.report_args())?;
        FileSource::new(&self.xml_file).fetch()
    }

    fn describe(&self) -> String {
        format!("jacoco agent {}:{}", self.address, self.port)
    }
}
