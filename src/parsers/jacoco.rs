/// Parser for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <package name="com/example">
///       <class name="com/example/Foo" sourcefilename="Foo.java">...</class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///         <line nr="11" mi="2" ci="0" mb="1" cb="1"/>
///         <counter type="LINE" missed="1" covered="5"/>
///       </sourcefile>
///       <counter type="LINE" missed="1" covered="5"/>
///     </package>
///     <counter type="INSTRUCTION" missed="2" covered="10"/>
///     <counter type="LINE" missed="1" covered="5"/>
///     ...
///   </report>
///
/// Only two things are read:
///   - The `<counter>` elements that are direct children of `<report>`; these
///     are the report-wide totals. Counters nested in packages, classes,
///     methods or source files are per-element breakdowns and are skipped.
///   - The `<line>` elements of every `<sourcefile>`. A line counts as
///     executed when `ci > 0`. Paths are package name + source filename.
///
/// Counter types outside `MetricKind` (JaCoCo's `COMPLEXITY`) are ignored.
use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{get_attr, required_number, xml_err, ReportParser};
use crate::error::{CovtrackError, Result};
use crate::model::{CoverageSnapshot, CoveredLines, MetricCount, MetricKind};

/// JaCoCo XML format parser.
pub struct JacocoParser;

impl ReportParser for JacocoParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageSnapshot> {
        parse(input)
    }
}

/// Parse JaCoCo XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageSnapshot> {
    let mut xml = Reader::from_reader(input);
    xml.trim_text(true);
    let mut buf = Vec::new();

    let mut metrics: BTreeMap<MetricKind, MetricCount> = BTreeMap::new();
    let mut covered_lines: CoveredLines = BTreeMap::new();

    let mut saw_report = false;
    // Number of currently open elements; the report's own counters sit at 1.
    let mut depth: usize = 0;
    let mut current_package: Option<String> = None;
    let mut current_sourcefile: Option<String> = None;

    loop {
        let event = xml.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(e, &xml)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.name().as_ref() {
                    b"report" if depth == 0 => {
                        saw_report = true;
                    }
                    b"package" if is_start_event => {
                        current_package = get_attr(e, b"name");
                    }
                    b"sourcefile" if is_start_event => {
                        let name = get_attr(e, b"name").ok_or_else(|| {
                            CovtrackError::MalformedReport(
                                "<sourcefile> is missing attribute 'name'".to_string(),
                            )
                        })?;
                        current_sourcefile = Some(match &current_package {
                            Some(pkg) => format!("{pkg}/{name}"),
                            None => name,
                        });
                    }
                    b"line" => {
                        if let Some(file) = current_sourcefile.as_ref() {
                            let nr: u32 = required_number(e, b"nr", "line")?;
                            if nr == 0 {
                                return Err(CovtrackError::MalformedReport(format!(
                                    "<line> in '{file}' has line number 0"
                                )));
                            }
                            let ci: u64 = required_number(e, b"ci", "line")?;
                            if ci > 0 {
                                covered_lines.entry(file.clone()).or_default().insert(nr);
                            }
                        }
                    }
                    b"counter" if saw_report && depth == 1 => {
                        let kind_attr = get_attr(e, b"type").ok_or_else(|| {
                            CovtrackError::MalformedReport(
                                "<counter> is missing attribute 'type'".to_string(),
                            )
                        })?;
                        if let Ok(kind) = kind_attr.parse::<MetricKind>() {
                            let missed: u64 = required_number(e, b"missed", "counter")?;
                            let covered: u64 = required_number(e, b"covered", "counter")?;
                            if missed.checked_add(covered).is_none() {
                                return Err(CovtrackError::MalformedReport(format!(
                                    "{kind_attr} counter total overflows: missed={missed} covered={covered}"
                                )));
                            }
                            metrics.insert(kind, MetricCount::new(missed, covered));
                        }
                    }
                    _ => {}
                }
                if is_start_event {
                    depth += 1;
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"package" => current_package = None,
                    b"sourcefile" => current_sourcefile = None,
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_report {
        return Err(CovtrackError::MalformedReport(
            "missing <report> root element".to_string(),
        ));
    }

    Ok(CoverageSnapshot::new(metrics, covered_lines))
}
