pub mod jacoco;

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::{CovtrackError, Result};
use crate::model::CoverageSnapshot;

/// Turns a raw structured report into a snapshot.
pub trait ReportParser {
    /// Parse the input bytes into a coverage snapshot.
    fn parse(&self, input: &[u8]) -> Result<CoverageSnapshot>;
}

/// Read a single attribute as an unescaped string.
pub(crate) fn get_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Read a required numeric attribute, failing with a malformed-report error
/// when it is missing or not a non-negative integer.
pub(crate) fn required_number<T: std::str::FromStr>(
    e: &BytesStart<'_>,
    name: &[u8],
    element: &str,
) -> Result<T> {
    let attr = String::from_utf8_lossy(name);
    let raw = get_attr(e, name).ok_or_else(|| {
        CovtrackError::MalformedReport(format!("<{element}> is missing attribute '{attr}'"))
    })?;
    raw.trim().parse::<T>().map_err(|_| {
        CovtrackError::MalformedReport(format!(
            "<{element}> attribute '{attr}' is not a non-negative integer: '{raw}'"
        ))
    })
}

pub(crate) fn xml_err<R>(e: quick_xml::Error, reader: &Reader<R>) -> CovtrackError {
    CovtrackError::Xml {
        source: e,
        position: reader.buffer_position(),
    }
}
