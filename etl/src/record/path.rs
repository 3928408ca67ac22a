use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Location of a single leaf value inside a [`crate::record::RecordStore`].
///
/// A path is a non-empty sequence of segments: top-level field names, nested object field
/// names and map keys. It renders dot-delimited (`outer.first`), but the segments are kept
/// separately so a map key that itself contains a `.` stays unambiguous.
///
/// The derived ordering is lexicographic over segments, which places every path directly
/// after its prefix and keeps all paths below a prefix contiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dot-delimited path.
    ///
    /// Only syntax is checked: the text must be non-empty and must not contain empty segments
    /// (`a..b`, `.a`, `a.`). Whether the path exists in any store is not.
    pub fn parse(path: &str) -> EtlResult<FieldPath> {
        if path.is_empty() {
            bail!(ErrorKind::InvalidFieldPath, "Field path is empty");
        }

        let segments = path.split('.').map(str::to_string).collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            bail!(
                ErrorKind::InvalidFieldPath,
                "Field path contains an empty segment",
                format!("path: `{path}`")
            );
        }

        Ok(FieldPath { segments })
    }

    /// Creates a top-level path made of a single field name.
    pub fn field(name: impl Into<String>) -> FieldPath {
        FieldPath {
            segments: vec![name.into()],
        }
    }

    /// Returns the path of `segment` nested directly below this path.
    ///
    /// The segment is taken verbatim, so map keys with dots or empty keys are accepted.
    pub fn child(&self, segment: impl Into<String>) -> FieldPath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());

        FieldPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the last segment, which is the field name or map key this path points at.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` when `prefix` is equal to this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
