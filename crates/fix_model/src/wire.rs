// ==============================================================================
// Interchange Files
// ==============================================================================
//
// Readers for the tab-separated files written by the null-safety checker and
// the usage-graph scanner. Every file starts with a header row. A missing file
// reads as empty (the producer had nothing to report); a row with the wrong
// shape is a fatal `LoadError::Malformed`.
//
// The checker's errors file changed layout between versions. Each version is a
// `WireFormat` variant that maps to one entry of the `ERROR_CODECS` table.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::check_error::CheckError;
use crate::fix::{Change, Fix};
use crate::location::{Location, LocationKind};
use crate::records::{FieldRecord, MethodRecord, UsageKind, UsageRecord, Visibility};
use crate::region::{Region, SourceType};
use crate::LoadError;

/// Answers whether a location is declared inside the module under inference.
pub trait ModuleMembership {
    fn contains(&self, location: &Location) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    /// No offsets, no source paths for the error itself.
    V1,
    /// Adds the error offset and the path of the reporting file.
    #[default]
    V3,
}

impl WireFormat {
    fn codec(self) -> &'static ErrorCodec {
        match self {
            WireFormat::V1 => &ERROR_CODECS[0],
            WireFormat::V3 => &ERROR_CODECS[1],
        }
    }
}

/// Column layout of one errors-file version.
struct ErrorCodec {
    columns: usize,
    decode: fn(&[&str]) -> Result<RawError, String>,
}

static ERROR_CODECS: [ErrorCodec; 2] = [
    ErrorCodec {
        columns: 10,
        decode: decode_v1,
    },
    ErrorCodec {
        columns: 12,
        decode: decode_v3,
    },
];

#[derive(Debug, Clone)]
struct RawError {
    message_type: SmolStr,
    message: String,
    enc_class: SmolStr,
    enc_member: SmolStr,
    offset: u32,
    target: Option<Location>,
}

fn decode_v1(cols: &[&str]) -> Result<RawError, String> {
    Ok(RawError {
        message_type: cols[0].into(),
        message: cols[1].to_string(),
        enc_class: cols[2].into(),
        enc_member: cols[3].into(),
        offset: 0,
        target: decode_target(&cols[4..10])?,
    })
}

fn decode_v3(cols: &[&str]) -> Result<RawError, String> {
    Ok(RawError {
        message_type: cols[0].into(),
        message: cols[1].to_string(),
        enc_class: cols[2].into(),
        enc_member: cols[3].into(),
        offset: parse_u32(cols[4], "offset")?,
        target: decode_target(&cols[6..12])?,
    })
}

/// `kind, class, method, param, index, path`; kind `null` means no fix.
fn decode_target(cols: &[&str]) -> Result<Option<Location>, String> {
    if is_null(cols[0]) {
        return Ok(None);
    }
    let kind =
        LocationKind::parse(cols[0]).ok_or_else(|| format!("unknown target kind `{}`", cols[0]))?;
    let (class, method, param) = (cols[1], cols[2], cols[3]);
    let location = match kind {
        LocationKind::Field => {
            let variables: Vec<&str> = param
                .split(',')
                .map(str::trim)
                .filter(|var| !var.is_empty())
                .collect();
            if variables.is_empty() {
                return Err("field target without variables".to_string());
            }
            Location::field(class, variables)
        }
        LocationKind::Method => Location::method(class, method),
        LocationKind::Parameter => {
            Location::parameter(class, method, parse_u32(cols[4], "parameter index")?)
        }
    };
    Ok(Some(if is_null(cols[5]) {
        location
    } else {
        location.with_path(cols[5])
    }))
}

fn is_null(raw: &str) -> bool {
    raw.is_empty() || raw == "null"
}

fn parse_u32(raw: &str, what: &str) -> Result<u32, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {what} `{raw}`"))
}

fn parse_bool(raw: &str, what: &str) -> Result<bool, String> {
    match raw.trim() {
        "true" | "TRUE" | "1" => Ok(true),
        "false" | "FALSE" | "0" => Ok(false),
        other => Err(format!("invalid {what} `{other}`")),
    }
}

/// Settings shared by the readers that build fixes.
pub struct FixContext<'a> {
    pub annotation: &'a str,
    pub membership: &'a dyn ModuleMembership,
}

impl FixContext<'_> {
    fn fix_for(&self, location: Location, reason: &str) -> Fix {
        let in_module = self.membership.contains(&location);
        Fix::new(Change::add(location, self.annotation), reason, in_module)
    }
}

// ==============================================================================
// Row reading
// ==============================================================================

/// Read every data row of a TSV file, checking the column count and handing
/// the split columns to `decode`. Returns an empty list for a missing file.
pub fn read_rows<T>(
    path: &Path,
    columns: usize,
    mut decode: impl FnMut(&[&str]) -> Result<Option<T>, String>,
) -> Result<Vec<T>, LoadError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::debug!("{} does not exist, reading it as empty", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut rows = Vec::new();
    // Line 1 is the header.
    for (line_no, line) in contents.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != columns {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                line: line_no + 1,
                reason: format!("expected {columns} columns, found {}", cols.len()),
            });
        }
        let decoded = decode(&cols).map_err(|reason| LoadError::Malformed {
            path: path.to_path_buf(),
            line: line_no + 1,
            reason,
        })?;
        rows.extend(decoded);
    }
    Ok(rows)
}

/// Read the checker's errors file. Rows that describe the same error are merged
/// and their resolving fixes collected on one `CheckError`.
pub fn read_errors(
    path: &Path,
    format: WireFormat,
    ctx: &FixContext<'_>,
) -> Result<Vec<CheckError>, LoadError> {
    let codec = format.codec();
    let raws = read_rows(path, codec.columns, |cols| (codec.decode)(cols).map(Some))?;

    let mut errors: Vec<CheckError> = Vec::with_capacity(raws.len());
    let mut seen: FxHashMap<CheckError, usize> = FxHashMap::default();
    for raw in raws {
        let region = Region::new(raw.enc_class, raw.enc_member);
        let mut error = CheckError::new(raw.message_type.clone(), raw.message, region, raw.offset);
        let fix = raw
            .target
            .map(|location| ctx.fix_for(location, &raw.message_type));

        // Errors without fixes are the merge key; fixes are folded in below.
        match seen.get(&error) {
            Some(&idx) => {
                if let Some(fix) = fix {
                    errors[idx].add_resolving_fix(fix);
                }
            }
            None => {
                seen.insert(error.clone(), errors.len());
                if let Some(fix) = fix {
                    error.add_resolving_fix(fix);
                }
                errors.push(error);
            }
        }
    }
    Ok(errors)
}

/// Read the optional candidate-fixes file:
/// `kind, class, method, param, index, path, reason`.
pub fn read_fixes(path: &Path, ctx: &FixContext<'_>) -> Result<Vec<Fix>, LoadError> {
    read_rows(path, 7, |cols| {
        let Some(location) = decode_target(&cols[0..6])? else {
            return Ok(None);
        };
        Ok(Some(ctx.fix_for(location, cols[6])))
    })
}

/// Read one usage-graph file:
/// `using_class, using_member, used_member, used_class, source_kind`.
///
/// `LIBRARY` rows describe declarations without source in this module; they
/// are dropped.
pub fn read_usages(path: &Path, kind: UsageKind) -> Result<Vec<UsageRecord>, LoadError> {
    let mut dropped = 0usize;
    let records = read_rows(path, 5, |cols| {
        let source_type = match cols[4].trim() {
            "SOURCE" | "" => SourceType::Source,
            "LIBRARY" => SourceType::Library,
            other => return Err(format!("unknown source kind `{other}`")),
        };
        if source_type == SourceType::Library {
            dropped += 1;
            return Ok(None);
        }
        Ok(Some(UsageRecord {
            region: Region::new(cols[0], cols[1]).with_source_type(source_type),
            used_member: cols[2].into(),
            used_class: cols[3].into(),
            kind,
        }))
    })?;
    if dropped > 0 {
        log::debug!(
            "{}: dropped {dropped} usages of library declarations",
            path.display()
        );
    }
    Ok(records)
}

/// Read method declarations:
/// `id, parent_id, class, signature, visibility, primitive_return, path`.
///
/// Declarations whose source file is gone are dropped with a warning; they
/// usually belong to pre-built dependency code.
pub fn read_methods(path: &Path) -> Result<Vec<MethodRecord>, LoadError> {
    read_rows(path, 7, |cols| {
        let id = parse_u32(cols[0], "method id")?;
        let parent = match cols[1].trim() {
            "-1" | "" | "null" => None,
            raw => Some(parse_u32(raw, "parent id")?),
        };
        let visibility = Visibility::parse(cols[4])
            .ok_or_else(|| format!("unknown visibility `{}`", cols[4]))?;
        let source = PathBuf::from(cols[6]);
        if !source.exists() {
            log::warn!(
                "dropping method {}.{}: source {} not found",
                cols[2],
                cols[3],
                source.display()
            );
            return Ok(None);
        }
        Ok(Some(MethodRecord {
            id,
            parent,
            class: cols[2].into(),
            signature: cols[3].into(),
            visibility,
            primitive_return: parse_bool(cols[5], "primitive_return")?,
            path: source,
        }))
    })
}

/// Read field declarations: `class, variables, initialized, path`.
pub fn read_fields(path: &Path) -> Result<Vec<FieldRecord>, LoadError> {
    read_rows(path, 4, |cols| {
        let variables: Vec<SmolStr> = cols[1]
            .split(',')
            .map(str::trim)
            .filter(|var| !var.is_empty())
            .map(SmolStr::from)
            .collect();
        if variables.is_empty() {
            return Err("field declaration without variables".to_string());
        }
        let source = PathBuf::from(cols[3]);
        if !source.exists() {
            log::warn!(
                "dropping field {}.{}: source {} not found",
                cols[0],
                cols[1],
                source.display()
            );
            return Ok(None);
        }
        Ok(Some(FieldRecord {
            class: cols[0].into(),
            variables,
            initialized: parse_bool(cols[2], "initialized")?,
            path: source,
        }))
    })
}
