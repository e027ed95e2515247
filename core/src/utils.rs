use std::fmt;
use std::path::{Component, Path, PathBuf};

use num_enum::TryFromPrimitive;

use crate::constants::ACCEPTED_EXTENSIONS;

/// CRC32 (IEEE) over `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    use crc32fast::Hasher;
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

pub fn fmt_bytes(b: &[u8]) -> String {
    if b.iter().all(|&c| c.is_ascii_graphic() || c == b' ') {
        format!("b\"{}\"", String::from_utf8_lossy(b))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

/// Returns the accepted extension of `path`, if any.
pub fn archive_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    ACCEPTED_EXTENSIONS.iter().copied().find(|accepted| *accepted == ext)
}

/// Lowercased file extension used as the codec selector's file hint.
pub fn file_hint(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Turn a stored `source_id` into a relative path that cannot escape the
/// extraction directory. Root, prefix, `.` and `..` components are dropped.
pub fn sanitize_source_id(source_id: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(source_id).components() {
        if let Component::Normal(part) = component {
            out.push(part);
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// `/`-joined path of `path` relative to `root`; used as the logical
/// `source_id` for directory ingestion.
pub fn relative_source_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Logical `source_id` for a single file: its file name.
pub fn file_source_id(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
