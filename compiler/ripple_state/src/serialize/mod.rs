//! Binary encoding of `BuildState`.
//!
//! # File Layout
//!
//! ```text
//! offset  size  field
//! 0       4     magic b"RPST"
//! 4       2     format version, u16 LE
//! 6       8     body length, u64 LE
//! 14      8     body checksum, u64 LE (StableHasher)
//! 22      n     body: bincode-encoded StateImage
//! ```
//!
//! The body stores every distinct name once. Qualified names, references
//! and fingerprints are indices into that list, so the file is
//! self-contained. Names are numbered in first-use order while walking units
//! sorted by id, which makes the encoding canonical: the same logical state
//! always produces the same bytes.
//!
//! Reading is all-or-nothing. A wrong magic or version is a format error; any
//! other problem is corruption. Either way the caller rebuilds from scratch.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use bincode::Options;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use ripple_ir::{hash_bytes, Fingerprint, Name, NameTable, QualifiedName, ReferenceCollection, UnitId};

use crate::error::{FormatProblem, StateError, StateResult};
use crate::state::{BuildState, UnitRecord};

/// Leading bytes of every state file.
pub const MAGIC: [u8; 4] = *b"RPST";

/// Bump whenever `StateImage` or the header changes shape.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 22;

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
struct StateImage {
    build_number: u32,
    names: Vec<Vec<u8>>,
    /// Segment lists, as indices into `names`.
    qualified: Vec<Vec<u32>>,
    units: Vec<UnitImage>,
    /// (qualified index, fingerprint)
    fingerprints: Vec<(u32, u64)>,
    /// Indices into `units`.
    errors: Vec<u32>,
    duplicates: Vec<u32>,
    tombstones: Vec<u32>,
    /// Structural changes of a build still in progress.
    pending_changes: Vec<u32>,
    last_structural_changes: Option<Vec<u32>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct UnitImage {
    id: UnitId,
    declared: Vec<u32>,
    simple: Vec<u32>,
    roots: Vec<u32>,
    qualified: Vec<u32>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Encode a state into a self-contained byte buffer.
pub fn write(state: &BuildState) -> StateResult<Vec<u8>> {
    let image = ImageWriter::new(&state.names).write(state);
    let body = options().serialize(&image).map_err(StateError::Encode)?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&hash_bytes(&body).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a state written by [`write`].
pub fn read(bytes: &[u8]) -> StateResult<BuildState> {
    let truncated = || StateError::corrupt(format!("truncated header ({} bytes)", bytes.len()));

    let magic = array::<4>(bytes, 0).ok_or_else(truncated)?;
    if magic != MAGIC {
        return Err(FormatProblem::BadMagic { found: magic }.into());
    }
    let version = array::<2>(bytes, 4).map(u16::from_le_bytes).ok_or_else(truncated)?;
    if version != FORMAT_VERSION {
        return Err(FormatProblem::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        }
        .into());
    }
    let length = array::<8>(bytes, 6).map(u64::from_le_bytes).ok_or_else(truncated)?;
    let checksum = array::<8>(bytes, 14).map(u64::from_le_bytes).ok_or_else(truncated)?;

    let body = &bytes[HEADER_LEN..];
    if body.len() as u64 != length {
        return Err(StateError::corrupt(format!(
            "body is {} bytes, header says {length}",
            body.len()
        )));
    }
    if hash_bytes(body) != checksum {
        return Err(StateError::corrupt("body checksum mismatch"));
    }

    let image: StateImage = options()
        .deserialize(body)
        .map_err(|e| StateError::corrupt(format!("undecodable body: {e}")))?;
    decode(image)
}

/// Write a state file atomically.
///
/// The bytes go to a temporary file next to `path`, which is then renamed
/// over it. A crash mid-write leaves the previous file intact. Returns the
/// number of bytes written.
pub fn save(path: &Path, state: &BuildState) -> StateResult<usize> {
    let bytes = write(state)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StateError::io(dir, e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| StateError::io(dir, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| StateError::io(path, e))?;
    file.persist(path).map_err(|e| StateError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote build state");
    Ok(bytes.len())
}

/// Read a state file. A missing file is not an error: it means no build has
/// run yet.
pub fn load(path: &Path) -> StateResult<Option<BuildState>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StateError::io(path, e)),
    };
    let state = read(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        units = state.unit_count(),
        build_number = state.build_number(),
        "loaded build state"
    );
    Ok(Some(state))
}

fn array<const N: usize>(bytes: &[u8], at: usize) -> Option<[u8; N]> {
    bytes.get(at..at + N)?.try_into().ok()
}

/// Renumbers handles in first-use order.
struct ImageWriter<'a> {
    table: &'a NameTable,
    names: Vec<Vec<u8>>,
    name_index: FxHashMap<Name, u32>,
    qualified: Vec<Vec<u32>>,
    qualified_index: FxHashMap<QualifiedName, u32>,
}

impl<'a> ImageWriter<'a> {
    fn new(table: &'a NameTable) -> Self {
        ImageWriter {
            table,
            names: Vec::new(),
            name_index: FxHashMap::default(),
            qualified: Vec::new(),
            qualified_index: FxHashMap::default(),
        }
    }

    fn write(mut self, state: &BuildState) -> StateImage {
        let units: Vec<UnitImage> = state
            .units
            .iter()
            .map(|(id, record)| self.unit(id, record))
            .collect();

        let unit_index: FxHashMap<&UnitId, u32> = state
            .units
            .keys()
            .enumerate()
            .map(|(i, id)| (id, index(i)))
            .collect();
        let errors = state
            .units_with_errors
            .iter()
            .filter_map(|unit| unit_index.get(unit).copied())
            .collect();

        let mut fingerprinted: Vec<(QualifiedName, Fingerprint)> =
            state.fingerprints.iter().map(|(q, f)| (*q, *f)).collect();
        fingerprinted.sort_by(|a, b| self.compare(a.0, b.0));
        let fingerprints = fingerprinted
            .into_iter()
            .map(|(q, f)| (self.qualified(q), f.value()))
            .collect();

        let duplicates = self.qualified_set(state.duplicate_types.iter().copied());
        let tombstones = self.qualified_set(state.tombstones.iter().copied());
        let pending_changes = self.qualified_set(state.structurally_changed.iter().copied());
        let last_structural_changes = state
            .last_structural_changes
            .as_ref()
            .map(|changed| self.qualified_set(changed.iter().copied()));

        StateImage {
            build_number: state.build_number,
            names: self.names,
            qualified: self.qualified,
            units,
            fingerprints,
            errors,
            duplicates,
            tombstones,
            pending_changes,
            last_structural_changes,
        }
    }

    fn unit(&mut self, id: &UnitId, record: &UnitRecord) -> UnitImage {
        let references = &record.references;
        UnitImage {
            id: id.clone(),
            declared: self.qualified_set(record.declared.iter().copied()),
            simple: self.name_set(references.simple_names()),
            roots: self.name_set(references.root_names()),
            qualified: self.qualified_set(references.qualified_names().iter().copied()),
        }
    }

    fn name(&mut self, name: Name) -> u32 {
        if let Some(&i) = self.name_index.get(&name) {
            return i;
        }
        let i = index(self.names.len());
        self.names.push(self.table.lookup(name).to_vec());
        self.name_index.insert(name, i);
        i
    }

    fn qualified(&mut self, qualified: QualifiedName) -> u32 {
        if let Some(&i) = self.qualified_index.get(&qualified) {
            return i;
        }
        let segments = self
            .table
            .segments(qualified)
            .iter()
            .map(|&segment| self.name(segment))
            .collect();
        let i = index(self.qualified.len());
        self.qualified.push(segments);
        self.qualified_index.insert(qualified, i);
        i
    }

    /// Names sorted by content, so the order does not depend on handles.
    fn name_set(&mut self, names: &[Name]) -> Vec<u32> {
        let mut sorted = names.to_vec();
        sorted.sort_by(|a, b| self.table.lookup(*a).cmp(self.table.lookup(*b)));
        sorted.into_iter().map(|name| self.name(name)).collect()
    }

    /// Qualified names sorted by content.
    fn qualified_set(&mut self, names: impl Iterator<Item = QualifiedName>) -> Vec<u32> {
        let mut sorted: Vec<QualifiedName> = names.collect();
        sorted.sort_by(|a, b| self.compare(*a, *b));
        sorted.into_iter().map(|q| self.qualified(q)).collect()
    }

    fn compare(&self, a: QualifiedName, b: QualifiedName) -> std::cmp::Ordering {
        let table = self.table;
        let a = table.segments(a).iter().map(|&n| table.lookup(n));
        let b = table.segments(b).iter().map(|&n| table.lookup(n));
        a.cmp(b)
    }
}

fn index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("build state exceeded {} entries", u32::MAX))
}

fn at<'a, T>(items: &'a [T], i: u32, what: &str) -> StateResult<&'a T> {
    items
        .get(i as usize)
        .ok_or_else(|| StateError::corrupt(format!("{what} index {i} out of range ({})", items.len())))
}

fn resolve<T: Copy>(items: &[T], indices: &[u32], what: &str) -> StateResult<Vec<T>> {
    indices.iter().map(|&i| at(items, i, what).copied()).collect()
}

/// Rebuild a state from an image, validating every index.
fn decode(image: StateImage) -> StateResult<BuildState> {
    let mut state = BuildState::new();
    state.build_number = image.build_number;

    let names: Vec<Name> = image
        .names
        .iter()
        .map(|bytes| state.names.intern(bytes))
        .collect();

    let mut qualified = Vec::with_capacity(image.qualified.len());
    for segments in &image.qualified {
        let segments = resolve(&names, segments, "name")?;
        qualified.push(state.names.intern_qualified(&segments));
    }

    let mut unit_ids: Vec<UnitId> = Vec::with_capacity(image.units.len());
    for unit in image.units {
        if unit_ids.last().is_some_and(|last| *last >= unit.id) {
            return Err(StateError::corrupt(format!("unit {} out of order", unit.id)));
        }
        let mut declared = resolve(&qualified, &unit.declared, "qualified name")?;
        declared.sort_unstable();
        declared.dedup();
        let references = ReferenceCollection::new(
            &state.names,
            resolve(&names, &unit.simple, "name")?,
            resolve(&names, &unit.roots, "name")?,
            resolve(&qualified, &unit.qualified, "qualified name")?,
        );
        for &ty in &declared {
            state.declarers.entry(ty).or_default().insert(unit.id.clone());
        }
        state.units.insert(
            unit.id.clone(),
            UnitRecord {
                declared,
                references,
            },
        );
        unit_ids.push(unit.id);
    }

    for (q, value) in image.fingerprints {
        let ty = *at(&qualified, q, "qualified name")?;
        state.fingerprints.insert(ty, Fingerprint::new(value));
    }
    for i in image.errors {
        state.units_with_errors.insert(at(&unit_ids, i, "unit")?.clone());
    }
    state
        .duplicate_types
        .extend(resolve(&qualified, &image.duplicates, "qualified name")?);
    state
        .tombstones
        .extend(resolve(&qualified, &image.tombstones, "qualified name")?);
    state
        .structurally_changed
        .extend(resolve(&qualified, &image.pending_changes, "qualified name")?);
    state.last_structural_changes = match image.last_structural_changes {
        Some(changed) => Some(resolve(&qualified, &changed, "qualified name")?.into_iter().collect()),
        None => None,
    };
    Ok(state)
}
