//! MATLAB v5 struct and cell containers.
//!
//! `matfile` reads plain numeric arrays but not the struct-of-arrays
//! containers some collections ship, so the miMATRIX class encoding is
//! parsed here directly: structs, cell arrays, char arrays, and the
//! numeric leaves nested inside them. Top-level elements may be
//! zlib-deflated (miCOMPRESSED), which is how MATLAB writes v5 files by
//! default.
//!
//! Only what the struct-backed collections need is supported; arrays of
//! structs expose their first element's fields, which covers MATLAB's
//! ubiquitous 1x1 struct wrapper.

use std::io::Read;
use std::path::Path;

use crate::error::{DatasetError, Result};
use crate::formats::mat::MatMatrix;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;
const MI_UTF16: u32 = 17;

const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_CHAR: u8 = 4;

/// One decoded MATLAB value.
#[derive(Debug, Clone)]
pub enum MatValue {
    /// A 2-D numeric array.
    Matrix(MatMatrix),
    /// A char array, flattened to text.
    Text(String),
    /// Struct fields in declaration order (first element of the array).
    Struct(Vec<(String, MatValue)>),
    /// A cell array, values in MATLAB's column-major cell order.
    Cell {
        rows: usize,
        cols: usize,
        values: Vec<MatValue>,
    },
}

impl MatValue {
    /// A struct field by name.
    pub fn field(&self, name: &str) -> Option<&MatValue> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// One cell of a cell array.
    pub fn cell(&self, row: usize, col: usize) -> Option<&MatValue> {
        match self {
            Self::Cell { rows, cols, values } if row < *rows && col < *cols => {
                values.get(col * rows + row)
            }
            _ => None,
        }
    }

    /// Number of rows if this is a cell array.
    pub fn cell_rows(&self) -> Option<usize> {
        match self {
            Self::Cell { rows, .. } => Some(*rows),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&MatMatrix> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Load every top-level variable of a v5 container.
pub fn load(path: &Path) -> Result<Vec<(String, MatValue)>> {
    let bytes = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
    if bytes.len() < 128 {
        return Err(malformed(path, "truncated MAT header".into()));
    }
    if &bytes[126..128] != b"IM" {
        return Err(malformed(
            path,
            "not a little-endian MAT v5 container".into(),
        ));
    }

    let mut vars = Vec::new();
    let mut reader = Reader::new(path, &bytes[128..]);
    while !reader.is_done() {
        let (ty, payload) = reader.element()?;
        let inflated;
        let matrix = match ty {
            MI_MATRIX => payload,
            MI_COMPRESSED => {
                inflated = inflate(path, payload)?;
                let (ity, ipayload) = Reader::new(path, &inflated).element()?;
                if ity != MI_MATRIX {
                    continue;
                }
                ipayload
            }
            _ => continue,
        };
        vars.push(parse_matrix(path, matrix)?);
    }
    Ok(vars)
}

/// Load one named top-level variable.
pub fn load_variable(path: &Path, var: &str) -> Result<MatValue> {
    load(path)?
        .into_iter()
        .find(|(name, _)| name == var)
        .map(|(_, value)| value)
        .ok_or_else(|| DatasetError::MissingVariable {
            path: path.to_path_buf(),
            variable: var.to_string(),
        })
}

/// Load the first top-level variable, whatever its name.
///
/// Some containers store their single struct under a per-file name.
pub fn load_first(path: &Path) -> Result<MatValue> {
    load(path)?
        .into_iter()
        .next()
        .map(|(_, value)| value)
        .ok_or_else(|| malformed(path, "file contains no variables".into()))
}

fn malformed(path: &Path, reason: String) -> DatasetError {
    DatasetError::Malformed {
        path: path.to_path_buf(),
        reason,
    }
}

fn inflate(path: &Path, data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| malformed(path, format!("bad compressed element: {e}")))?;
    Ok(out)
}

/// Sequential data-element reader over one byte range.
struct Reader<'a> {
    path: &'a Path,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(path: &'a Path, buf: &'a [u8]) -> Self {
        Self { path, buf, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        let end = end.ok_or_else(|| malformed(self.path, "element overruns the file".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// The next data element as `(mi type, payload)`.
    ///
    /// Handles both the regular tag form (8-byte tag, payload padded to an
    /// 8-byte boundary) and the small form (payload of up to 4 bytes packed
    /// into the tag itself).
    fn element(&mut self) -> Result<(u32, &'a [u8])> {
        let tag = u32::from_le_bytes(self.take(4)?.try_into().unwrap_or([0; 4]));
        if tag >> 16 != 0 {
            let len = (tag >> 16) as usize;
            let word = self.take(4)?;
            if len > 4 {
                return Err(malformed(self.path, "small element longer than 4 bytes".into()));
            }
            return Ok((tag & 0xFFFF, &word[..len]));
        }
        let len = u32::from_le_bytes(self.take(4)?.try_into().unwrap_or([0; 4])) as usize;
        let payload = self.take(len)?;
        // Skip the padding; the final element of a range may omit it.
        let pad = (8 - len % 8) % 8;
        self.pos = (self.pos + pad).min(self.buf.len());
        Ok((tag, payload))
    }

    fn matrix_element(&mut self) -> Result<&'a [u8]> {
        let (ty, payload) = self.element()?;
        if ty != MI_MATRIX {
            return Err(malformed(
                self.path,
                format!("expected a nested array, found element type {ty}"),
            ));
        }
        Ok(payload)
    }
}

/// Parse one miMATRIX payload into `(name, value)`.
fn parse_matrix(path: &Path, data: &[u8]) -> Result<(String, MatValue)> {
    let mut r = Reader::new(path, data);

    let (_, flags) = r.element()?;
    let class = *flags
        .first()
        .ok_or_else(|| malformed(path, "empty array flags".into()))?;

    let (_, dims_raw) = r.element()?;
    let dims: Vec<usize> = dims_raw
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]).max(0) as usize)
        .collect();

    let (_, name_raw) = r.element()?;
    let name = String::from_utf8_lossy(name_raw)
        .trim_end_matches('\0')
        .to_string();

    let value = match class {
        MX_CELL => parse_cell(&mut r, path, &dims)?,
        MX_STRUCT => parse_struct(&mut r, path, &dims)?,
        MX_CHAR => parse_char(&mut r, path)?,
        6..=15 => parse_numeric(&mut r, path, &dims)?,
        other => {
            return Err(malformed(
                path,
                format!("unsupported MATLAB class {other} for '{name}'"),
            ))
        }
    };
    Ok((name, value))
}

fn parse_numeric(r: &mut Reader<'_>, path: &Path, dims: &[usize]) -> Result<MatValue> {
    let &[rows, cols] = dims else {
        return Err(malformed(
            path,
            format!("numeric array has dimensions {dims:?}, expected 2"),
        ));
    };
    let (ty, raw) = r.element()?;
    let data = numeric_to_f32(path, ty, raw)?;
    MatMatrix::from_parts(rows, cols, data)
        .map(MatValue::Matrix)
        .ok_or_else(|| {
            malformed(
                path,
                format!("array declares ({rows}, {cols}) but holds a different count"),
            )
        })
}

fn numeric_to_f32(path: &Path, ty: u32, raw: &[u8]) -> Result<Vec<f32>> {
    let data = match ty {
        MI_INT8 => raw.iter().map(|&b| f32::from(b as i8)).collect(),
        MI_UINT8 => raw.iter().map(|&b| f32::from(b)).collect(),
        MI_INT16 => raw
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])))
            .collect(),
        MI_UINT16 => raw
            .chunks_exact(2)
            .map(|c| f32::from(u16::from_le_bytes([c[0], c[1]])))
            .collect(),
        MI_INT32 => raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        MI_UINT32 => raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        MI_SINGLE => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        MI_DOUBLE => raw
            .chunks_exact(8)
            .map(|c| {
                f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
        MI_INT64 => raw
            .chunks_exact(8)
            .map(|c| {
                i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
        MI_UINT64 => raw
            .chunks_exact(8)
            .map(|c| {
                u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
        other => {
            return Err(malformed(
                path,
                format!("unsupported numeric element type {other}"),
            ))
        }
    };
    Ok(data)
}

fn parse_char(r: &mut Reader<'_>, path: &Path) -> Result<MatValue> {
    let (ty, raw) = r.element()?;
    let text = match ty {
        MI_UINT16 | MI_UTF16 => {
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        MI_INT8 | MI_UINT8 | MI_UTF8 => String::from_utf8_lossy(raw).into_owned(),
        other => {
            return Err(malformed(
                path,
                format!("unsupported char element type {other}"),
            ))
        }
    };
    Ok(MatValue::Text(
        text.trim_end_matches(|c| c == '\0' || c == ' ').to_string(),
    ))
}

fn parse_struct(r: &mut Reader<'_>, path: &Path, dims: &[usize]) -> Result<MatValue> {
    let elements: usize = dims.iter().product();

    let (_, len_raw) = r.element()?;
    let name_len = len_raw
        .get(..4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]).max(0) as usize)
        .unwrap_or(0);
    let (_, names_raw) = r.element()?;
    if name_len == 0 {
        return Ok(MatValue::Struct(Vec::new()));
    }
    let fields: Vec<String> = names_raw
        .chunks_exact(name_len)
        .map(|c| {
            String::from_utf8_lossy(c)
                .trim_end_matches('\0')
                .to_string()
        })
        .collect();

    // One nested array per (element, field), fields varying fastest.
    let mut first = Vec::with_capacity(fields.len());
    for element in 0..elements {
        for field in &fields {
            let payload = r.matrix_element()?;
            let (_, value) = parse_matrix(path, payload)?;
            if element == 0 {
                first.push((field.clone(), value));
            }
        }
    }
    Ok(MatValue::Struct(first))
}

fn parse_cell(r: &mut Reader<'_>, path: &Path, dims: &[usize]) -> Result<MatValue> {
    let &[rows, cols] = dims else {
        return Err(malformed(
            path,
            format!("cell array has dimensions {dims:?}, expected 2"),
        ));
    };
    let mut values = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        let payload = r.matrix_element()?;
        values.push(parse_matrix(path, payload)?.1);
    }
    Ok(MatValue::Cell { rows, cols, values })
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// Builders emitting the miMATRIX encodings the reader consumes, used by
/// the struct-backed dataset tests as well.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    fn element(tag: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len() + 7);
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        while out.len() % 8 != 0 {
            out.push(0);
        }
        out
    }

    fn matrix(class: u32, name: &str, dims: (usize, usize), body: &[u8]) -> Vec<u8> {
        let mut flags = Vec::new();
        flags.extend_from_slice(&class.to_le_bytes());
        flags.extend_from_slice(&0u32.to_le_bytes());

        let mut dim = Vec::new();
        dim.extend_from_slice(&(dims.0 as i32).to_le_bytes());
        dim.extend_from_slice(&(dims.1 as i32).to_le_bytes());

        let mut payload = element(6, &flags);
        payload.extend_from_slice(&element(5, &dim));
        payload.extend_from_slice(&element(1, name.as_bytes()));
        payload.extend_from_slice(body);
        element(MI_MATRIX, &payload)
    }

    pub(crate) fn numeric(name: &str, rows: usize, cols: usize, col_major: &[f64]) -> Vec<u8> {
        assert_eq!(col_major.len(), rows * cols);
        let mut data = Vec::new();
        for v in col_major {
            data.extend_from_slice(&v.to_le_bytes());
        }
        matrix(6, name, (rows, cols), &element(MI_DOUBLE, &data))
    }

    pub(crate) fn text(name: &str, s: &str) -> Vec<u8> {
        let mut data = Vec::new();
        for unit in s.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        matrix(
            u32::from(MX_CHAR),
            name,
            (1, s.encode_utf16().count()),
            &element(MI_UINT16, &data),
        )
    }

    /// A 1x1 struct array; `fields` values are full nested array elements.
    pub(crate) fn structure(name: &str, fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
        const NAME_LEN: usize = 32;
        let mut names = Vec::new();
        for (field, _) in fields {
            let mut padded = field.as_bytes().to_vec();
            padded.resize(NAME_LEN, 0);
            names.extend_from_slice(&padded);
        }
        let mut body = element(MI_INT32, &(NAME_LEN as i32).to_le_bytes());
        body.extend_from_slice(&element(MI_INT8, &names));
        for (_, value) in fields {
            body.extend_from_slice(value);
        }
        matrix(u32::from(MX_STRUCT), name, (1, 1), &body)
    }

    /// A cell array; `cells` in column-major order.
    pub(crate) fn cells(name: &str, rows: usize, cols: usize, cells: &[Vec<u8>]) -> Vec<u8> {
        assert_eq!(cells.len(), rows * cols);
        let body: Vec<u8> = cells.concat();
        matrix(u32::from(MX_CELL), name, (rows, cols), &body)
    }

    pub(crate) fn write_container(path: &Path, elements: &[Vec<u8>]) {
        let mut out = vec![0u8; 128];
        let banner = b"MATLAB 5.0 MAT-file, written by realrirs tests";
        out[..banner.len()].copy_from_slice(banner);
        for b in out[banner.len()..116].iter_mut() {
            *b = b' ';
        }
        out[125] = 0x01;
        out[126] = b'I';
        out[127] = b'M';
        for e in elements {
            out.extend_from_slice(e);
        }
        std::fs::write(path, out).unwrap();
    }

    /// Like [`write_container`], but each element deflated the way MATLAB
    /// writes v5 files by default.
    pub(crate) fn write_compressed_container(path: &Path, elements: &[Vec<u8>]) {
        use std::io::Write;

        let mut deflated = Vec::new();
        for e in elements {
            let mut enc =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(e).unwrap();
            let compressed = enc.finish().unwrap();
            let mut out = Vec::new();
            out.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&compressed);
            while out.len() % 8 != 0 {
                out.push(0);
            }
            deflated.push(out);
        }
        write_container(path, &deflated);
    }
}
