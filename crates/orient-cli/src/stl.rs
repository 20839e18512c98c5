//! STL reading and writing.
//!
//! Binary files are recognized by size (`84 + 50 * count` bytes); anything
//! else starting with `solid` is parsed as ASCII.

use std::fs;
use std::path::Path;

use orient_math::Point3;
use orient_support::{Mesh, OrientError, Triangle};
use thiserror::Error;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Errors raised while reading or writing an STL file.
#[derive(Error, Debug)]
pub enum StlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too small to be valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("binary STL declares {expected} triangles but holds {got}")]
    Truncated { expected: usize, got: usize },

    #[error("ASCII STL line {line}: {message}")]
    Ascii { line: usize, message: String },

    #[error("mesh has {0} triangles, more than binary STL can hold")]
    TooManyTriangles(usize),

    #[error(transparent)]
    Mesh(#[from] OrientError),
}

/// Load a mesh from an STL file on disk.
pub fn load_stl(path: &Path) -> Result<Mesh, StlError> {
    let bytes = fs::read(path)?;
    parse_stl(&bytes)
}

/// Parse STL bytes, detecting ASCII or binary.
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh, StlError> {
    if bytes.len() < 6 {
        return Err(StlError::TooSmall(bytes.len()));
    }
    if is_binary(bytes) {
        return parse_binary(bytes);
    }
    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with("solid") {
        parse_ascii(&text)
    } else {
        parse_binary(bytes)
    }
}

fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = read_u32(&bytes[HEADER_SIZE..]) as usize;
    bytes.len() == (HEADER_SIZE + 4).saturating_add(count.saturating_mul(TRIANGLE_SIZE))
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn read_f32(buf: &[u8]) -> f32 {
    f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn read_point(buf: &[u8]) -> Point3 {
    Point3::new(
        f64::from(read_f32(&buf[0..4])),
        f64::from(read_f32(&buf[4..8])),
        f64::from(read_f32(&buf[8..12])),
    )
}

fn parse_binary(bytes: &[u8]) -> Result<Mesh, StlError> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(StlError::TooSmall(bytes.len()));
    }
    let expected = read_u32(&bytes[HEADER_SIZE..]) as usize;
    let body = &bytes[HEADER_SIZE + 4..];
    let got = body.len() / TRIANGLE_SIZE;
    if got < expected {
        return Err(StlError::Truncated { expected, got });
    }

    // The stored facet normal is ignored; it is recomputed from the winding
    let triangles = body
        .chunks_exact(TRIANGLE_SIZE)
        .take(expected)
        .map(|facet| {
            Triangle::new(
                read_point(&facet[12..24]),
                read_point(&facet[24..36]),
                read_point(&facet[36..48]),
            )
        })
        .collect();

    Ok(Mesh::new(triangles)?)
}

fn parse_ascii(text: &str) -> Result<Mesh, StlError> {
    let mut triangles = Vec::new();
    let mut corners: Vec<Point3> = Vec::with_capacity(3);

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let coords: Vec<&str> = parts.collect();
                if coords.len() != 3 {
                    return Err(StlError::Ascii {
                        line: line_no,
                        message: format!("expected 3 coordinates, found {}", coords.len()),
                    });
                }
                let mut xyz = [0.0; 3];
                for (slot, raw) in xyz.iter_mut().zip(&coords) {
                    *slot = raw.parse::<f64>().map_err(|e| StlError::Ascii {
                        line: line_no,
                        message: format!("bad coordinate '{raw}': {e}"),
                    })?;
                }
                corners.push(Point3::new(xyz[0], xyz[1], xyz[2]));
            }
            Some("endloop") => {
                if corners.len() != 3 {
                    return Err(StlError::Ascii {
                        line: line_no,
                        message: format!("facet has {} vertices, expected 3", corners.len()),
                    });
                }
                triangles.push(Triangle::new(corners[0], corners[1], corners[2]));
                corners.clear();
            }
            _ => {}
        }
    }

    if !corners.is_empty() {
        return Err(StlError::Ascii {
            line: text.lines().count(),
            message: "unterminated facet".into(),
        });
    }

    Ok(Mesh::new(triangles)?)
}

fn triangle_count(len: usize) -> Result<u32, StlError> {
    u32::try_from(len).map_err(|_| StlError::TooManyTriangles(len))
}

/// Serialize a mesh as binary STL.
pub fn write_stl_binary(mesh: &Mesh) -> Result<Vec<u8>, StlError> {
    let count = triangle_count(mesh.len())?;
    let mut data = Vec::with_capacity(HEADER_SIZE + 4 + mesh.len() * TRIANGLE_SIZE);

    let mut header = [b' '; HEADER_SIZE];
    let title = b"orient STL export";
    header[..title.len()].copy_from_slice(title);
    data.extend_from_slice(&header);
    data.extend_from_slice(&count.to_le_bytes());

    for (tri, normal) in mesh.triangles().iter().zip(mesh.normals()) {
        for c in normal.iter() {
            data.extend_from_slice(&(*c as f32).to_le_bytes());
        }
        for v in &tri.vertices {
            data.extend_from_slice(&(v.x as f32).to_le_bytes());
            data.extend_from_slice(&(v.y as f32).to_le_bytes());
            data.extend_from_slice(&(v.z as f32).to_le_bytes());
        }
        // Attribute byte count
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(data)
}
