//! The FFD metadata block persisted inside a mesh description.
//!
//! The block is a sequence of tagged text records appended after the mesh
//! itself:
//!
//! ```text
//! FFD_NBOX= 1
//! FFD_NLEVEL= 1
//! FFD_TAG= WING
//! FFD_LEVEL= 0
//! FFD_DEGREE_I= 4
//! FFD_DEGREE_J= 4
//! FFD_DEGREE_K= 1
//! FFD_PARENTS= 0
//! FFD_CHILDREN= 0
//! FFD_CORNER_POINTS= 8
//! <x y z per line>
//! FFD_CONTROL_POINTS= 50
//! <i j k x y z per line>
//! FFD_SURFACE_POINTS= 120
//! <marker point u v w per line>
//! ```
//!
//! Planar meshes store four corner pairs; the missing out-of-plane corners
//! are implied at z = -0.5 and z = +0.5, and the `FFD_DEGREE_K` record is
//! omitted (the degree is 1). Everything else is read and written verbatim.
//!
//! Content preceding `FFD_NBOX=` (the mesh itself) is skipped. A missing or
//! corrupt block when a box is required is a fatal input error for the
//! caller.

use std::io::{BufRead, Write};

use nalgebra::Point3;
use tracing::warn;

use deform_types::DeformMesh;

use crate::error::{FfdError, FfdResult};
use crate::lattice::{FfdBox, SurfacePoint, NUM_CORNERS};

/// A surface-point record as stored in the metadata block, before marker
/// names are resolved against a mesh.
#[derive(Debug, Clone)]
pub struct SurfacePointRecord {
    /// Boundary marker tag.
    pub marker: String,
    /// Mesh point index.
    pub point: u32,
    /// Parametric coordinate inside the box.
    pub param: Point3<f64>,
}

/// All FFD boxes read from one mesh description.
#[derive(Debug, Clone)]
pub struct FfdCollection {
    /// Number of nesting levels.
    pub n_level: usize,
    /// The boxes, in file order.
    pub boxes: Vec<FfdBox>,
    /// Raw surface-point records per box (parallel to `boxes`).
    pub surface_records: Vec<Vec<SurfacePointRecord>>,
}

impl FfdCollection {
    /// Index of the box with the given tag.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<usize> {
        self.boxes.iter().position(|b| b.tag() == tag)
    }

    /// Fail when the description carried no box definition.
    ///
    /// # Errors
    ///
    /// Returns [`FfdError::MissingDefinition`] when the collection is empty.
    pub fn require_boxes(&self) -> FfdResult<()> {
        if self.boxes.is_empty() {
            return Err(FfdError::MissingDefinition);
        }
        Ok(())
    }

    /// Resolve the raw surface-point records against a mesh, filling each
    /// box's surface-point cache.
    ///
    /// Records naming a marker the mesh does not have, or a point that is
    /// not a vertex of that marker, are logged and dropped — the partition
    /// may simply not own them.
    pub fn attach_surface_points(&mut self, mesh: &DeformMesh) {
        for (ffd_box, records) in self.boxes.iter_mut().zip(&self.surface_records) {
            ffd_box.surface_points.clear();
            for record in records {
                let Some(marker) = mesh.marker_index(&record.marker) else {
                    warn!(
                        marker = %record.marker,
                        box_tag = ffd_box.tag(),
                        "surface point references a marker not present locally"
                    );
                    continue;
                };
                let vertex = mesh.markers[marker]
                    .vertices
                    .iter()
                    .position(|v| v.point == record.point);
                let Some(vertex) = vertex else {
                    continue;
                };
                ffd_box.surface_points.push(SurfacePoint {
                    marker,
                    vertex,
                    point: record.point,
                    param: record.param,
                    cart: mesh.coord(record.point),
                });
            }
        }
    }
}

struct Lines {
    lines: Vec<String>,
    pos: usize,
}

impl Lines {
    fn next(&mut self) -> FfdResult<(usize, &str)> {
        let line = self
            .lines
            .get(self.pos)
            .ok_or_else(|| FfdError::Metadata {
                line: self.pos + 1,
                reason: "unexpected end of metadata block".to_string(),
            })?;
        self.pos += 1;
        Ok((self.pos, line.trim()))
    }

    /// Read the next line and require the given `TAG=` prefix, returning
    /// the trimmed value.
    fn tagged(&mut self, tag: &str) -> FfdResult<(usize, String)> {
        let (line_no, line) = self.next()?;
        let value = line.strip_prefix(tag).ok_or_else(|| FfdError::Metadata {
            line: line_no,
            reason: format!("expected '{tag}', found '{line}'"),
        })?;
        Ok((line_no, value.trim().to_string()))
    }
}

fn parse_count(line: usize, value: &str) -> FfdResult<usize> {
    value.parse().map_err(|_| FfdError::Metadata {
        line,
        reason: format!("'{value}' is not a non-negative integer"),
    })
}

fn parse_floats(line: usize, value: &str, expected: usize) -> FfdResult<Vec<f64>> {
    let fields: Result<Vec<f64>, _> = value.split_whitespace().map(str::parse).collect();
    match fields {
        Ok(fields) if fields.len() == expected => Ok(fields),
        _ => Err(FfdError::Metadata {
            line,
            reason: format!("expected {expected} numeric fields in '{value}'"),
        }),
    }
}

/// Read the FFD metadata block from a mesh description.
///
/// Lines before `FFD_NBOX=` are skipped, so the reader accepts both a bare
/// block and a full mesh file with the block appended. A description
/// without any `FFD_NBOX=` record yields an empty collection (use
/// [`FfdCollection::require_boxes`] where a definition is mandatory).
///
/// # Errors
///
/// Returns [`FfdError::Metadata`] for a corrupt block and [`FfdError::Io`]
/// when reading fails.
pub fn read_metadata(reader: impl BufRead, dim: usize) -> FfdResult<FfdCollection> {
    let all_lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let start = all_lines
        .iter()
        .position(|l| l.trim_start().starts_with("FFD_NBOX="));
    let Some(start) = start else {
        return Ok(FfdCollection {
            n_level: 0,
            boxes: Vec::new(),
            surface_records: Vec::new(),
        });
    };

    let mut lines = Lines {
        lines: all_lines,
        pos: start,
    };

    let (line_no, value) = lines.tagged("FFD_NBOX=")?;
    let n_box = parse_count(line_no, &value)?;
    let mut n_level = 0;
    if n_box != 0 {
        let (line_no, value) = lines.tagged("FFD_NLEVEL=")?;
        n_level = parse_count(line_no, &value)?;
    }

    let mut boxes = Vec::with_capacity(n_box);
    let mut surface_records = Vec::with_capacity(n_box);
    for _ in 0..n_box {
        let (ffd_box, records) = read_box(&mut lines, dim)?;
        boxes.push(ffd_box);
        surface_records.push(records);
    }

    Ok(FfdCollection {
        n_level,
        boxes,
        surface_records,
    })
}

fn read_box(lines: &mut Lines, dim: usize) -> FfdResult<(FfdBox, Vec<SurfacePointRecord>)> {
    let (_, tag) = lines.tagged("FFD_TAG=")?;
    let (line_no, value) = lines.tagged("FFD_LEVEL=")?;
    let level = parse_count(line_no, &value)?;

    let (line_no, value) = lines.tagged("FFD_DEGREE_I=")?;
    let degree_i = parse_count(line_no, &value)?;
    let (line_no, value) = lines.tagged("FFD_DEGREE_J=")?;
    let degree_j = parse_count(line_no, &value)?;
    let degree_k = if dim == 3 {
        let (line_no, value) = lines.tagged("FFD_DEGREE_K=")?;
        parse_count(line_no, &value)?
    } else {
        1
    };

    let mut ffd_box = FfdBox::new(tag, degree_i, degree_j, degree_k)?;
    ffd_box.set_level(level);

    let (line_no, value) = lines.tagged("FFD_PARENTS=")?;
    let n_parents = parse_count(line_no, &value)?;
    for _ in 0..n_parents {
        let (_, parent) = lines.next()?;
        ffd_box.add_parent(parent.to_string());
    }
    let (line_no, value) = lines.tagged("FFD_CHILDREN=")?;
    let n_children = parse_count(line_no, &value)?;
    for _ in 0..n_children {
        let (_, child) = lines.next()?;
        ffd_box.add_child(child.to_string());
    }

    let (line_no, value) = lines.tagged("FFD_CORNER_POINTS=")?;
    let n_corners = parse_count(line_no, &value)?;
    if dim == 2 {
        if n_corners != NUM_CORNERS / 2 {
            return Err(FfdError::Metadata {
                line: line_no,
                reason: format!("a planar box stores 4 corner pairs, found {n_corners}"),
            });
        }
        for corner in 0..n_corners {
            let (line_no, line) = lines.next()?;
            let xy = parse_floats(line_no, line, 2)?;
            ffd_box.set_corner(corner, Point3::new(xy[0], xy[1], -0.5));
            ffd_box.set_corner(corner + 4, Point3::new(xy[0], xy[1], 0.5));
        }
    } else {
        if n_corners != NUM_CORNERS {
            return Err(FfdError::Metadata {
                line: line_no,
                reason: format!("a volume box stores 8 corner points, found {n_corners}"),
            });
        }
        for corner in 0..n_corners {
            let (line_no, line) = lines.next()?;
            let xyz = parse_floats(line_no, line, 3)?;
            ffd_box.set_corner(corner, Point3::new(xyz[0], xyz[1], xyz[2]));
        }
    }

    let (line_no, value) = lines.tagged("FFD_CONTROL_POINTS=")?;
    let n_control = parse_count(line_no, &value)?;
    for _ in 0..n_control {
        let (line_no, line) = lines.next()?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FfdError::Metadata {
                line: line_no,
                reason: format!("expected 'i j k x y z', found '{line}'"),
            });
        }
        let i = parse_count(line_no, fields[0])?;
        let j = parse_count(line_no, fields[1])?;
        let k = parse_count(line_no, fields[2])?;
        let coords = parse_floats(line_no, &fields[3..].join(" "), 3)?;
        ffd_box.set_control_point(i, j, k, Point3::new(coords[0], coords[1], coords[2]))?;
    }
    ffd_box.snapshot_control_points();

    let (line_no, value) = lines.tagged("FFD_SURFACE_POINTS=")?;
    let n_surface = parse_count(line_no, &value)?;
    let mut records = Vec::with_capacity(n_surface);
    for _ in 0..n_surface {
        let (line_no, line) = lines.next()?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(FfdError::Metadata {
                line: line_no,
                reason: format!("expected 'marker point u v w', found '{line}'"),
            });
        }
        let point = fields[1].parse::<u32>().map_err(|_| FfdError::Metadata {
            line: line_no,
            reason: format!("'{}' is not a point index", fields[1]),
        })?;
        let param = parse_floats(line_no, &fields[2..].join(" "), 3)?;
        records.push(SurfacePointRecord {
            marker: fields[0].to_string(),
            point,
            param: Point3::new(param[0], param[1], param[2]),
        });
    }

    Ok((ffd_box, records))
}

/// Write the FFD metadata block.
///
/// The mesh provides marker names for the surface-point records. The layout
/// mirrors what [`read_metadata`] accepts, so a write → read cycle
/// reproduces the collection.
///
/// # Errors
///
/// Returns [`FfdError::Io`] when the writer fails.
pub fn write_metadata(
    collection: &FfdCollection,
    mesh: &DeformMesh,
    mut writer: impl Write,
) -> FfdResult<()> {
    let dim = mesh.dim();
    writeln!(writer, "FFD_NBOX= {}", collection.boxes.len())?;
    if !collection.boxes.is_empty() {
        writeln!(writer, "FFD_NLEVEL= {}", collection.n_level)?;
    }

    for ffd_box in &collection.boxes {
        writeln!(writer, "FFD_TAG= {}", ffd_box.tag())?;
        writeln!(writer, "FFD_LEVEL= {}", ffd_box.level())?;
        let [l, m, n] = ffd_box.degree();
        writeln!(writer, "FFD_DEGREE_I= {l}")?;
        writeln!(writer, "FFD_DEGREE_J= {m}")?;
        if dim == 3 {
            writeln!(writer, "FFD_DEGREE_K= {n}")?;
        }

        writeln!(writer, "FFD_PARENTS= {}", ffd_box.parents().len())?;
        for parent in ffd_box.parents() {
            writeln!(writer, "{parent}")?;
        }
        writeln!(writer, "FFD_CHILDREN= {}", ffd_box.children().len())?;
        for child in ffd_box.children() {
            writeln!(writer, "{child}")?;
        }

        if dim == 2 {
            writeln!(writer, "FFD_CORNER_POINTS= {}", NUM_CORNERS / 2)?;
            for corner in 0..NUM_CORNERS / 2 {
                let c = ffd_box.corner(corner);
                writeln!(writer, "{}\t{}", c.x, c.y)?;
            }
        } else {
            writeln!(writer, "FFD_CORNER_POINTS= {NUM_CORNERS}")?;
            for corner in 0..NUM_CORNERS {
                let c = ffd_box.corner(corner);
                writeln!(writer, "{}\t{}\t{}", c.x, c.y, c.z)?;
            }
        }

        writeln!(
            writer,
            "FFD_CONTROL_POINTS= {}",
            ffd_box.num_control_points()
        )?;
        for i in 0..=l {
            for j in 0..=m {
                for k in 0..=n {
                    let c = ffd_box.control_point(i, j, k);
                    writeln!(writer, "{i}\t{j}\t{k}\t{}\t{}\t{}", c.x, c.y, c.z)?;
                }
            }
        }

        writeln!(
            writer,
            "FFD_SURFACE_POINTS= {}",
            ffd_box.surface_points.len()
        )?;
        for sp in &ffd_box.surface_points {
            let marker = &mesh.markers[sp.marker].name;
            writeln!(
                writer,
                "{marker}\t{}\t{}\t{}\t{}",
                sp.point, sp.param.x, sp.param.y, sp.param.z
            )?;
        }
    }
    Ok(())
}
