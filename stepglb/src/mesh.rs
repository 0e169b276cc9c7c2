// mesh.rs      Mesh module
//
// Copyright (c) 2025  Douglas Lau
//
use glam::Vec3;
use std::collections::HashMap;
use truck_meshalgo::prelude::{PolygonMesh, StandardVertex};

/// Vertex index
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vertex(pub u32);

impl From<usize> for Vertex {
    fn from(v: usize) -> Self {
        Self(v.try_into().expect("Too many vertices"))
    }
}

/// 3D triangle mesh
///
/// Positions and normals share one index space, ready for glTF accessors.
pub struct Mesh {
    /// Vertex positions
    pos: Vec<Vec3>,

    /// Vertex normals
    norm: Vec<Vec3>,

    /// Vertex indices
    indices: Vec<Vertex>,
}

/// Mesh builder
///
/// Flattens tessellated polygon meshes, which index positions and normals
/// separately, into a single index space.  A position used with two normals
/// becomes two vertices; identical (position, normal) pairs are reused.
#[derive(Default)]
pub struct MeshBuilder {
    /// Vertex positions
    pos: Vec<Vec3>,

    /// Vertex normals
    norm: Vec<Vec3>,

    /// Vertex indices
    indices: Vec<Vertex>,

    /// Flattened (polygon, position, normal) tuples
    lookup: HashMap<(usize, usize, Option<usize>), Vertex>,

    /// Number of polygon meshes added
    polygons: usize,
}

/// Convert a tessellated point to `Vec3`
fn vec3_of(poly: &PolygonMesh, pos: usize) -> Vec3 {
    let p = poly.positions()[pos];
    Vec3::new(p.x as f32, p.y as f32, p.z as f32)
}

/// Facet normal for triangles without stored normals
fn facet_normal(poly: &PolygonMesh, tri: &[StandardVertex; 3]) -> Vec3 {
    let p0 = vec3_of(poly, tri[0].pos);
    let p1 = vec3_of(poly, tri[1].pos);
    let p2 = vec3_of(poly, tri[2].pos);
    let n = (p1 - p0).cross(p2 - p0);
    if n.length_squared() > 0.0 {
        n.normalize()
    } else {
        Vec3::Z
    }
}

impl MeshBuilder {
    /// Add a tessellated polygon mesh
    ///
    /// Quads and larger faces are fan-triangulated.
    pub fn add_polygon(&mut self, poly: &PolygonMesh) {
        self.polygons += 1;
        for tri in poly.tri_faces() {
            self.push_tri(poly, [tri[0], tri[1], tri[2]]);
        }
        for quad in poly.quad_faces() {
            self.push_tri(poly, [quad[0], quad[1], quad[2]]);
            self.push_tri(poly, [quad[0], quad[2], quad[3]]);
        }
        for face in poly.other_faces() {
            if face.len() < 3 {
                continue;
            }
            for w in face.windows(2).skip(1) {
                self.push_tri(poly, [face[0], w[0], w[1]]);
            }
        }
    }

    /// Push one triangle
    fn push_tri(&mut self, poly: &PolygonMesh, tri: [StandardVertex; 3]) {
        let fallback = match tri.iter().any(|v| v.nor.is_none()) {
            true => facet_normal(poly, &tri),
            false => Vec3::Z,
        };
        for v in tri {
            let idx = self.push_vtx(poly, v, fallback);
            self.indices.push(idx);
        }
    }

    /// Push a (position, normal) pair, reusing identical pairs
    fn push_vtx(&mut self, poly: &PolygonMesh, v: StandardVertex, fallback: Vec3) -> Vertex {
        let key = (self.polygons, v.pos, v.nor);
        if let Some(&idx) = self.lookup.get(&key) {
            return idx;
        }
        let norm = match v.nor {
            Some(nor) => {
                let n = poly.normals()[nor];
                Vec3::new(n.x as f32, n.y as f32, n.z as f32)
            }
            None => fallback,
        };
        let idx = Vertex::from(self.pos.len());
        self.pos.push(vec3_of(poly, v.pos));
        self.norm.push(norm);
        self.lookup.insert(key, idx);
        idx
    }

    /// Build the mesh
    pub fn build(self) -> Mesh {
        Mesh::new(self.pos, self.norm, self.indices)
    }
}

impl Mesh {
    /// Create a new mesh
    pub(crate) fn new(pos: Vec<Vec3>, norm: Vec<Vec3>, indices: Vec<Vertex>) -> Self {
        Mesh { pos, norm, indices }
    }

    /// Build a mesh from tessellated polygon meshes
    pub fn from_polygons<'p, I>(polys: I) -> Self
    where
        I: IntoIterator<Item = &'p PolygonMesh>,
    {
        let mut builder = MeshBuilder::default();
        for poly in polys {
            builder.add_polygon(poly);
        }
        builder.build()
    }

    /// Check if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get slice of all vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.pos[..]
    }

    /// Get slice of all vertex normals
    pub fn normals(&self) -> &[Vec3] {
        &self.norm[..]
    }

    /// Get slice of vertex indices for all triangles
    pub fn indices(&self) -> &[Vertex] {
        &self.indices[..]
    }

    /// Get minimum position
    pub fn pos_min(&self) -> Vec3 {
        self.positions()
            .iter()
            .copied()
            .reduce(|min, v| v.min(min))
            .unwrap()
    }

    /// Get maximum position
    pub fn pos_max(&self) -> Vec3 {
        self.positions()
            .iter()
            .copied()
            .reduce(|max, v| v.max(max))
            .unwrap()
    }
}
