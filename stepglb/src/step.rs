// step.rs      STEP model module
//
// Copyright (c) 2025  Douglas Lau
//
use crate::error::{Error, Result};
use crate::gltf;
use crate::mesh::{Mesh, MeshBuilder};
use crate::options::GlbOptions;
use rayon::prelude::*;
use ruststep::parser::parse;
use std::io::Write;
use std::path::Path;
use truck_meshalgo::prelude::*;
use truck_stepio::r#in::Table;

/// CAD model loaded from a STEP file
///
/// Holds the parsed entity table; geometry is tessellated when the model
/// is written out.
pub struct Model {
    /// STEP entity table
    table: Table,

    /// Entity count across all data sections
    entity_count: usize,
}

impl Model {
    /// Load a model from a STEP file
    ///
    /// Fails on unreadable files, files which are not a STEP exchange, and
    /// exchanges containing no shells.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Model> {
        let raw = std::fs::read_to_string(path)?;
        let exchange = parse(&raw).map_err(|e| Error::Parse(e.to_string()))?;
        let table =
            Table::from_data_section(exchange.data.first().ok_or(Error::NoData)?);
        let entity_count = exchange
            .data
            .iter()
            .map(|section| section.entities.len())
            .sum();
        if table.shell.is_empty() {
            return Err(Error::EmptyModel);
        }
        log::info!(
            "loaded STEP model: {} entities, {} shells",
            entity_count,
            table.shell.len()
        );
        Ok(Model {
            table,
            entity_count,
        })
    }

    /// Get count of entities in the exchange
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Get count of shells in the model
    pub fn shell_count(&self) -> usize {
        self.table.shell.len()
    }

    /// Write the model to a writer as a GLB
    ///
    /// Each shell becomes one mesh / node in the output scene.
    pub fn write_glb<W: Write>(&self, writer: W, opts: &GlbOptions) -> Result<()> {
        let meshes = self.tessellate(opts)?;
        gltf::export(writer, &meshes)?;
        Ok(())
    }

    /// Tessellate all shells into triangle meshes
    fn tessellate(&self, opts: &GlbOptions) -> Result<Vec<Mesh>> {
        // sort by entity ID for run-to-run determinism
        let mut shells: Vec<_> = self.table.shell.iter().collect();
        shells.sort_by_key(|(id, _)| *id);
        let factor = opts.raster.tolerance_factor();
        let meshes = shells
            .into_par_iter()
            .map(|(id, shell)| {
                let compressed = self
                    .table
                    .to_compressed_shell(shell)
                    .map_err(|e| Error::Topology(e.to_string()))?;
                // Two-pass tolerance to avoid degeneracies on large or
                // small models: measure the bounding diameter first
                let coarse = compressed.robust_triangulation(0.01).to_polygon();
                let mut tol = coarse.bounding_box().diameter() * factor;
                if !tol.is_normal() {
                    tol = 0.01;
                }
                log::debug!("shell #{}: tessellation tolerance {}", id, tol);
                let poly_shell = compressed.robust_triangulation(tol);
                let mut builder = MeshBuilder::default();
                for face in &poly_shell.faces {
                    if let Some(surface) = &face.surface {
                        let mesh = match face.orientation {
                            true => surface.clone(),
                            false => surface.inverse(),
                        };
                        builder.add_polygon(&mesh);
                    }
                }
                Ok(builder.build())
            })
            .collect::<Result<Vec<Mesh>>>()?;
        let meshes: Vec<Mesh> =
            meshes.into_iter().filter(|m| !m.is_empty()).collect();
        if meshes.is_empty() {
            return Err(Error::EmptyModel);
        }
        Ok(meshes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;
    use truck_modeling::builder;
    use truck_stepio::out;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("stepglb-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Build a unit box solid and write it out as STEP text
    fn box_step() -> String {
        let v = builder::vertex(truck_modeling::Point3::new(0.0, 0.0, 0.0));
        let e = builder::tsweep(&v, truck_modeling::Vector3::new(1.0, 0.0, 0.0));
        let f = builder::tsweep(&e, truck_modeling::Vector3::new(0.0, 1.0, 0.0));
        let solid = builder::tsweep(&f, truck_modeling::Vector3::new(0.0, 0.0, 1.0));
        let compressed = solid.compress();
        out::CompleteStepDisplay::new(
            out::StepModel::from(&compressed),
            out::StepHeaderDescriptor {
                file_name: "box.stp".to_string(),
                ..Default::default()
            },
        )
        .to_string()
    }

    /// Valid exchange with a header and a single point entity
    const POINT_STEP: &str = "\
ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''), '2;1');
FILE_NAME('point.stp', '', (''), (''), '', '', '');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn missing_file() {
        let res = Model::load("/nonexistent/box.stp");
        assert!(matches!(res, Err(Error::Io(_))));
    }

    #[test]
    fn corrupt_file() {
        let dir = temp_dir("corrupt");
        let path = dir.join("junk.stp");
        std::fs::write(&path, "this is not a STEP file").unwrap();
        assert!(matches!(Model::load(&path), Err(Error::Parse(_))));
    }

    #[test]
    fn no_shells() {
        let dir = temp_dir("noshell");
        let path = dir.join("point.stp");
        std::fs::write(&path, POINT_STEP).unwrap();
        assert!(matches!(Model::load(&path), Err(Error::EmptyModel)));
    }

    #[test]
    fn box_to_glb() {
        let dir = temp_dir("box");
        let path = dir.join("box.stp");
        std::fs::write(&path, box_step()).unwrap();
        let model = Model::load(&path).unwrap();
        assert_eq!(model.shell_count(), 1);
        assert!(model.entity_count() > 0);
        let out_path = dir.join("box.glb");
        // twice: the second run must overwrite cleanly
        for _ in 0..2 {
            let file = std::fs::File::create(&out_path).unwrap();
            model.write_glb(&file, &GlbOptions::default()).unwrap();
        }
        let buf = std::fs::read(&out_path).unwrap();
        assert!(buf.len() > 20);
        assert_eq!(&buf[0..4], b"glTF");
        let total = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        assert_eq!(total as usize, buf.len());
    }

    #[test]
    fn fixed_page_is_deterministic() {
        let dir = temp_dir("determinism");
        let path = dir.join("box.stp");
        std::fs::write(&path, box_step()).unwrap();
        let model = Model::load(&path).unwrap();
        let opts = GlbOptions::default();
        let mut first = Vec::new();
        let mut second = Vec::new();
        model.write_glb(&mut first, &opts).unwrap();
        model.write_glb(&mut second, &opts).unwrap();
        assert_eq!(first, second);
    }
}
