// main.rs      convert_stp_to_glb program
//
// Copyright (c) 2025  Douglas Lau
//
use anyhow::{Context, Result};
use argh::FromArgs;
use std::fs::File;
use std::path::{Path, PathBuf};
use stepglb::{GlbOptions, Model, RasterOptions};

/// Convert a STEP CAD file to a binary glTF (GLB) model
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    /// input STEP file name (.stp)
    #[argh(positional)]
    input_file: String,

    /// output GLB file name
    #[argh(positional)]
    output_file: String,
}

/// Rasterization page size used for every conversion
const PAGE_SIZE: f64 = 1600.0;

/// Main function
fn main() {
    env_logger::init();
    let args: Args = argh::from_env();
    match args.convert() {
        Ok(out) => println!("{}", out.display()),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            std::process::exit(1);
        }
    }
}

impl Args {
    /// Convert the input model
    fn convert(&self) -> Result<PathBuf> {
        let input = Path::new(&self.input_file);
        let output = PathBuf::from(&self.output_file);
        let model = Model::load(input)
            .with_context(|| format!("Loading {}", input.display()))?;
        log::info!(
            "{}: {} entities, {} shells",
            input.display(),
            model.entity_count(),
            model.shell_count()
        );
        let opts = GlbOptions {
            raster: RasterOptions::with_page_size(PAGE_SIZE, PAGE_SIZE),
        };
        let writer = File::create(&output)
            .with_context(|| format!("Cannot create {}", output.display()))?;
        model
            .write_glb(&writer, &opts)
            .context("Writing GLB")?;
        Ok(output)
    }
}
