//! `generate` command: write a synthetic model to disk.

use std::path::PathBuf;

use cadstream::synthetic::SyntheticModel;

use crate::error::CliError;

pub struct GenerateArgs {
    pub output: PathBuf,
    pub depth: u32,
    pub fanout: u32,
    pub geometry_files: u64,
}

pub fn run(args: GenerateArgs) -> Result<(), CliError> {
    let model = SyntheticModel::default()
        .with_depth(args.depth)
        .with_fanout(args.fanout)
        .with_geometry_files(args.geometry_files);
    let scene = model.write(&args.output)?;

    println!("Wrote {}", args.output.display());
    println!("  Sectors:        {}", scene.sectors.len());
    println!("  Geometry files: {}", model.geometry_files);
    println!();
    println!("Stream it with: cadstream stream --source {}", args.output.display());
    Ok(())
}
