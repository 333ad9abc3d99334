//! `skinforge info` - inspect an archive without writing output.

use std::path::PathBuf;

use clap::Args;

use skinforge::Converter;

use crate::commands::read_archive;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Path to the skin archive
    pub archive: PathBuf,
}

pub fn run(args: InfoArgs) -> Result<(), CliError> {
    let bytes = read_archive(&args.archive)?;
    let package = Converter::default().convert(&bytes)?;

    println!("Name:     {}", package.metadata.name);
    println!("Author:   {}", package.metadata.author);
    println!("Version:  {}", package.metadata.version);
    println!("Window:   {}x{}", package.window_size.0, package.window_size.1);
    println!("Pages:    {}", package.atlas_pages.len());
    println!("Regions:  {}", package.hit_regions.len());
    println!("Palette:  {} colors", package.color_scheme.len());
    println!(
        "Shape:    {}",
        if package.window_silhouette.is_some() {
            "custom silhouette"
        } else {
            "rectangular"
        }
    );

    if package.diagnostics.is_empty() {
        println!("\nNo conversion diagnostics; skin is fully authentic.");
    } else {
        println!("\nDiagnostics ({}):", package.diagnostics.len());
        for diag in &package.diagnostics {
            println!("  {diag}");
        }
    }

    println!("\n{}", package.summary());
    Ok(())
}
