//! Print what coldpix sees in a single AVHRR pass file.
//!
//! Usage: `inspect_pass <pass.nc> [--variable mcsst] [--template template.nc]`

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use coldpix::composite::DaylightTable;
use coldpix::data_loader::load_swath;
use coldpix::interpolation::get_interpolator;
use coldpix::regrid::{clean_swath, regrid_clean};
use coldpix::swath::Coordinates;
use coldpix::writer::CompositeTemplate;
use coldpix::PassInfo;

#[derive(Parser, Debug)]
#[command(name = "inspect_pass", about = "Inspect a satellite pass file")]
struct Args {
    /// Pass file, named like 131105.309.1854.n19.BPU.CF.nc
    path: PathBuf,
    /// Temperature variable
    #[arg(long, default_value = "mcsst")]
    variable: String,
    /// Template to regrid onto, reporting the covered cells
    #[arg(long)]
    template: Option<PathBuf>,
}

fn describe(name: &str, coords: &Coordinates) -> String {
    match coords {
        Coordinates::Axis(values) => format!("{} axis, {} values", name, values.len()),
        Coordinates::Mesh(mesh) => format!("{} mesh, shape {:?}", name, mesh.dim()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let info = PassInfo::from_path(&args.path)
        .with_context(|| format!("unrecognised pass file name {}", args.path.display()))?;
    let window = DaylightTable::default().for_day(info.day());
    println!("Pass:        {}", info);
    println!("Day:         {}", info.day());
    println!(
        "Daylight:    {} ({})",
        window,
        if window.contains(info.hour()) { "inside" } else { "outside" }
    );

    let swath = load_swath(&args.path, &args.variable, coldpix::composite::DEFAULT_FILL_VALUE)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let valid = swath
        .sst
        .iter()
        .filter(|v| v.is_finite() && Some(**v) != swath.fill_value)
        .count();
    println!("Field:       {} {:?}", args.variable, swath.sst.dim());
    println!("Coordinates: {}; {}", describe("lon", &swath.lon), describe("lat", &swath.lat));
    println!("Fill value:  {:?} (coordinates {:?})", swath.fill_value, swath.coord_fill);
    println!("Valid cells: {} of {}", valid, swath.sst.len());

    let Some(clean) = clean_swath(&swath) else {
        println!("Cleaned:     degenerate, contributes nothing");
        return Ok(());
    };
    let (min_lon, min_lat, max_lon, max_lat) = clean.bounds();
    println!(
        "Cleaned:     {}x{} lon [{:.3}, {:.3}] lat [{:.3}, {:.3}]",
        clean.lat.len(),
        clean.lon.len(),
        min_lon,
        max_lon,
        min_lat,
        max_lat
    );

    if let Some(template) = &args.template {
        let template = CompositeTemplate::load(template)
            .with_context(|| format!("failed to load template {}", template.display()))?;
        let interpolator = get_interpolator("bilinear")?;
        let field = regrid_clean(&clean, &template.grid, interpolator.as_ref());
        let covered = field.iter().filter(|v| !v.is_nan()).count();
        println!("Regridded:   {} of {} template cells", covered, field.len());
    }

    Ok(())
}
