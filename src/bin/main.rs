use ewr_prep::Setup;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ewr-prep",
    about = "Prepare a TEM focal series for electron wave reconstruction"
)]
struct Opt {
    /// Path to the folder containing the .emi/.ser acquisitions
    path: PathBuf,
    /// Skip the cross-correlation shift estimation
    #[structopt(long)]
    no_shifts: bool,
    /// Largest translation searched for between consecutive images [px]
    #[structopt(long, default_value = "64")]
    search_radius: usize,
    /// Beam spread (spatial coherence) [mrad]
    #[structopt(long, allow_hyphen_values = true)]
    alpha: Option<f64>,
    /// Defocus spread (temporal coherence) [nm]
    #[structopt(long, allow_hyphen_values = true)]
    focal_spread: Option<f64>,
    /// Spherical aberration constant C_s [nm]
    #[structopt(long, allow_hyphen_values = true)]
    spherical_aberration: Option<f64>,
    /// Rectangular subset of the data: x y width height (-1 -1 = full image)
    #[structopt(long, number_of_values = 4, allow_hyphen_values = true)]
    subsection: Option<Vec<i64>>,
    /// Template config file
    #[structopt(long, default_value = "default_parameters.param")]
    template: PathBuf,
    /// Where the config file is written
    #[structopt(short, long, default_value = "config.param")]
    output: PathBuf,
    /// Extra config entries as KEY=VALUE, repeatable
    #[structopt(long = "set")]
    set: Vec<String>,
    /// Save a chart of the estimated drift trajectory
    #[cfg(feature = "plot")]
    #[structopt(long)]
    plot_shifts: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut setup = Setup::new(&opt.path)
        .estimate_shifts(!opt.no_shifts)
        .search_radius(opt.search_radius)
        .template(&opt.template)
        .filename(&opt.output);
    if let Some(alpha) = opt.alpha {
        setup = setup.alpha(alpha);
    }
    if let Some(focal_spread) = opt.focal_spread {
        setup = setup.focal_spread(focal_spread);
    }
    if let Some(spherical_aberration) = opt.spherical_aberration {
        setup = setup.spherical_aberration(spherical_aberration);
    }
    if let Some(subsection) = &opt.subsection {
        setup = setup.subsection(subsection[0], subsection[1], subsection[2], subsection[3]);
    }
    for entry in &opt.set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("Expected KEY=VALUE, got {:?}", entry))?;
        setup = setup.set(key, value);
    }
    #[cfg(feature = "plot")]
    if let Some(path) = &opt.plot_shifts {
        setup = setup.shift_plot(path);
    }

    let config = setup.run()?;
    println!("Created config file in {:?}", config);
    Ok(())
}
