use clap::{Parser, Subcommand};
use idsheet::config::{self, SheetConfig};
use idsheet::imaging::rust_backend::can_encode;
use idsheet::imaging::{PaperSize, RustBackend, RustCropProvider, plan_grid};
use idsheet::session::Session;
use idsheet::types::SourceImage;
use idsheet::{naming, output};
use std::path::PathBuf;
use std::sync::Arc;

/// Grid selection shared by commands that lay out a sheet.
#[derive(clap::Args, Clone)]
struct GridArgs {
    /// Number of rows (1-32)
    #[arg(long)]
    rows: Option<String>,

    /// Number of columns (1-32)
    #[arg(long)]
    cols: Option<String>,

    /// Paper preset: a4, 4x6 or 5x7
    #[arg(long)]
    paper: Option<PaperSize>,
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Portrait to crop and tile
    #[arg(long, short)]
    input: PathBuf,

    #[command(flatten)]
    grid: GridArgs,

    /// Background color behind each cell: #rrggbb, #rgb or a CSS color name
    #[arg(long)]
    background: Option<String>,

    /// Move the crop box by X,Y pixels from the centre
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<(i64, i64)>,

    /// Prefix for the exported file name (defaults to the input file name)
    #[arg(long)]
    context: Option<String>,

    /// Directory the sheet is written to
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Also write the cell layout as JSON next to the sheet
    #[arg(long)]
    layout_json: bool,
}

#[derive(Parser)]
#[command(name = "idsheet")]
#[command(about = "Tile a cropped portrait onto a printable ID photo sheet")]
#[command(long_about = "\
Tile a cropped portrait onto a printable ID photo sheet

The portrait is cropped to the cell aspect ratio (360x450 by default), then
drawn into every cell of a rows x cols grid on a paper-sized canvas. Each
cell gets a background color behind the photo and a black outline. The sheet
is saved in the same format as the input.

Paper presets:
  a4    2480x3505
  4x6   1200x1800
  5x7   1500x2100

Run 'idsheet gen-config' to generate a documented idsheet.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "idsheet.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop a portrait and write the composed sheet
    Compose(ComposeArgs),
    /// Print where every cell lands on the sheet
    Layout(GridArgs),
    /// Print a stock idsheet.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Compose(args) => {
            let config = config::load_config(&cli.config)?;
            run_compose(config, args)?;
        }
        Command::Layout(grid) => {
            let config = config::load_config(&cli.config)?;
            let paper = grid.paper.unwrap_or(config.sheet.paper);
            let mut spec = config.grid_spec().with_paper(paper);
            if let Some(rows) = &grid.rows {
                spec.rows = rows.parse()?;
            }
            if let Some(cols) = &grid.cols {
                spec.cols = cols.parse()?;
            }
            output::print_layout(&plan_grid(&spec), Some(paper));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run the whole event sequence for one portrait: load, commit the crop,
/// apply grid and background, wait for the encode, download.
fn run_compose(
    mut config: SheetConfig,
    args: ComposeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(paper) = args.grid.paper {
        config.sheet.paper = paper;
    }
    init_thread_pool(&config.processing);

    let mut crop_options = config.crop_options();
    if let Some(offset) = args.offset {
        crop_options.offset = offset;
    }
    let mut session = Session::new(
        RustCropProvider::new(),
        Arc::new(RustBackend::new()),
        config.grid_spec(),
        crop_options,
        config.quality(),
    );

    let source = SourceImage::from_file(&args.input)?;
    if !can_encode(&source.mime) {
        log::warn!("{} cannot be written back; saving the sheet as PNG", source.mime);
    }
    session.load_image(source)?;
    if !session.commit_crop().is_composed() {
        return Err(format!("could not crop {}", args.input.display()).into());
    }

    if args.grid.rows.is_some() || args.grid.cols.is_some() {
        let rows = args
            .grid
            .rows
            .unwrap_or_else(|| session.spec().rows.to_string());
        let cols = args
            .grid
            .cols
            .unwrap_or_else(|| session.spec().cols.to_string());
        session.on_grid_params_changed(&rows, &cols);
    }
    if let Some(background) = &args.background {
        if let Err(e) = session.on_background_input(background) {
            log::warn!("keeping background {}: {e}", session.spec().background);
        }
    }

    session.settle();

    let context = args.context.unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let download = session
        .download(&context, naming::unix_millis_now())
        .ok_or("encoding the sheet failed")?;

    std::fs::create_dir_all(&args.output)?;
    let path = args.output.join(&download.file_name);
    std::fs::write(&path, download.blob.bytes())?;

    if args.layout_json {
        let json = serde_json::to_string_pretty(&plan_grid(session.spec()))?;
        std::fs::write(path.with_extension("json"), json)?;
    }

    output::print_export(session.spec(), &download, &path);
    Ok(())
}

/// Parse `X,Y` into a pixel offset.
fn parse_offset(value: &str) -> Result<(i64, i64), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not a whole number", s.trim()))
    };
    Ok((parse(x)?, parse(y)?))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_parses_signed_pairs() {
        assert_eq!(parse_offset("10,-20"), Ok((10, -20)));
        assert_eq!(parse_offset(" -5 , 7 "), Ok((-5, 7)));
    }

    #[test]
    fn offset_rejects_malformed() {
        assert!(parse_offset("10").is_err());
        assert!(parse_offset("a,1").is_err());
    }

    #[test]
    fn cli_parses_compose() {
        let cli = Cli::try_parse_from([
            "idsheet", "compose", "--input", "me.jpg", "--rows", "2", "--cols", "3", "--paper",
            "4x6", "--offset", "-10,5",
        ])
        .unwrap();
        let Command::Compose(args) = cli.command else {
            panic!("expected compose");
        };
        assert_eq!(args.grid.rows.as_deref(), Some("2"));
        assert_eq!(args.grid.paper, Some(PaperSize::FourBySix));
        assert_eq!(args.offset, Some((-10, 5)));
        assert_eq!(cli.config, PathBuf::from("idsheet.toml"));
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
