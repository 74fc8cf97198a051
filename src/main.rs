use clap::{Parser, Subcommand};
use jampass::generate::{BuildEvent, BuildOptions, Builder};
use jampass::{config, output, watch};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

#[derive(Parser)]
#[command(name = "jampass")]
#[command(about = "Static site builder driven by file-name routes")]
#[command(long_about = "\
Static site builder driven by file-name routes

Every file under views/ is a template whose name says where it is written.
One JSON data file feeds every view.

Project structure:

  site/
  ├── jampass.toml                 # Config (optional, see gen-config)
  ├── jampass.data.json            # Data: an array, or {data, pagination, indexes}
  ├── views/
  │   ├── index.html               # Paginated: public/index.html, public/2/index.html
  │   ├── about.html               # Static: public/about.html
  │   ├── -[slug].html             # Loop: one page per item, named by its slug
  │   ├── [#2_slug:0].html         # Page 2, named by the slug of its first item
  │   └── partials/
  │       └── header.html          # Partial: {{> header}}
  ├── style/app.css                # Linked assets, processed into public/
  └── public/                      # Output

Run 'jampass gen-config' to generate a documented jampass.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/jampass.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every view into the output directory
    Build {
        /// Development build: no asset hashes, no minification
        #[arg(long)]
        dev: bool,
    },
    /// Build, then rebuild on every change
    Watch,
    /// Print each view's route and outputs without rendering
    Routes,
    /// Print a stock jampass.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "warn" },
    ))
    .format_timestamp(None)
    .init();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let root = cli.root.canonicalize().unwrap_or(cli.root.clone());
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(config::CONFIG_FILE_NAME));
    let site_config = config::load_config(&config_path)?;
    log::debug!("loaded config from {}", config_path.display());

    match cli.command {
        Command::Build { dev } => {
            let options = BuildOptions { dev, watch: false };
            build_once(site_config, &root, options)?;
        }
        Command::Watch => {
            let options = BuildOptions {
                dev: true,
                watch: true,
            };
            let (tx, printer) = spawn_printer();
            let mut builder = Builder::new(site_config, &root, options)?.with_events(tx);
            // Errors in the first build are reported like any later rebuild.
            match builder.build() {
                Ok(report) => output::print_build_report(&report),
                Err(e) => eprintln!("error: {e}"),
            }
            println!("==> Watching {}", root.display());
            watch::run(&mut builder, |change, result| {
                for line in output::format_change(change, &root) {
                    println!("{}", line);
                }
                match result {
                    Ok(report) => output::print_build_report(report),
                    Err(e) => eprintln!("error: {e}"),
                }
            })?;
            drop(builder);
            printer.join().ok();
        }
        Command::Routes => {
            let builder = Builder::new(site_config, &root, BuildOptions::default())?;
            output::print_routes(&builder.routes()?);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Print build events from a separate thread until every sender is dropped.
fn spawn_printer() -> (Sender<BuildEvent>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

/// One-shot build with progress printed from a separate thread.
fn build_once(
    site_config: config::SiteConfig,
    root: &Path,
    options: BuildOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, printer) = spawn_printer();
    let mut builder = Builder::new(site_config, root, options)?.with_events(tx);
    let result = builder.build();
    // Closes the channel so the printer finishes.
    drop(builder);
    printer.join().ok();

    let report = result?;
    output::print_build_report(&report);
    println!("==> Build complete: {}", root.display());
    Ok(())
}
