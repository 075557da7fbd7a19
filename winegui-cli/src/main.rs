//! WineGUI CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use winegui_lib::bottle::program_icon_path;
use winegui_lib::discovery::{self, folder_name};
use winegui_lib::wine::find_uninstaller_guid;
use winegui_lib::{
    Bit, BottleConfigReader, BottleSettings, DllLoadOrder, GeneralSettings, SystemRunner,
    WineBinaries,
};

#[derive(Parser)]
#[command(name = "winegui")]
#[command(about = "Inspect Wine bottles from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the bottles (defaults to the configured folder)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List all bottles
    List,

    /// Show the configuration of a bottle
    Info {
        /// Bottle name or prefix path
        bottle: String,
    },

    /// List the start menu items of a bottle
    Menu {
        bottle: String,
    },

    /// Check whether a DLL is overridden with a load order
    Dll {
        bottle: String,
        dll: String,

        /// builtin, native, builtin,native, native,builtin or disabled
        #[arg(long, default_value = "native")]
        order: DllLoadOrder,
    },

    /// Show the display name of an installed program
    Uninstaller {
        bottle: String,

        /// GUID or uninstall key name
        key: String,

        /// Treat KEY as an application name and resolve its GUID with Wine
        #[arg(long)]
        by_name: bool,
    },

    /// Show the file registered for a font
    Font {
        bottle: String,

        /// Font name, e.g. "Arial (TrueType)"
        font: String,

        /// Registry view to use (32 or 64), defaults to the bottle bitness
        #[arg(long)]
        bit: Option<Bit>,
    },
}

fn init_logging(verbose: u8, enabled: bool) {
    if !enabled && verbose == 0 {
        return;
    }
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("winegui={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve a bottle argument: an existing path is used as-is, anything else
/// is matched against folder names and configured bottle names.
fn find_bottle(bottle: &str, root: &Path, settings: &GeneralSettings) -> Result<PathBuf> {
    let as_path = Path::new(bottle);
    if as_path.is_dir() && (as_path.is_absolute() || bottle.contains('/')) {
        return Ok(as_path.to_path_buf());
    }

    let bottles = discovery::list_bottle_paths(root, settings.display_default_wine_machine)
        .with_context(|| format!("Could not list bottles in {}", root.display()))?;

    bottles
        .into_iter()
        .find(|prefix| folder_name(prefix) == bottle || BottleSettings::read(prefix).name == bottle)
        .with_context(|| format!("No bottle named '{}' in {}", bottle, root.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list(root: &Path, settings: &GeneralSettings, as_json: bool) -> Result<()> {
    let bottles = discovery::list_bottle_paths(root, settings.display_default_wine_machine)
        .with_context(|| format!("Could not list bottles in {}", root.display()))?;

    let mut rows = Vec::new();
    for prefix in &bottles {
        let reader = BottleConfigReader::new(prefix);
        let name = BottleSettings::read(prefix).name;
        let windows = reader.windows_version().map(|w| w.to_string());
        let bit = reader.bitness().map(|b| b.to_string());
        let status = reader.status();
        if let Err(e) = &windows {
            debug!("{}", e);
        }

        rows.push(json!({
            "name": name,
            "prefix": prefix,
            "default": discovery::is_default_bottle(prefix),
            "status": status,
            "windows": windows.as_ref().ok(),
            "bit": bit.as_ref().ok(),
        }));

        if !as_json {
            println!(
                "{:<24} {:<8} {:<16} {:<7} {}",
                name,
                if status { "Ready" } else { "Broken" },
                windows.unwrap_or_else(|_| "- Unknown -".into()),
                bit.unwrap_or_else(|_| "-".into()),
                prefix.display()
            );
        }
    }

    if as_json {
        print_json(&rows)?;
    }
    Ok(())
}

fn info(prefix: &Path, as_json: bool) -> Result<()> {
    let config = BottleConfigReader::new(prefix)
        .read_config()
        .with_context(|| format!("Could not read bottle {}", prefix.display()))?;

    if as_json {
        return print_json(&config);
    }

    println!("Name:            {}", config.name);
    if !config.description.is_empty() {
        println!("Description:     {}", config.description);
    }
    println!("Prefix:          {}", config.prefix.display());
    println!("Status:          {}", if config.status { "Ready" } else { "Broken" });
    println!("Windows:         {} ({})", config.windows, config.bit);
    println!("Audio driver:    {}", config.audio_driver);
    println!(
        "Virtual desktop: {}",
        config.virtual_desktop.as_deref().unwrap_or("Disabled")
    );
    if let Some(c_drive) = &config.c_drive {
        println!("C: drive:        {}", c_drive.display());
    }
    println!(
        "Last updated:    {}",
        config.last_update.as_deref().unwrap_or("- Unknown -")
    );
    println!("Menu items:      {}", config.menu_items.len());
    Ok(())
}

fn menu(prefix: &Path, as_json: bool) -> Result<()> {
    let items = BottleConfigReader::new(prefix).menu_items()?;

    let mut rows = Vec::new();
    for item in &items {
        let icon = match program_icon_path(item) {
            Ok(icon) => icon,
            Err(e) => {
                warn!("No icon for {}: {}", item, e);
                None
            }
        };
        if !as_json {
            match &icon {
                Some(icon) => println!("{}\t{}", item, icon.display()),
                None => println!("{}", item),
            }
        }
        rows.push(json!({ "shortcut": item, "icon": icon }));
    }

    if as_json {
        print_json(&rows)?;
    }
    Ok(())
}

fn run(cli: Cli, settings: &GeneralSettings) -> Result<()> {
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| settings.default_folder.clone());
    let as_json = cli.json;

    match cli.command {
        Command::List => list(&root, settings, as_json),
        Command::Info { bottle } => info(&find_bottle(&bottle, &root, settings)?, as_json),
        Command::Menu { bottle } => menu(&find_bottle(&bottle, &root, settings)?, as_json),
        Command::Dll { bottle, dll, order } => {
            let prefix = find_bottle(&bottle, &root, settings)?;
            let matches = BottleConfigReader::new(&prefix).dll_override(&dll, order)?;
            if as_json {
                print_json(&json!({ "dll": dll, "order": order, "matches": matches }))
            } else {
                println!("{}", if matches { "yes" } else { "no" });
                Ok(())
            }
        }
        Command::Uninstaller {
            bottle,
            key,
            by_name,
        } => {
            let prefix = find_bottle(&bottle, &root, settings)?;
            let key = if by_name {
                let wine = WineBinaries::detect(settings.prefer_wine64)?;
                let guid = find_uninstaller_guid(&SystemRunner, &wine.wine, &prefix, &key)?;
                if guid.is_empty() {
                    bail!("'{}' is not installed in {}", key, prefix.display());
                }
                format!("{{{}}}", guid)
            } else {
                key
            };
            let display_name = BottleConfigReader::new(&prefix).uninstaller(&key)?;
            if as_json {
                print_json(&json!({ "key": key, "display_name": display_name }))
            } else {
                println!("{}", display_name);
                Ok(())
            }
        }
        Command::Font { bottle, font, bit } => {
            let prefix = find_bottle(&bottle, &root, settings)?;
            let reader = BottleConfigReader::new(&prefix);
            let bit = match bit {
                Some(bit) => bit,
                None => reader.bitness()?,
            };
            let file_name = reader.font_filename(bit, &font)?;
            if as_json {
                print_json(&json!({ "font": font, "bit": bit, "file": file_name }))
            } else {
                println!("{}", file_name);
                Ok(())
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = GeneralSettings::load().context("Could not load WineGUI settings")?;
    init_logging(cli.verbose, settings.enable_logging_stderr);
    debug!("Bottle folder: {}", settings.default_folder.display());

    run(cli, &settings)
}
