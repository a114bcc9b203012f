//! Command-line surface.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{self, Settings};
use crate::error::{Error, Result};
use crate::library::{
    LibraryRegistry, LibraryStore, LoftyExtractor, Scanner, Track, display_from_fields,
    format_duration,
};
use crate::runtime;

#[derive(Parser)]
#[command(name = "reprise")]
#[command(about = "Play your music library, least played first", long_about = None)]
pub struct Cli {
    /// Directory holding config.toml and the library files
    #[arg(long, env = "REPRISE_HOME", global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a library from a directory of music
    New {
        /// Library name
        name: String,
        /// Root directory to scan
        path: PathBuf,
    },
    /// List all libraries
    List,
    /// Rescan a library for added and removed files
    Update { name: String },
    /// Delete a library (the music files are left alone)
    Delete {
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Play a library, least played tracks first
    Play {
        name: String,
        /// Rescan the library in the background while playing
        #[arg(short, long)]
        refresh: bool,
    },
    /// Show the tracks of a library, most played first
    Show {
        name: String,
        /// Only list favourites
        #[arg(short, long)]
        favourites: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let home = cli
        .home
        .or_else(config::resolve_home)
        .ok_or_else(|| Error::Config("cannot find a configuration home; set REPRISE_HOME".into()))?;
    let settings = runtime::load_settings(Some(&home));
    let mut registry = open_registry(&home, &settings)?;

    match cli.command {
        Commands::New { name, path } => {
            let library = registry.create(&name, &path)?;
            println!(
                "Created library \"{name}\" with {} tracks.",
                library.read().len()
            );
        }
        Commands::List => list(&registry),
        Commands::Update { name } => {
            let report = registry.update(&name)?;
            println!(
                "Updated \"{name}\": {} added, {} removed, {} unchanged.",
                report.added, report.removed, report.unchanged
            );
        }
        Commands::Delete { name, yes } => {
            delete(&mut registry, &name, yes, io::stdin().lock(), &mut io::stdout())?
        }
        Commands::Play { name, refresh } => runtime::play(&registry, &name, &settings, refresh)?,
        Commands::Show { name, favourites } => {
            let library = registry.get(&name)?;
            let index = library.read();
            let tracks: Vec<&Track> = if favourites {
                index.favourites().collect()
            } else {
                index.tracks().collect()
            };
            for row in show_rows(tracks, &settings) {
                println!("{row}");
            }
        }
    }
    Ok(())
}

fn open_registry(home: &Path, settings: &Settings) -> Result<LibraryRegistry> {
    let extractor = Arc::new(LoftyExtractor::new(&settings.library));
    let scanner = Scanner::new(settings.library.clone(), extractor);
    LibraryRegistry::open(LibraryStore::new(home.join("libraries")), scanner)
}

fn list(registry: &LibraryRegistry) {
    let libraries = registry.list();
    if libraries.is_empty() {
        println!("There are currently no music libraries!");
        return;
    }
    for lib in libraries {
        match (&lib.root, &lib.problem) {
            (Some(root), None) => {
                println!("{}\t{}\t{} tracks", lib.name, root.display(), lib.track_count)
            }
            (_, problem) => println!(
                "{}\t(unreadable: {})",
                lib.name,
                problem.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// `show` output, most played first.
fn show_rows(mut tracks: Vec<&Track>, settings: &Settings) -> Vec<String> {
    tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count).then_with(|| a.path.cmp(&b.path)));
    tracks
        .into_iter()
        .map(|t| {
            let fav = if t.favourite { '*' } else { ' ' };
            let name = display_from_fields(
                t,
                &settings.ui.now_playing_fields,
                &settings.ui.now_playing_separator,
            );
            let dur = t.duration.map(format_duration).unwrap_or_default();
            format!("{:>5} {fav} {name}  {dur}", t.play_count)
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Delete `name` after asking, unless `yes`. Declining is an error so the
/// command exits non-zero.
fn delete(
    registry: &mut LibraryRegistry,
    name: &str,
    yes: bool,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    registry.ensure_known(name)?;
    let question = format!("Are you sure you want to delete library \"{name}\"?");
    if !yes && !confirm(&question, input, out)? {
        return Err(Error::Aborted);
    }
    registry.delete(name)?;
    writeln!(out, "Deleted library \"{name}\".").map_err(Error::Console)
}

/// Ask a yes/no question; anything but `y`/`yes` is a no.
fn confirm(question: &str, mut input: impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{question} [y/N] ")
        .and_then(|()| out.flush())
        .map_err(Error::Console)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(Error::Console)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
