//! Fresco - a desktop wallpaper manager with slideshow rotation and a date
//! widget overlay.
//!
//! This binary serves as both the daemon and the CLI:
//! - When called with no arguments: runs the daemon
//! - When called with subcommands (e.g., `fresco set ~/walls/a.jpg`): runs
//!   CLI commands against the running daemon

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let result = if args.len() == 1 { fresco_lib::run() } else { fresco_lib::cli::run() };

    if let Err(err) = result {
        eprintln!("fresco: {err}");
        std::process::exit(1);
    }
}
