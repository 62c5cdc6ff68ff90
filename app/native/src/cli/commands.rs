//! CLI command definitions using Clap.
//!
//! Each command maps to one control-socket request. The slideshow command is
//! the exception: it reads the current settings first so partial flag edits
//! never reset unspecified fields.

use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use super::output;
use crate::error::FrescoError;
use crate::ipc::{self, Request, Response};
use crate::platform::path::absolutize;
use crate::settings::SlideshowSettings;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fresco CLI - control a running Fresco wallpaper daemon.
#[derive(Parser, Debug)]
#[command(name = "fresco")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Check that the daemon is running.
    Ping,

    /// Show activation state, slideshow and widget settings.
    Status,

    /// List catalog items in display order.
    List,

    /// Add media files to the catalog.
    Add {
        /// Paths of image, video, or GIF files.
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },

    /// Scan a folder and add every recognized media file.
    #[command(name = "add-folder")]
    AddFolder {
        /// Folder to scan (not recursive).
        #[arg(value_name = "DIR")]
        dir: String,
    },

    /// Activate a catalog item as the desktop background.
    Set {
        /// Path of the catalog item.
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Clear the active background.
    Stop,

    /// Advance the slideshow by one step immediately.
    Next,

    /// Remove an item from the catalog.
    Remove {
        /// Path of the catalog item.
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Configure the slideshow.
    ///
    /// Flags that are not given keep their current value.
    Slideshow {
        /// Turn the slideshow on.
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn the slideshow off.
        #[arg(long)]
        disable: bool,

        /// Minutes between automatic switches.
        #[arg(long, value_name = "MINUTES")]
        interval: Option<u64>,

        /// Pick the next wallpaper at random instead of in order.
        #[arg(long, value_name = "BOOL")]
        random: Option<bool>,

        /// Pause rotation while a fullscreen app is focused.
        #[arg(long = "pause-on-fullscreen", value_name = "BOOL")]
        pause_on_fullscreen: Option<bool>,
    },

    /// Date widget commands.
    #[command(subcommand)]
    Widget(WidgetCommands),

    /// Session autostart commands.
    #[command(subcommand)]
    Autostart(AutostartCommands),

    /// Show the management UI window.
    Show,

    /// Hide the management UI window.
    Hide,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(fresco completions --shell zsh)"
    ///   fresco completions --shell bash > ~/.local/share/bash-completion/completions/fresco
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

/// Date widget subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum WidgetCommands {
    /// Open the date widget overlay.
    Enable,

    /// Close the date widget overlay.
    Disable,

    /// Update one widget setting.
    ///
    /// Keys: locked, showTime, boldText, scale, color, font, alignment,
    /// positionX, positionY.
    Set {
        /// Setting key.
        #[arg(value_name = "KEY")]
        key: String,

        /// New value.
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

/// Autostart subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum AutostartCommands {
    /// Start the daemon with the session.
    Enable,

    /// Remove the session autostart entry.
    Disable,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), FrescoError> {
        match &self.command {
            Commands::Ping => Self::roundtrip(&Request::Ping),
            Commands::Status => Self::roundtrip(&Request::Status),
            Commands::List => Self::roundtrip(&Request::List),

            Commands::Add { paths } => {
                let paths = paths
                    .iter()
                    .map(|path| absolutize(path).display().to_string())
                    .collect();
                Self::roundtrip(&Request::Add { paths })
            }

            Commands::AddFolder { dir } => Self::roundtrip(&Request::AddFolder {
                dir: absolutize(dir).display().to_string(),
            }),

            Commands::Set { path } => Self::roundtrip(&Request::Activate {
                path: absolutize(path).display().to_string(),
            }),

            Commands::Stop => Self::roundtrip(&Request::Stop),
            Commands::Next => Self::roundtrip(&Request::Next),

            Commands::Remove { path } => Self::roundtrip(&Request::Remove {
                path: absolutize(path).display().to_string(),
            }),

            Commands::Slideshow { enable, disable, interval, random, pause_on_fullscreen } => {
                Self::execute_slideshow(*enable, *disable, *interval, *random, *pause_on_fullscreen)
            }

            Commands::Widget(widget_cmd) => Self::execute_widget(widget_cmd),

            Commands::Autostart(autostart_cmd) => Self::roundtrip(&Request::Autostart {
                enable: matches!(autostart_cmd, AutostartCommands::Enable),
            }),

            Commands::Show => Self::roundtrip(&Request::Show),
            Commands::Hide => Self::roundtrip(&Request::Hide),

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "fresco", &mut io::stdout());
    }

    /// Execute the slideshow command.
    fn execute_slideshow(
        enable: bool,
        disable: bool,
        interval_minutes: Option<u64>,
        random: Option<bool>,
        pause_on_fullscreen: Option<bool>,
    ) -> Result<(), FrescoError> {
        if let Some(0) = interval_minutes {
            return Err(FrescoError::InvalidArguments(
                "--interval must be at least 1 minute".to_string(),
            ));
        }

        // Merge flag edits over the daemon's current settings.
        let status = Self::send(&Request::Status)?;
        let mut settings: SlideshowSettings =
            serde_json::from_value(status["slideshow"].clone()).map_err(|err| {
                FrescoError::IpcError(format!("malformed status response: {err}"))
            })?;

        if enable {
            settings.enabled = true;
        }
        if disable {
            settings.enabled = false;
        }
        if let Some(minutes) = interval_minutes {
            settings.interval_secs = minutes.saturating_mul(60);
        }
        if let Some(random) = random {
            settings.random_order = random;
        }
        if let Some(pause) = pause_on_fullscreen {
            settings.pause_on_fullscreen = pause;
        }

        Self::roundtrip(&Request::Slideshow { settings })
    }

    /// Execute widget subcommands.
    fn execute_widget(cmd: &WidgetCommands) -> Result<(), FrescoError> {
        let request = match cmd {
            WidgetCommands::Enable => Request::WidgetEnable { enabled: true },
            WidgetCommands::Disable => Request::WidgetEnable { enabled: false },
            WidgetCommands::Set { key, value } => {
                Request::WidgetSet { key: key.clone(), value: value.clone() }
            }
        };
        Self::roundtrip(&request)
    }

    /// Sends a request and prints the response payload.
    fn roundtrip(request: &Request) -> Result<(), FrescoError> {
        let data = Self::send(request)?;
        output::print_data(&data);
        Ok(())
    }

    /// Sends a request and returns the response payload.
    fn send(request: &Request) -> Result<serde_json::Value, FrescoError> {
        match ipc::send_request(request) {
            Ok(Response::Success { data }) => Ok(data),
            Ok(Response::Error { error }) => Err(FrescoError::CommandError(error)),
            Err(err) => Err(FrescoError::IpcError(err.to_string())),
        }
    }
}
