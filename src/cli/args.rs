//! Command-line argument parsing for the geoarchive CLI.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Sign in; the password is prompted for
    Login { username: String },
    /// Sign out and wipe stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Start a geo-raster conversion
    Convert { item_id: String, detach: bool },
    /// Start georeferencing with a JSON request body
    Georeference {
        file_id: String,
        request: String,
        detach: bool,
    },
    /// Watch an existing task until it settles
    Watch { task_id: String },
    /// Ask the service to cancel a task
    Cancel { task_id: String },
    /// Arguments could not be parsed
    Invalid(String),
}

pub const USAGE: &str = "\
Usage: geoarchive <command> [args]

Commands:
  login <username>                       Sign in (password is prompted)
  logout                                 Sign out and forget stored credentials
  whoami                                 Show the signed-in user
  convert <item_id> [--detach]           Convert an item to a geo-raster
  georeference <file_id> <json> [--detach]
                                         Georeference a file
  watch <task_id>                        Follow a task until it finishes
  cancel <task_id>                       Cancel a task

Options:
  -h, --help                             Show this message
  -V, --version                          Show version";

/// Parse command-line arguments and return the appropriate command.
///
/// `--version` and `--help` win wherever they appear.
///
/// # Examples
///
/// ```
/// use geoarchive::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["geoarchive".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let args: Vec<String> = args.skip(1).collect();

    for arg in &args {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            _ => {}
        }
    }

    let detach = args.iter().any(|a| a == "--detach");
    let mut positional = args.iter().filter(|a| a.as_str() != "--detach");

    let Some(command) = positional.next() else {
        return CliCommand::Help;
    };
    let operands: Vec<String> = positional.cloned().collect();

    match (command.as_str(), operands.as_slice()) {
        ("login", [username]) => CliCommand::Login {
            username: username.clone(),
        },
        ("logout", []) => CliCommand::Logout,
        ("whoami", []) => CliCommand::Whoami,
        ("convert", [item_id]) => CliCommand::Convert {
            item_id: item_id.clone(),
            detach,
        },
        ("georeference", [file_id, request]) => CliCommand::Georeference {
            file_id: file_id.clone(),
            request: request.clone(),
            detach,
        },
        ("watch", [task_id]) => CliCommand::Watch {
            task_id: task_id.clone(),
        },
        ("cancel", [task_id]) => CliCommand::Cancel {
            task_id: task_id.clone(),
        },
        ("login" | "logout" | "whoami" | "convert" | "georeference" | "watch" | "cancel", _) => {
            CliCommand::Invalid(format!("wrong number of arguments for '{}'", command))
        }
        (other, _) => CliCommand::Invalid(format!("unknown command '{}'", other)),
    }
}
