/// Command-line argument handling for the balance report tool.
///
/// The surface is deliberately small: one positional argument (path to the
/// settings file), `-h`/`--help`/`-?` for usage, and `--debug` to unlock
/// debug-level log output.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage.
/// Tests can override the default `env::args()` collection.
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments (used by tests).
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments.
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific flag is present on the command line.
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Help request via any of the usual spellings.
pub fn is_help_requested() -> bool {
    has_arg("-h") || has_arg("--help") || has_arg("-?")
}

/// Debug logging mode.
pub fn is_debug_enabled() -> bool {
    has_arg("--debug")
}

/// First non-flag argument after the binary name: the settings file path.
pub fn get_settings_file_path() -> Option<String> {
    get_cmd_args()
        .into_iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
}

/// Prints usage to stdout.
pub fn print_help() {
    println!("Tool to obtain balance of client wallets in blockchain");
    println!();
    println!("Usage: balance-report <settingsFilePath> [--debug]");
    println!();
    println!("Arguments:");
    println!("  settingsFilePath   Path of the tool settings file (JSON)");
    println!();
    println!("Options:");
    println!("  -h | --help | -?   Show this help");
    println!("  --debug            Print debug-level log output");
}
