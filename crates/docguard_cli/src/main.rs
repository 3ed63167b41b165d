//! Command-line probe for `docguard_core`.
//!
//! # Usage
//! - `docguard_cli version`
//! - `docguard_cli filter <permissions.json> [role]` reads a JSON record,
//!   array of records or `null` from stdin and prints what `role` may see.
//!   The role defaults to the anonymous `"null"` role.
//!
//! Setting `DOCGUARD_LOG_DIR` to an absolute path enables file logging.

use docguard_core::{default_log_level, filter_value, init_logging, PermissionTable, PUBLIC_ROLE};
use std::io::Read;
use std::process::ExitCode;

const USAGE: &str = "usage: docguard_cli version | docguard_cli filter <permissions.json> [role]";

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("DOCGUARD_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("version") => {
            println!("docguard_core version={}", docguard_core::core_version());
            Ok(())
        }
        Some("filter") => match args.get(1) {
            Some(path) => run_filter(path, args.get(2).map_or(PUBLIC_ROLE, String::as_str)),
            None => Err(USAGE.to_string()),
        },
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_filter(permissions_path: &str, role: &str) -> Result<(), String> {
    let raw = std::fs::read_to_string(permissions_path)
        .map_err(|err| format!("cannot read `{permissions_path}`: {err}"))?;
    let table: PermissionTable =
        serde_json::from_str(&raw).map_err(|err| format!("invalid permissions: {err}"))?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|err| format!("cannot read stdin: {err}"))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&input).map_err(|err| format!("invalid input JSON: {err}"))?;

    filter_value(&mut value, &table, role);
    log::debug!("event=cli_filter module=cli status=ok role={role}");

    let rendered =
        serde_json::to_string_pretty(&value).map_err(|err| format!("cannot render output: {err}"))?;
    println!("{rendered}");
    Ok(())
}
