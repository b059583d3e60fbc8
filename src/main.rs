mod commands;
mod event;
mod format;
mod logging;
mod sink;
mod utils;
mod web;

use crate::commands::Logd;
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;

fn main() -> ExitCode {
    let logd = Logd::parse();

    match logd.run() {
        Err(err) => {
            let use_colors = std::io::stderr().is_terminal();
            let red = if use_colors { "\x1b[31m" } else { "" };
            let reset = if use_colors { "\x1b[0m" } else { "" };

            eprintln!("{}Error: {}", red, err);
            eprintln!();
            eprintln!("Caused by:");
            eprintln!("  {}{}", err.root_cause(), reset);
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}
