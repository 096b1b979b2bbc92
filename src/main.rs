//! Slotkit command-line front end

use slotkit::cli::SlotCli;
use slotkit::SlotError;
use std::process;

fn main() {
    let mut cli = SlotCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(SlotError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
