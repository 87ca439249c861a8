//! Ripple CLI
//!
//! Inspects persisted build state.

use std::collections::BTreeSet;
use std::path::Path;

use ripple_build::init_tracing;
use ripple_ir::UnitId;
use ripple_state::{serialize, BuildState};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "stats" => {
            if args.len() < 3 {
                eprintln!("Usage: ripple stats <state-file>");
                std::process::exit(1);
            }
            let state = load_or_exit(&args[2]);
            print_stats(&state);
        }
        "affected" => {
            if args.len() < 4 {
                eprintln!("Usage: ripple affected <state-file> <unit>...");
                std::process::exit(1);
            }
            let state = load_or_exit(&args[2]);
            let changed: BTreeSet<UnitId> = args[3..].iter().map(UnitId::new).collect();
            for unknown in changed.iter().filter(|unit| !state.contains_unit(unit)) {
                eprintln!("warning: {unknown} is not in the build state");
            }
            for unit in state.affected_by(&changed) {
                println!("{unit}");
            }
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("ripple {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn load_or_exit(path: &str) -> BuildState {
    match serialize::load(Path::new(path)) {
        Ok(Some(state)) => state,
        Ok(None) => {
            eprintln!("error: no build state at {path}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_recoverable_by_full_build() {
                eprintln!("note: the next build will rebuild everything and replace this file");
            }
            std::process::exit(1);
        }
    }
}

fn print_stats(state: &BuildState) {
    println!("build number:     {}", state.build_number());
    println!("units:            {}", state.unit_count());
    println!("types:            {}", state.type_count());
    println!("names:            {}", state.names().len());
    println!("units with errors: {}", state.units_with_errors().len());
    for unit in state.units_with_errors() {
        println!("  {unit}");
    }
    let duplicates = state.duplicate_type_names();
    println!("duplicate types:  {}", duplicates.len());
    for type_name in &duplicates {
        let units: Vec<String> = state
            .declaring_units(type_name)
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("  {type_name} ({})", units.join(", "));
    }
    match state.last_structural_changes() {
        Some(changes) => {
            println!("last structural changes: {}", changes.len());
            for type_name in &changes {
                println!("  {type_name}");
            }
        }
        None => println!("last structural changes: too many to track"),
    }
}

fn print_usage() {
    println!("Ripple incremental build state");
    println!();
    println!("Usage: ripple <command> [options]");
    println!();
    println!("Commands:");
    println!("  stats <state-file>              Summarize a persisted build state");
    println!("  affected <state-file> <unit>... Units to recompile if <unit>s changed");
    println!("  help                            Show this help message");
    println!("  version                         Show version information");
    println!();
    println!("Set RUST_LOG=debug to trace state loading.");
}
