use anyhow::Context;
use clap::Parser;
use memdb::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let command_name = args.command.as_ref().map(|c| c.name()).unwrap_or_default();

    let result = commands::run(args).with_context(|| format!("{} command failed", command_name));

    match result {
        Ok(_stats) => {
            // Output has already been written by the command
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("memdb - In-memory meteorological observation store");
    println!("==================================================");
    println!();
    println!("Loads a CSV snapshot of stations and observations into memory,");
    println!("answers queries against it and saves changes back atomically.");
    println!();
    println!("USAGE:");
    println!("    memdb [OPTIONS] <COMMAND> [QUERY OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    summary        Show entity counts and variable codes in use");
    println!("    stations       List stations matching the query");
    println!("    data           List observation values matching the query");
    println!("    station-data   List station values matching the query");
    println!("    remove         Remove matching values and save the snapshot");
    println!();
    println!("OPTIONS:");
    println!("    -d, --dir <PATH>       Snapshot directory");
    println!("    -c, --config <FILE>    Configuration file (JSON)");
    println!("        --format <FORMAT>  Output format: human or json");
    println!("    -v, --verbose          Increase verbosity");
    println!("    -q, --quiet            Only report errors");
    println!();
    println!("EXAMPLES:");
    println!("    # Temperatures above 30C in a box around Bologna:");
    println!("    memdb data --latmin 44 --latmax 45 --lonmin 11 --lonmax 12 \\");
    println!("               --datafilter 'B12101>303.15'");
    println!();
    println!("    # Stations across the antimeridian:");
    println!("    memdb stations --lonmin 170 --lonmax -170");
    println!();
    println!("    # Drop a day of surface data:");
    println!("    memdb remove --dtmin 2024-01-01 --dtmax 2024-01-01 --level 1,-,-,-");
    println!();
    println!("For detailed help on any command, use:");
    println!("    memdb <COMMAND> --help");
}
