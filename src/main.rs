mod args;
mod cf;

use clap::Parser;
use env_logger::Env;
use log::{debug, error};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("main: args: {:?}", args);

    if let Err(e) = cf::run_dashboard(&args) {
        error!("{}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
