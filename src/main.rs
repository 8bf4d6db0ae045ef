use std::process;

use clap::Parser;

use cppfix::cli::Args;

fn main() {
    let args = Args::parse();
    cppfix::init_logging(args.debug);
    match cppfix::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(3);
        }
    }
}
