use clap::Parser;
use log::{debug, info};

mod args;
mod tab;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    debug!("args: {:?}", args);
    let res = tab::run_tabulation(
        args.config.as_str(),
        args.out.as_deref(),
        args.reference.as_deref(),
    );

    match res {
        Ok(()) => info!("Tabulation done"),
        Err(e) => {
            tab::report_error(&e);
            std::process::exit(1);
        }
    }
}
