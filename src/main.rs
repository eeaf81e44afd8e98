use clap::Parser;
use image_sinker::cli::{Args, Runner};
use image_sinker::logging;
use log::error;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match Runner::new(args).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut message = err.to_string();
            let mut source = err.source();
            while let Some(cause) = source {
                // skip causes already in the message
                if !message.contains(&cause.to_string()) {
                    message.push_str(&format!(": {cause}"));
                }
                source = cause.source();
            }
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}
