//! wcstabproj: reorganise spatially TAB projected data into a regular
//! 2-D/3-D FITS image.

mod cli;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use reproject::{Outcome, ReprojectConfig, ReprojectError};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cli::{Args, USAGE};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => return usage_error(),
    };
    if args.help {
        print!("{}", USAGE);
        return ExitCode::SUCCESS;
    }
    let Some(request) = args.request() else {
        return usage_error();
    };

    let config = match ReprojectConfig::load(args.config.as_deref()) {
        Ok(mut config) => {
            args.apply(&mut config);
            config
        }
        Err(err) => return fail(&err.into()),
    };
    if let Err(err) = init_tracing(&config) {
        return fail(&err);
    }

    info!(input = %request.input.display(), output = %request.output, "starting wcstabproj");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = reproject::run(&request, &config, &mut out);
    let _ = out.flush();

    match result {
        Ok(Outcome::Completed(summary)) => {
            info!(filled = summary.filled, "done");
            ExitCode::SUCCESS
        }
        Ok(Outcome::NoCoordinateSystems) => ExitCode::SUCCESS,
        Err(err) => fail(&err.into()),
    }
}

fn usage_error() -> ExitCode {
    eprint!("{}", USAGE);
    ExitCode::FAILURE
}

/// Print a fatal error to stderr; container failures get the FITS
/// diagnostic block.
fn fail(err: &anyhow::Error) -> ExitCode {
    let stderr = std::io::stderr();
    let mut stderr = stderr.lock();
    let container = err
        .downcast_ref::<ReprojectError>()
        .and_then(ReprojectError::container_error);
    match container {
        Some(fits) => {
            let _ = fits.report(&mut stderr);
        }
        None => {
            let _ = writeln!(stderr, "ERROR: {:#}", err);
        }
    }
    ExitCode::FAILURE
}

fn init_tracing(config: &ReprojectConfig) -> Result<()> {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
