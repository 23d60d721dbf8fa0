/* -------------------------------------------------------------------------- *\
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 * -------------------------------------------------------------------------- *
 * Copyright 2022 - 2024, the aurae contributors                              *
 * SPDX-License-Identifier: Apache-2.0                                        *
\* -------------------------------------------------------------------------- */

use thiserror::Error;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error(transparent)]
    TryInitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Logs to stdout.
///
/// Normal mode: Info, Warn, Error
/// Verbose mode: Debug, Trace, Info, Warn, Error
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    let tracing_level = if verbose { Level::TRACE } else { Level::INFO };

    let stdout_layer = tracing_subscriber::Layer::with_filter(
        tracing_subscriber::fmt::layer().compact(),
        EnvFilter::new(filter_directive(tracing_level)),
    );

    tracing_subscriber::registry().with(stdout_layer).try_init()?;

    info!("initialized logging at {tracing_level}");
    Ok(())
}

fn filter_directive(level: Level) -> String {
    format!("vicd={level},client={level}")
}
