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

//! Virtual kubelet provider that runs each pod container in its own VM.
//!
//! Containers are built on a remote port layer by threading a handle
//! through a sequence of calls (image, task, scope, logging, interaction)
//! and committing it. Images are resolved through the docker persona.
// Lint groups: https://doc.rust-lang.org/rustc/lints/groups.html
#![warn(future_incompatible, nonstandard_style, unused)]
#![warn(
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    unconditional_recursion,
    unused_comparisons,
    while_true
)]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
#![warn(clippy::unwrap_used)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod config;
pub mod host;
pub mod images;
pub mod isolation;
pub mod logging;
pub mod operation;
pub mod pods;

use config::VicConfig;
use images::{ImageStore, InMemoryImageCache, PersonaImageStore};
use isolation::IsolationProxy;
use operation::Operation;
use pods::{Pod, PodProxy};

const EXIT_OKAY: i32 = 0;
const EXIT_ERROR: i32 = 1;

/// Command line options for vicd.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct VicdOptions {
    /// TOML configuration file. Without one, the persona and port layer
    /// addresses are read from $PERSONA_ADDR and $PORTLAYER_ADDR.
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,
    /// Toggle verbosity. Default false
    #[clap(short, long)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the containers of a pod from a JSON manifest.
    CreatePod {
        manifest: PathBuf,
        /// Move the created containers to RUNNING.
        #[clap(long)]
        start: bool,
        /// Give up on the whole pod after this many seconds.
        #[clap(long)]
        timeout_secs: Option<u64>,
    },
    /// List the images known to the persona.
    Images,
}

pub async fn daemon() -> i32 {
    let options = VicdOptions::parse();

    if let Err(e) = logging::init(options.verbose) {
        eprintln!("failed to initialize logging: {e}");
        return EXIT_ERROR;
    }

    match run(options).await {
        Ok(true) => EXIT_OKAY,
        Ok(false) => EXIT_ERROR,
        Err(e) => {
            error!("{e:?}");
            EXIT_ERROR
        }
    }
}

/// Returns whether the command fully succeeded.
async fn run(options: VicdOptions) -> anyhow::Result<bool> {
    let config = VicConfig::load(options.config.as_deref())
        .context("failed to load configuration")?;
    info!(
        "persona at {}, port layer at {}",
        config.persona_server, config.portlayer_server
    );

    let provider = Provider::new(&config)?;
    let op = Operation::new();
    cancel_on_interrupt(&op);

    if let Err(e) = provider.images.initialize(&op).await {
        warn!("failed to load the persona image list: {e}");
    }

    match options.command {
        Command::CreatePod { manifest, start, timeout_secs } => {
            let op = match timeout_secs {
                Some(secs) => op.with_timeout(Duration::from_secs(secs)),
                None => op,
            };
            let pod = read_manifest(&manifest).await?;
            provider.create_pod(&op, &pod, start).await
        }
        Command::Images => {
            let images = provider.images.images().await?;
            println!("{}", serde_json::to_string_pretty(&images)?);
            Ok(true)
        }
    }
}

fn cancel_on_interrupt(op: &Operation) {
    let op = op.clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling operation {}", op.id());
            op.cancel();
        }
    });
}

async fn read_manifest(path: &Path) -> anyhow::Result<Pod> {
    let manifest = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&manifest)
        .with_context(|| format!("invalid pod manifest {}", path.display()))
}

/// Collaborators wired from a [VicConfig].
#[derive(Debug)]
pub struct Provider {
    pub pods: PodProxy,
    pub images: Arc<PersonaImageStore>,
}

impl Provider {
    pub fn new(config: &VicConfig) -> anyhow::Result<Self> {
        let port_layer = client::Client::new(&config.portlayer_server)
            .context("invalid port layer address")?;
        let images = Arc::new(
            PersonaImageStore::new(
                &config.persona_server,
                Arc::new(InMemoryImageCache::new()),
            )
            .context("invalid persona address")?,
        );

        let isolation = IsolationProxy::new(
            Arc::new(port_layer),
            config.host_identity(),
            config.bootstrap.clone(),
        );
        let pods =
            PodProxy::new(isolation, images.clone(), config.commit_wait_secs);

        Ok(Self { pods, images })
    }

    /// Creates, and optionally starts, `pod`. Prints the per-container
    /// report and returns whether every container succeeded.
    pub async fn create_pod(
        &self,
        op: &Operation,
        pod: &Pod,
        start: bool,
    ) -> anyhow::Result<bool> {
        let creation = self.pods.create_pod(op, pod).await?;
        println!("{}", serde_json::to_string_pretty(&creation.summary())?);

        let mut complete = creation.is_complete();
        if start {
            if let Err(e) = self.pods.start_pod(op, &creation).await {
                error!("{e}");
                complete = false;
            }
        }

        Ok(complete)
    }
}
