use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use tracing::info;

use script_serving::{ModelServer, ScriptServable, ServerConfig};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to run the server on
    #[arg(long, default_value = "localhost")]
    pub host: String,
    /// Port to run the server on
    #[arg(short, long, default_value_t = 8888)]
    pub port: u16,
    /// Maximum number of servables kept in memory at any point in time
    #[arg(short = 'c', long, default_value_t = 10)]
    pub model_capacity: usize,
    /// Soft buffer around model capacity for LRU eviction
    #[arg(short, long, default_value_t = 3)]
    pub buffer_size: usize,
    /// Worker threads in the serving runtime
    #[arg(short, long, default_value_t = 8)]
    pub threads: usize,
    /// Resolve relative servable identifiers against this directory
    #[arg(long)]
    pub model_root: Option<PathBuf>,
    /// Largest accepted request body, in bytes (default: 16 MB)
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    pub max_body_size: usize,
    /// Probability that a request reloads its servable from disk
    #[arg(long, default_value_t = 0.0)]
    pub invalidation_prob: f32,
}

impl ServeArgs {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            model_capacity: self.model_capacity,
            buffer_size: self.buffer_size,
            threads: self.threads,
            max_body_size: self.max_body_size,
            invalidation_prob: self.invalidation_prob,
            model_root: self.model_root,
        }
    }
}

pub fn cmd_serve(args: ServeArgs) -> Result<()> {
    let config = args.into_config();
    ensure!(config.threads > 0, "--threads must be at least 1");
    ensure!(
        (0.0..=1.0).contains(&config.invalidation_prob),
        "--invalidation-prob must be between 0 and 1, got {}",
        config.invalidation_prob
    );
    if let Some(root) = &config.model_root {
        ensure!(root.is_dir(), "model root '{}' is not a directory", root.display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads)
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    info!(target: "model_server", "Allocated runtime with {} worker threads", config.threads);

    let addr = config.bind_addr();
    runtime
        .block_on(ModelServer::<ScriptServable>::new(config).run())
        .with_context(|| format!("model server on {} stopped", addr))
}
