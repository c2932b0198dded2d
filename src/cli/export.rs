use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use script_serving::export::DEFAULT_OUTPUT;
use script_serving::model::{DEFAULT_BOTTLENECK_SIZE, DEFAULT_HIDDEN_SIZE};
use script_serving::{export, ExportConfig, Variant};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input features (N)
    #[arg(long, default_value_t = 2)]
    pub input_size: usize,
    /// Output features (M)
    #[arg(long, default_value_t = 3)]
    pub output_size: usize,
    /// Entry signature: single-tensor, list-output, tuple-output, dict-input, string-passthrough
    #[arg(long, default_value_t = Variant::ListOutput)]
    pub variant: Variant,
    #[arg(long, default_value_t = DEFAULT_HIDDEN_SIZE)]
    pub hidden_size: usize,
    #[arg(long, default_value_t = DEFAULT_BOTTLENECK_SIZE)]
    pub bottleneck_size: usize,
    /// Artifact path, overwritten if present
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl ExportArgs {
    pub fn into_config(self) -> ExportConfig {
        ExportConfig {
            input_size: self.input_size,
            output_size: self.output_size,
            variant: self.variant,
            hidden_size: self.hidden_size,
            bottleneck_size: self.bottleneck_size,
            output: self.output,
        }
    }
}

pub fn cmd_export(args: ExportArgs) -> Result<()> {
    let config = args.into_config();
    let header = export(&config)
        .with_context(|| format!("cannot export to '{}'", config.output.display()))?;
    eprintln!("Wrote {} ({})", config.output.display(), header.signature);
    Ok(())
}
