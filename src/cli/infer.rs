use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use script_serving::{json_to_values, value_to_json, ScriptModule, ServingBackend};

#[derive(Args, Debug)]
pub struct InferArgs {
    /// Compiled artifact
    pub artifact: PathBuf,
    /// JSON payload in the `/serve` request format
    pub payload: PathBuf,
}

pub fn cmd_infer(args: InferArgs) -> Result<()> {
    let device = Default::default();
    let program = ScriptModule::<ServingBackend>::load(&args.artifact, &device)
        .with_context(|| format!("cannot load '{}'", args.artifact.display()))?;

    let text = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("cannot read '{}'", args.payload.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not valid JSON", args.payload.display()))?;
    let inputs = json_to_values(&payload).context("invalid input payload")?;

    let output = program.forward(inputs).context("inference failed")?;
    println!("{}", serde_json::to_string_pretty(&value_to_json(&output))?);
    Ok(())
}
