use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use script_serving::ArtifactHeader;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Compiled artifact
    pub artifact: PathBuf,
    /// Print the raw header as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let header = script_serving::read_header(&args.artifact)
        .with_context(|| format!("cannot read '{}'", args.artifact.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&header)?);
    } else {
        print!("{}", describe(&args.artifact, &header));
    }
    Ok(())
}

fn describe(path: &std::path::Path, header: &ArtifactHeader) -> String {
    let c = &header.config;
    format!(
        "artifact:  {}\nformat:    v{}\nvariant:   {}\nsignature: {}\nlayers:\n  fc1  {} -> {}\n  fc2  {} -> {}\n  fc3  {} -> {}\n",
        path.display(),
        header.format_version,
        header.variant,
        header.signature,
        c.input_size,
        c.hidden_size,
        c.hidden_size,
        c.bottleneck_size,
        c.bottleneck_size,
        c.output_size,
    )
}
