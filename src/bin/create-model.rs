//! Write `model-example.pt` (2 inputs, 3 outputs, list output) to the
//! current directory.

use anyhow::Context;

use script_serving::{export, ExportConfig};

fn main() -> anyhow::Result<()> {
    script_serving::logging::init();
    let config = ExportConfig::default();
    export(&config).with_context(|| format!("cannot write '{}'", config.output.display()))?;
    Ok(())
}
