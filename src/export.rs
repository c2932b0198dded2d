//! One-shot export: construct the network, compile it, write the artifact.

use std::path::PathBuf;

use tracing::info;

use crate::artifact::ArtifactHeader;
use crate::error::ExportError;
use crate::model::{MlpConfig, DEFAULT_BOTTLENECK_SIZE, DEFAULT_HIDDEN_SIZE};
use crate::script::{ScriptModule, Variant};
use crate::servable::ServingBackend;

pub const DEFAULT_OUTPUT: &str = "model-example.pt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub variant: Variant,
    pub hidden_size: usize,
    pub bottleneck_size: usize,
    /// Destination file, overwritten if present.
    pub output: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input_size: 2,
            output_size: 3,
            variant: Variant::ListOutput,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            bottleneck_size: DEFAULT_BOTTLENECK_SIZE,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl ExportConfig {
    pub fn model_config(&self) -> MlpConfig {
        MlpConfig::new(self.input_size, self.output_size)
            .with_hidden_sizes(self.hidden_size, self.bottleneck_size)
    }
}

/// Construct, compile and save. Returns the header that was written.
pub fn export(config: &ExportConfig) -> Result<ArtifactHeader, ExportError> {
    let device = Default::default();
    let model_config = config.model_config();
    info!(
        target: "export",
        "Constructing network {} -> {} -> {} -> {}",
        model_config.input_size,
        model_config.hidden_size,
        model_config.bottleneck_size,
        model_config.output_size
    );
    let module = model_config.init::<ServingBackend>(&device)?;

    let program = ScriptModule::compile(module, config.variant)?;
    info!(target: "export", "Compiled {}", program.signature());

    program.save(&config.output)?;
    info!(target: "export", "Saved compiled program to {}", config.output.display());
    Ok(program.header())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::read_header;
    use crate::error::ModelError;

    fn small(dir: &tempfile::TempDir, variant: Variant) -> ExportConfig {
        ExportConfig {
            variant,
            hidden_size: 8,
            bottleneck_size: 4,
            output: dir.path().join(format!("{}.pt", variant)),
            ..ExportConfig::default()
        }
    }

    #[test]
    fn defaults_reproduce_example_model() {
        let config = ExportConfig::default();
        assert_eq!(config.output, PathBuf::from("model-example.pt"));
        assert_eq!(
            config.model_config(),
            MlpConfig::new(2, 3).with_hidden_sizes(10_000, 1_000)
        );
        assert_eq!(config.variant, Variant::ListOutput);
    }

    #[test]
    fn export_writes_a_readable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        for variant in Variant::ALL {
            let config = small(&dir, variant);
            let written = export(&config).unwrap();
            assert_eq!(read_header(&config.output).unwrap(), written);
            assert_eq!(written.variant, variant);
        }
    }

    #[test]
    fn zero_sized_layers_fail_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            output_size: 0,
            ..small(&dir, Variant::ListOutput)
        };
        let err = export(&config).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Model(ModelError::ZeroDimension { name: "output_size" })
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn missing_directory_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            output: dir.path().join("missing").join("model.pt"),
            ..small(&dir, Variant::SingleTensor)
        };
        assert!(matches!(export(&config), Err(ExportError::Artifact(_))));
    }
}
