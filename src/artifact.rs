//! On-disk container for compiled programs.
//!
//! ```text
//! "SCRIPTMD"            8 bytes magic
//! format version        u32 LE
//! header length         u32 LE
//! header                JSON (variant, layer config, signature)
//! parameter record      burn binary record, full precision
//! ```

use std::path::Path;

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::model::MlpConfig;
use crate::script::{ScriptModule, Variant};

pub const MAGIC: &[u8; 8] = b"SCRIPTMD";
pub const FORMAT_VERSION: u32 = 1;

const PREFIX_LEN: usize = MAGIC.len() + 4 + 4;

/// Self-description stored ahead of the parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub variant: Variant,
    pub config: MlpConfig,
    /// Rendered signature, informational only.
    pub signature: String,
}

type ParamRecorder = BinBytesRecorder<FullPrecisionSettings>;

impl<B: Backend> ScriptModule<B> {
    pub fn header(&self) -> ArtifactHeader {
        ArtifactHeader {
            format_version: FORMAT_VERSION,
            variant: self.variant(),
            config: self.module().config(),
            signature: self.signature().to_string(),
        }
    }

    /// Serialize the compiled program into a byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let header = serde_json::to_vec(&self.header())?;
        let record = <ParamRecorder as Recorder<B>>::record(
            &ParamRecorder::default(),
            self.module.clone().into_record(),
            (),
        )
        .map_err(|e| ArtifactError::Record(format!("{:?}", e)))?;

        let mut out = Vec::with_capacity(PREFIX_LEN + header.len() + record.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(&record);
        Ok(out)
    }

    /// Rebuild and recompile a program from [`ScriptModule::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8], device: &B::Device) -> Result<Self, ArtifactError> {
        let (header, record) = split_artifact(bytes)?;
        let module = header.config.init::<B>(device)?;
        let record = <ParamRecorder as Recorder<B>>::load(&ParamRecorder::default(), record.to_vec(), device)
            .map_err(|e| ArtifactError::Record(format!("{:?}", e)))?;
        Ok(ScriptModule::compile(module.load_record(record), header.variant)?)
    }

    /// Write the artifact to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, device: &B::Device) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, device)
    }
}

/// Read only the header of an artifact file.
pub fn read_header(path: impl AsRef<Path>) -> Result<ArtifactHeader, ArtifactError> {
    let bytes = std::fs::read(path)?;
    split_artifact(&bytes).map(|(header, _)| header)
}

fn split_artifact(bytes: &[u8]) -> Result<(ArtifactHeader, &[u8]), ArtifactError> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ArtifactError::BadMagic);
    }
    if bytes.len() < PREFIX_LEN {
        return Err(ArtifactError::Truncated);
    }
    let version = read_u32(&bytes[8..12]);
    if version != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion(version));
    }
    let header_len = read_u32(&bytes[12..16]) as usize;
    let body = &bytes[PREFIX_LEN..];
    if body.len() < header_len {
        return Err(ArtifactError::Truncated);
    }
    let (header, record) = body.split_at(header_len);
    let header: ArtifactHeader = serde_json::from_slice(header)?;
    if header.format_version != version {
        return Err(ArtifactError::UnsupportedVersion(header.format_version));
    }
    Ok((header, record))
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}
