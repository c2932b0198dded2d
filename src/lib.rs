//! Compile a fixed three-layer network into a self-describing artifact, and
//! serve compiled artifacts over HTTP with a JSON tensor wire format.
//!
//! The pipeline is `MlpConfig::init` → [`ScriptModule::compile`] →
//! [`ScriptModule::save`]. The server side loads artifacts through a cached
//! [`ServableManager`] and answers `POST /serve` requests via [`ModelServer`].

pub mod artifact;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod script;
pub mod servable;
pub mod server;
pub mod tensor_io;
pub mod value;

pub use artifact::{read_header, ArtifactHeader};
pub use config::ServerConfig;
pub use error::{
    ArtifactError, CompileError, ExportError, InferenceError, ModelError, ServingError,
    TensorIoError,
};
pub use export::{export, ExportConfig};
pub use model::{Mlp, MlpConfig};
pub use script::{ScriptModule, Signature, Variant};
pub use servable::{ScriptServable, Servable, ServableManager, ServingBackend};
pub use server::ModelServer;
pub use tensor_io::{json_to_values, value_to_json};
pub use value::{DataType, HostTensor, TensorBuffer, Value, ValueType};
