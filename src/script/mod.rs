//! Script compilation: binding an [`Mlp`] to a declared entry signature.
//!
//! Compilation validates the signature and the module's layer chain up
//! front, so `forward` only has to check the caller's arguments. A compiled
//! [`ScriptModule`] can be persisted with [`ScriptModule::save`] and restored
//! without the code that built it.

mod signature;


pub use signature::{Param, Signature, Variant};

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::error::{CompileError, InferenceError};
use crate::model::Mlp;
use crate::value::{element_count, HostTensor, Value};

/// A module compiled against one signature variant.
#[derive(Clone, Debug)]
pub struct ScriptModule<B: Backend> {
    pub(crate) module: Mlp<B>,
    variant: Variant,
    signature: Signature,
    device: B::Device,
}

impl<B: Backend> ScriptModule<B> {
    /// Validate `variant`'s signature and `module`'s layer chain.
    pub fn compile(module: Mlp<B>, variant: Variant) -> Result<Self, CompileError> {
        let signature = variant.signature();
        signature.validate()?;

        let config = module.config();
        config.validate()?;
        let mut features = config.input_size;
        for (layer, [d_input, d_output]) in module.layer_dims() {
            if d_input != features {
                return Err(CompileError::LayerMismatch {
                    layer,
                    expected: d_input,
                    found: features,
                });
            }
            features = d_output;
        }
        if features != config.output_size {
            return Err(CompileError::LayerMismatch {
                layer: "output",
                expected: config.output_size,
                found: features,
            });
        }

        let device = module.devices().into_iter().next().unwrap_or_default();
        Ok(Self {
            module,
            variant,
            signature,
            device,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn module(&self) -> &Mlp<B> {
        &self.module
    }

    /// Run the compiled entry point.
    pub fn forward(&self, args: Vec<Value>) -> Result<Value, InferenceError> {
        self.signature.check_call(&args)?;
        let mut args = args.into_iter();

        match self.variant {
            Variant::SingleTensor => {
                let x = next_tensor(&mut args, "x")?;
                let out = self.project(&x, "x")?;
                Ok(Value::Tensor(self.to_host(out)?))
            }
            Variant::ListOutput => {
                let x = next_tensor(&mut args, "x")?;
                let y = next_tensor(&mut args, "y")?;
                let out = self.project(&x, "x")?;
                let combined = self.add_scaled(out, &y, "y", 2.0)?;
                Ok(Value::List(vec![
                    Value::Tensor(self.to_host(combined)?),
                    Value::Tensor(y),
                ]))
            }
            Variant::TupleOutput => {
                let x = next_tensor(&mut args, "x")?;
                let y = next_tensor(&mut args, "y")?;
                let out = self.project(&x, "x")?;
                let combined = self.add_scaled(out.clone(), &y, "y", 2.0)?;
                Ok(Value::Tuple(vec![
                    Value::Tensor(self.to_host(combined)?),
                    Value::Tensor(self.to_host(out)?),
                ]))
            }
            Variant::DictInput => {
                let mut inputs = match args.next() {
                    Some(Value::Dict(map)) => map,
                    other => return Err(wrong_argument("inputs", "Dict[str, Tensor]", other)),
                };
                let scale = next_int(&mut args, "scale")?;
                let tag = next_str(&mut args, "tag")?;

                let x = take_key(&mut inputs, "x")?;
                let y = take_key(&mut inputs, "y")?;
                let out = self.project(&x, "inputs['x']")?;
                let combined = self.add_scaled(out, &y, "inputs['y']", scale as f32)?;

                let entry = Value::Tuple(vec![
                    Value::Tensor(self.to_host(combined)?),
                    Value::List(vec![Value::Tensor(x), Value::Tensor(y)]),
                ]);
                Ok(Value::Dict([(tag, entry)].into_iter().collect()))
            }
            Variant::StringPassthrough => {
                let x = next_tensor(&mut args, "x")?;
                let y = next_tensor(&mut args, "y")?;
                let name = next_str(&mut args, "name")?;
                let out = self.project(&x, "x")?;
                let combined = self.add_scaled(out, &y, "y", 2.0)?;
                Ok(Value::Tuple(vec![
                    Value::List(vec![
                        Value::Tensor(self.to_host(combined)?),
                        Value::Tensor(y),
                    ]),
                    Value::Str(name),
                ]))
            }
        }
    }

    // ─── Tensor Glue ───────────────────────────────────────────────

    /// Apply the network to `x`, flattening leading dimensions into the batch.
    fn project(&self, x: &HostTensor, arg: &str) -> Result<Batch<B>, InferenceError> {
        let input = self.to_matrix(x, self.module.input_size(), arg)?;
        Ok(Batch {
            rows: input.rows.map(|m| self.module.forward(m)),
            leading: input.leading,
            cols: self.module.output_size(),
        })
    }

    /// `out + y * scale`, where `y` must have the output's shape.
    fn add_scaled(
        &self,
        out: Batch<B>,
        y: &HostTensor,
        arg: &str,
        scale: f32,
    ) -> Result<Batch<B>, InferenceError> {
        let mut expected = out.leading.clone();
        expected.push(out.cols);
        if y.shape() != expected.as_slice() {
            return Err(InferenceError::Shape(format!(
                "Incompatible shapes: argument '{}' has shape {:?}, expected {:?}",
                arg,
                y.shape(),
                expected
            )));
        }
        let y = self.to_matrix(y, out.cols, arg)?;
        let rows = match (out.rows, y.rows) {
            (Some(out), Some(y)) => Some(out.add(y.mul_scalar(scale))),
            _ => None,
        };
        Ok(Batch { rows, ..out })
    }

    fn to_matrix(&self, t: &HostTensor, cols: usize, arg: &str) -> Result<Batch<B>, InferenceError> {
        let values = t.data().to_f32_vec().ok_or_else(|| {
            InferenceError::DataType(format!(
                "argument '{}' must be a floating point tensor, found {}",
                arg,
                t.dtype()
            ))
        })?;
        let (&last, leading) = t.shape().split_last().ok_or_else(|| {
            InferenceError::Shape(format!("argument '{}' must have at least one dimension", arg))
        })?;
        if last != cols {
            return Err(InferenceError::Shape(format!(
                "argument '{}' has trailing dimension {}, expected {}",
                arg, last, cols
            )));
        }
        let rows = element_count(leading).ok_or_else(|| {
            InferenceError::Shape(format!(
                "argument '{}' has too many batch elements: {:?}",
                arg, leading
            ))
        })?;
        let matrix = (rows > 0)
            .then(|| Tensor::<B, 2>::from_data(TensorData::new(values, [rows, cols]), &self.device));
        Ok(Batch {
            rows: matrix,
            leading: leading.to_vec(),
            cols,
        })
    }

    fn to_host(&self, batch: Batch<B>) -> Result<HostTensor, InferenceError> {
        let values = match batch.rows {
            Some(t) => t
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| InferenceError::Backend(format!("{:?}", e)))?,
            None => Vec::new(),
        };
        let mut shape = batch.leading;
        shape.push(batch.cols);
        HostTensor::from_f32(shape, values).map_err(|e| InferenceError::Backend(e.to_string()))
    }
}

/// Rows in flight through the network, with the leading dimensions they were
/// flattened from. `rows` is `None` for an empty batch, which never reaches
/// the backend.
#[derive(Clone)]
struct Batch<B: Backend> {
    rows: Option<Tensor<B, 2>>,
    leading: Vec<usize>,
    cols: usize,
}

// ─── Argument Unpacking ────────────────────────────────────────────

fn wrong_argument(name: &str, expected: &str, found: Option<Value>) -> InferenceError {
    InferenceError::ArgumentType {
        name: name.to_string(),
        expected: expected.to_string(),
        found: found.map_or_else(|| "nothing".to_string(), |v| v.type_name()),
    }
}

fn next_tensor(args: &mut impl Iterator<Item = Value>, name: &str) -> Result<HostTensor, InferenceError> {
    match args.next() {
        Some(Value::Tensor(t)) => Ok(t),
        other => Err(wrong_argument(name, "Tensor", other)),
    }
}

fn next_int(args: &mut impl Iterator<Item = Value>, name: &str) -> Result<i64, InferenceError> {
    match args.next() {
        Some(Value::Int(n)) => Ok(n),
        other => Err(wrong_argument(name, "int", other)),
    }
}

fn next_str(args: &mut impl Iterator<Item = Value>, name: &str) -> Result<String, InferenceError> {
    match args.next() {
        Some(Value::Str(s)) => Ok(s),
        other => Err(wrong_argument(name, "str", other)),
    }
}

fn take_key(
    map: &mut std::collections::BTreeMap<String, Value>,
    key: &str,
) -> Result<HostTensor, InferenceError> {
    match map.remove(key) {
        Some(Value::Tensor(t)) => Ok(t),
        Some(other) => Err(wrong_argument(&format!("inputs['{}']", key), "Tensor", Some(other))),
        None => Err(InferenceError::MissingKey(key.to_string())),
    }
}
