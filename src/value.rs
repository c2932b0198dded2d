//! Runtime values exchanged with compiled programs, and the static type
//! language used to declare their signatures.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use half::f16;

use crate::error::TensorIoError;

// ─── Element Types ─────────────────────────────────────────────────

/// Element type of a host tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    Bool,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::U8,
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::F16,
        DataType::F32,
        DataType::F64,
        DataType::Bool,
    ];

    /// Wire name, e.g. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            DataType::U8 => "uint8",
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
            DataType::F16 => "float16",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
            DataType::Bool => "bool",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::F16 | DataType::F32 | DataType::F64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = TensorIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.name() == s)
            .ok_or_else(|| TensorIoError::data_type(format!("Invalid type for Tensor: {}", s)))
    }
}

// ─── Host Tensors ──────────────────────────────────────────────────

/// Typed flat storage for a host tensor, in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
}

impl TensorBuffer {
    /// Cast `values` into a buffer of element type `dtype`.
    ///
    /// Integer targets truncate toward zero and saturate at the type bounds;
    /// `bool` is true for any non-zero value.
    pub fn from_f64s(values: &[f64], dtype: DataType) -> Self {
        let it = values.iter().copied();
        match dtype {
            DataType::U8 => TensorBuffer::U8(it.map(|v| v as u8).collect()),
            DataType::I8 => TensorBuffer::I8(it.map(|v| v as i8).collect()),
            DataType::I16 => TensorBuffer::I16(it.map(|v| v as i16).collect()),
            DataType::I32 => TensorBuffer::I32(it.map(|v| v as i32).collect()),
            DataType::I64 => TensorBuffer::I64(it.map(|v| v as i64).collect()),
            DataType::F16 => TensorBuffer::F16(it.map(f16::from_f64).collect()),
            DataType::F32 => TensorBuffer::F32(it.map(|v| v as f32).collect()),
            DataType::F64 => TensorBuffer::F64(it.collect()),
            DataType::Bool => TensorBuffer::Bool(it.map(|v| v != 0.0).collect()),
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            TensorBuffer::U8(_) => DataType::U8,
            TensorBuffer::I8(_) => DataType::I8,
            TensorBuffer::I16(_) => DataType::I16,
            TensorBuffer::I32(_) => DataType::I32,
            TensorBuffer::I64(_) => DataType::I64,
            TensorBuffer::F16(_) => DataType::F16,
            TensorBuffer::F32(_) => DataType::F32,
            TensorBuffer::F64(_) => DataType::F64,
            TensorBuffer::Bool(_) => DataType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorBuffer::U8(v) => v.len(),
            TensorBuffer::I8(v) => v.len(),
            TensorBuffer::I16(v) => v.len(),
            TensorBuffer::I32(v) => v.len(),
            TensorBuffer::I64(v) => v.len(),
            TensorBuffer::F16(v) => v.len(),
            TensorBuffer::F32(v) => v.len(),
            TensorBuffer::F64(v) => v.len(),
            TensorBuffer::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            TensorBuffer::U8(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::I8(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::I16(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::I32(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::I64(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::F16(v) => v.iter().map(|x| x.to_f64()).collect(),
            TensorBuffer::F32(v) => v.iter().map(|&x| x as f64).collect(),
            TensorBuffer::F64(v) => v.clone(),
            TensorBuffer::Bool(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
        }
    }

    /// Floating point elements as `f32`, or `None` for non-float buffers.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            TensorBuffer::F16(v) => Some(v.iter().map(|x| x.to_f32()).collect()),
            TensorBuffer::F32(v) => Some(v.clone()),
            TensorBuffer::F64(v) => Some(v.iter().map(|&x| x as f32).collect()),
            _ => None,
        }
    }
}

/// Product of `dims`, or `None` if it overflows `usize`.
pub fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A dense tensor held in host memory.
#[derive(Clone, Debug, PartialEq)]
pub struct HostTensor {
    shape: Vec<usize>,
    data: TensorBuffer,
}

impl HostTensor {
    /// Build a tensor, checking that `data` holds exactly as many elements as
    /// `shape` describes.
    pub fn new(shape: Vec<usize>, data: TensorBuffer) -> Result<Self, TensorIoError> {
        let Some(expected) = element_count(&shape) else {
            return Err(TensorIoError::shape(format!(
                "Dimension mismatch - shape {:?} describes more elements than can be addressed, found {} total elements",
                shape,
                data.len()
            )));
        };
        if expected != data.len() {
            return Err(TensorIoError::shape(format!(
                "Dimension mismatch - shape expected {} total elements, found {} total elements",
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, TensorIoError> {
        Self::new(shape, TensorBuffer::F32(values))
    }

    pub fn from_i64(shape: Vec<usize>, values: Vec<i64>) -> Result<Self, TensorIoError> {
        Self::new(shape, TensorBuffer::I64(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &TensorBuffer {
        &self.data
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

// ─── Values ────────────────────────────────────────────────────────

/// A dynamically typed value passed to or returned from a compiled program.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Tensor(HostTensor),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Short type name, used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Tensor(_) => "Tensor".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(items) => match items.first() {
                Some(first) => format!("List[{}]", first.type_name()),
                None => "List[Any]".to_string(),
            },
            Value::Tuple(items) => {
                let inner: Vec<String> = items.iter().map(Value::type_name).collect();
                format!("Tuple[{}]", inner.join(", "))
            }
            Value::Dict(map) => match map.values().next() {
                Some(first) => format!("Dict[str, {}]", first.type_name()),
                None => "Dict[str, Any]".to_string(),
            },
        }
    }

    pub fn as_tensor(&self) -> Option<&HostTensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<HostTensor> for Value {
    fn from(t: HostTensor) -> Self {
        Value::Tensor(t)
    }
}

// ─── Static Types ──────────────────────────────────────────────────

/// A type annotation in a program signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    Tensor,
    Int,
    Float,
    Bool,
    Str,
    List(Box<ValueType>),
    Tuple(Vec<ValueType>),
    Dict(Box<ValueType>, Box<ValueType>),
}

impl ValueType {
    pub fn list(inner: ValueType) -> Self {
        ValueType::List(Box::new(inner))
    }

    pub fn dict(key: ValueType, value: ValueType) -> Self {
        ValueType::Dict(Box::new(key), Box::new(value))
    }

    /// Whether `value` inhabits this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Tensor, Value::Tensor(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Bool, Value::Bool(_))
            | (ValueType::Str, Value::Str(_)) => true,
            (ValueType::List(inner), Value::List(items)) => items.iter().all(|v| inner.matches(v)),
            (ValueType::Tuple(types), Value::Tuple(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(t, v)| t.matches(v))
            }
            // Runtime dictionaries only carry string keys.
            (ValueType::Dict(key, inner), Value::Dict(map)) => {
                **key == ValueType::Str && map.values().all(|v| inner.matches(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Tensor => f.write_str("Tensor"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Str => f.write_str("str"),
            ValueType::List(inner) => write!(f, "List[{}]", inner),
            ValueType::Tuple(types) => {
                f.write_str("Tuple[")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                f.write_str("]")
            }
            ValueType::Dict(key, value) => write!(f, "Dict[{}, {}]", key, value),
        }
    }
}
