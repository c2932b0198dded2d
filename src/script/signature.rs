//! Entry-point signatures and the built-in signature variants.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, InferenceError};
use crate::value::{Value, ValueType};

/// A named, typed function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: ValueType,
}

impl Param {
    pub fn new(name: &str, ty: ValueType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// Declared signature of a compiled entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ValueType,
}

impl Signature {
    /// Reject signatures the runtime cannot honor.
    pub fn validate(&self) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for (index, param) in self.params.iter().enumerate() {
            if param.name.is_empty() {
                return Err(CompileError::EmptyParameterName {
                    function: self.name.clone(),
                    index,
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(CompileError::DuplicateParameter {
                    function: self.name.clone(),
                    name: param.name.clone(),
                });
            }
            check_representable(&param.ty, &format!("{}({})", self.name, param.name))?;
        }
        check_representable(&self.returns, &format!("{} return type", self.name))
    }

    /// Check arity and argument types of a call against this signature.
    pub fn check_call(&self, args: &[Value]) -> Result<(), InferenceError> {
        if args.len() != self.params.len() {
            return Err(InferenceError::Arity {
                function: self.name.clone(),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(args) {
            if !param.ty.matches(arg) {
                return Err(InferenceError::ArgumentType {
                    name: param.name.clone(),
                    expected: param.ty.to_string(),
                    found: arg.type_name(),
                });
            }
        }
        Ok(())
    }
}

fn check_representable(ty: &ValueType, location: &str) -> Result<(), CompileError> {
    match ty {
        ValueType::List(inner) => check_representable(inner, location),
        ValueType::Tuple(types) => types.iter().try_for_each(|t| check_representable(t, location)),
        ValueType::Dict(key, value) => {
            if **key != ValueType::Str {
                return Err(CompileError::UnsupportedType {
                    location: location.to_string(),
                    ty: ty.to_string(),
                    reason: "dictionary keys must be `str`",
                });
            }
            check_representable(value, location)
        }
        _ => Ok(()),
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", p.name, p.ty)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

// ─── Variants ──────────────────────────────────────────────────────

/// Built-in input/output shapes for the compiled `forward` entry point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// `forward(x) -> fc(x)`
    SingleTensor,
    /// `forward(x, y) -> [fc(x) + y * 2, y]`
    #[default]
    ListOutput,
    /// `forward(x, y) -> (fc(x) + y * 2, fc(x))`
    TupleOutput,
    /// `forward(inputs, scale, tag) -> {tag: (fc(x) + y * scale, [x, y])}`
    DictInput,
    /// `forward(x, y, name) -> ([fc(x) + y * 2, y], name)`
    StringPassthrough,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::SingleTensor,
        Variant::ListOutput,
        Variant::TupleOutput,
        Variant::DictInput,
        Variant::StringPassthrough,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::SingleTensor => "single-tensor",
            Variant::ListOutput => "list-output",
            Variant::TupleOutput => "tuple-output",
            Variant::DictInput => "dict-input",
            Variant::StringPassthrough => "string-passthrough",
        }
    }

    pub fn signature(self) -> Signature {
        use ValueType::{Int, Str, Tensor};

        let (params, returns) = match self {
            Variant::SingleTensor => (vec![Param::new("x", Tensor)], Tensor),
            Variant::ListOutput => (
                vec![Param::new("x", Tensor), Param::new("y", Tensor)],
                ValueType::list(Tensor),
            ),
            Variant::TupleOutput => (
                vec![Param::new("x", Tensor), Param::new("y", Tensor)],
                ValueType::Tuple(vec![Tensor, Tensor]),
            ),
            Variant::DictInput => (
                vec![
                    Param::new("inputs", ValueType::dict(Str, Tensor)),
                    Param::new("scale", Int),
                    Param::new("tag", Str),
                ],
                ValueType::dict(
                    Str,
                    ValueType::Tuple(vec![Tensor, ValueType::list(Tensor)]),
                ),
            ),
            Variant::StringPassthrough => (
                vec![
                    Param::new("x", Tensor),
                    Param::new("y", Tensor),
                    Param::new("name", Str),
                ],
                ValueType::Tuple(vec![ValueType::list(Tensor), Str]),
            ),
        };
        Signature {
            name: "forward".to_string(),
            params,
            returns,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
                format!("unknown variant '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
