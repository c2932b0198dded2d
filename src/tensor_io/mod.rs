//! JSON wire format for program inputs and outputs.
//!
//! Inputs are either one tagged object or an array of tagged objects, one per
//! positional argument:
//!
//! ```text
//! {"type": "tensor", "shape": [2, 3], "data_type": "float32", "value": [..6 numbers..]}
//! {"type": "tensor_list", "value": [<tensor>, ...]}
//! {"type": "tensor_dict", "value": {"name": <tensor>, ...}}
//! {"type": "scalar", "data_type": "int64", "value": 3}
//! {"type": "string", "value": "hello"}
//! ```
//!
//! Outputs use the same tensor/scalar/string objects. Lists and tuples become
//! arrays and dictionaries become `{"type": "generic_dict", "value": {..}}`.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde_json::{json, Map, Value as Json};

use crate::error::TensorIoError;
use crate::value::{DataType, HostTensor, TensorBuffer, Value};

const DEFAULT_TENSOR_TYPE: &str = "float32";

// ─── Decoding ──────────────────────────────────────────────────────

/// Decode a request payload into positional program arguments.
pub fn json_to_values(payload: &Json) -> Result<Vec<Value>, TensorIoError> {
    match payload {
        Json::Object(_) => Ok(vec![parse_tagged(payload)?]),
        Json::Array(items) => items
            .iter()
            .map(|item| {
                if item.is_object() {
                    parse_tagged(item)
                } else {
                    Err(TensorIoError::format("Must be an array of objects"))
                }
            })
            .collect(),
        _ => Err(TensorIoError::format("Must be an array of objects")),
    }
}

fn check_tagged_object(payload: &Json) -> Result<&str, TensorIoError> {
    let (Some(ty), Some(_)) = (payload.get("type"), payload.get("value")) else {
        return Err(TensorIoError::format(
            "Error parsing payload, missing required attributes 'type' and 'value'.",
        ));
    };
    let ty = ty
        .as_str()
        .ok_or_else(|| TensorIoError::format("Field `type` must be a string"))?;
    if let Some(data_type) = payload.get("data_type") {
        if !data_type.is_string() {
            return Err(TensorIoError::format("If specified, data_type must be a string"));
        }
    }
    Ok(ty)
}

fn parse_tagged(payload: &Json) -> Result<Value, TensorIoError> {
    let ty = check_tagged_object(payload)?;
    let value = &payload["value"];
    match ty {
        "tensor" => parse_tensor(payload).map(Value::Tensor),
        "tensor_list" => parse_tensor_list(value),
        "tensor_dict" => parse_tensor_dict(value),
        "scalar" => parse_scalar(payload),
        "string" => value
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| TensorIoError::format("Type string must specify a string value")),
        other => Err(TensorIoError::format(format!("Unsupported type: {}", other))),
    }
}

/// Decode one `{"type": "tensor", ...}` object.
pub fn parse_tensor(payload: &Json) -> Result<HostTensor, TensorIoError> {
    check_tagged_object(payload)?;
    let shape = payload
        .get("shape")
        .and_then(Json::as_array)
        .ok_or_else(|| {
            TensorIoError::format(
                "Error parsing payload, expected 'shape' to be an array for 'type' of 'tensor'",
            )
        })?
        .iter()
        .map(|dim| {
            dim.as_u64().and_then(|d| usize::try_from(d).ok()).ok_or_else(|| {
                TensorIoError::format("Tensor shape must only contain non-negative integers")
            })
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let values = payload["value"].as_array().ok_or_else(|| {
        TensorIoError::format(
            "Error parsing payload, expected 'value' to be an array to be converted to 'type' of 'tensor'",
        )
    })?;
    let dtype: DataType = payload
        .get("data_type")
        .and_then(Json::as_str)
        .unwrap_or(DEFAULT_TENSOR_TYPE)
        .parse()?;

    let numbers = values
        .iter()
        .map(|v| match v {
            Json::Number(n) => n.as_f64(),
            Json::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| TensorIoError::format("Tensor values must be a flat array of numbers"))?;

    HostTensor::new(shape, TensorBuffer::from_f64s(&numbers, dtype))
}

fn parse_tensor_list(value: &Json) -> Result<Value, TensorIoError> {
    let items = value
        .as_array()
        .ok_or_else(|| TensorIoError::format("Type tensor_list must be an array"))?;
    items
        .iter()
        .map(|item| parse_tensor(item).map(Value::Tensor))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

fn parse_tensor_dict(value: &Json) -> Result<Value, TensorIoError> {
    let entries = value
        .as_object()
        .ok_or_else(|| TensorIoError::format("Type tensor_dict must be an object"))?;
    entries
        .iter()
        .map(|(key, item)| Ok((key.clone(), Value::Tensor(parse_tensor(item)?))))
        .collect::<Result<BTreeMap<_, _>, TensorIoError>>()
        .map(Value::Dict)
}

fn parse_scalar(payload: &Json) -> Result<Value, TensorIoError> {
    let dtype: DataType = payload
        .get("data_type")
        .and_then(Json::as_str)
        .ok_or_else(|| TensorIoError::format("Type scalar must specify a `data_type` as a string"))?
        .parse()?;
    let number = payload["value"]
        .as_f64()
        .ok_or_else(|| TensorIoError::format("Type scalar must be a number"))?;

    // Route through a one-element buffer so scalars cast exactly like tensors.
    let cast = TensorBuffer::from_f64s(&[number], dtype).to_f64_vec()[0];
    Ok(match dtype {
        DataType::Bool => Value::Bool(cast != 0.0),
        dt if dt.is_float() => Value::Float(cast),
        _ => Value::Int(cast as i64),
    })
}

// ─── Encoding ──────────────────────────────────────────────────────

/// Encode a program result for the response body.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Tensor(t) => tensor_to_json(t),
        Value::Int(n) => json!({"type": "scalar", "data_type": "int64", "value": n}),
        Value::Float(x) => json!({"type": "scalar", "data_type": "float64", "value": x}),
        Value::Bool(b) => json!({"type": "scalar", "data_type": "bool", "value": b}),
        Value::Str(s) => json!({"type": "string", "value": s}),
        Value::List(items) | Value::Tuple(items) => {
            Json::Array(items.iter().map(value_to_json).collect())
        }
        Value::Dict(map) => {
            let entries: Map<String, Json> = map
                .iter()
                .map(|(key, item)| (key.clone(), value_to_json(item)))
                .collect();
            json!({"type": "generic_dict", "value": entries})
        }
    }
}

/// Encode a host tensor as `{"type": "tensor", "shape", "data_type", "value"}`.
pub fn tensor_to_json(t: &HostTensor) -> Json {
    let values: Vec<Json> = match t.data() {
        TensorBuffer::U8(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::I8(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::I16(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::I32(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::I64(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::F16(v) => v.iter().map(|x| json!(x.to_f32())).collect(),
        TensorBuffer::F32(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::F64(v) => v.iter().map(|&x| json!(x)).collect(),
        TensorBuffer::Bool(v) => v.iter().map(|&x| json!(x)).collect(),
    };
    json!({
        "type": "tensor",
        "shape": t.shape(),
        "data_type": t.dtype().name(),
        "value": values,
    })
}
