use serde_json::json;

use super::*;

fn only(values: Vec<Value>) -> Value {
    assert_eq!(values.len(), 1, "expected a single decoded value");
    values.into_iter().next().unwrap()
}

// ─── Encoding ──────────────────────────────────────────────────────

#[test]
fn int_tensor_to_json() {
    let t = HostTensor::from_i64(vec![4], vec![1, 2, 3, 4]).unwrap();
    let result = value_to_json(&Value::Tensor(t));

    assert_eq!(result["shape"], json!([4]));
    assert_eq!(result["value"], json!([1, 2, 3, 4]));
    assert_eq!(result["type"], "tensor");
    assert_eq!(result["data_type"], "int64");
}

#[test]
fn float16_tensor_encodes_as_plain_numbers() {
    let t = HostTensor::new(
        vec![2],
        TensorBuffer::F16(vec![half::f16::from_f32(0.5), half::f16::from_f32(-2.0)]),
    )
    .unwrap();
    let result = tensor_to_json(&t);
    assert_eq!(result["data_type"], "float16");
    assert_eq!(result["value"], json!([0.5, -2.0]));
}

#[test]
fn nested_values_to_json() {
    let t = HostTensor::from_f32(vec![1], vec![0.5]).unwrap();
    let value = Value::Dict(
        [(
            "out".to_string(),
            Value::Tuple(vec![
                Value::Tensor(t.clone()),
                Value::List(vec![Value::Tensor(t)]),
            ]),
        )]
        .into_iter()
        .collect(),
    );
    let result = value_to_json(&value);
    assert_eq!(result["type"], "generic_dict");
    assert_eq!(result["value"]["out"][0]["value"], json!([0.5]));
    assert_eq!(result["value"]["out"][1][0]["shape"], json!([1]));
}

#[test]
fn scalars_and_strings_to_json() {
    assert_eq!(
        value_to_json(&Value::Int(7)),
        json!({"type": "scalar", "data_type": "int64", "value": 7})
    );
    assert_eq!(
        value_to_json(&Value::Float(0.25)),
        json!({"type": "scalar", "data_type": "float64", "value": 0.25})
    );
    assert_eq!(
        value_to_json(&Value::Bool(true)),
        json!({"type": "scalar", "data_type": "bool", "value": true})
    );
    assert_eq!(
        value_to_json(&Value::Str("hi".into())),
        json!({"type": "string", "value": "hi"})
    );
}

// ─── Decoding ──────────────────────────────────────────────────────

#[test]
fn json_to_float_tensor() {
    let jt = json!({
        "shape": [2, 3],
        "value": [1.2, 3.4, 4.4, 1.2, 6.2, 7.2],
        "data_type": "float32",
        "type": "tensor",
    });
    let vt = json_to_values(&jt).unwrap();
    assert_eq!(vt.len(), 1);

    let t = vt[0].as_tensor().unwrap();
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(
        t.data(),
        &TensorBuffer::F32(vec![1.2, 3.4, 4.4, 1.2, 6.2, 7.2])
    );
}

#[test]
fn tensor_defaults_to_float32() {
    let t = parse_tensor(&json!({"type": "tensor", "shape": [2], "value": [1, 2]})).unwrap();
    assert_eq!(t.dtype(), DataType::F32);
}

#[test]
fn tensor_casts_to_requested_type() {
    let t = parse_tensor(&json!({
        "type": "tensor", "shape": [3], "data_type": "int32", "value": [1.7, -2.2, 3]
    }))
    .unwrap();
    assert_eq!(t.data(), &TensorBuffer::I32(vec![1, -2, 3]));

    let t = parse_tensor(&json!({
        "type": "tensor", "shape": [2], "data_type": "bool", "value": [0, true]
    }))
    .unwrap();
    assert_eq!(t.data(), &TensorBuffer::Bool(vec![false, true]));
}

#[test]
fn array_payload_yields_one_value_per_argument() {
    let payload = json!([
        {"type": "tensor", "shape": [1, 2], "value": [1, 2]},
        {"type": "tensor_list", "value": [
            {"type": "tensor", "shape": [1], "value": [3]},
            {"type": "tensor", "shape": [1], "value": [4]}
        ]},
        {"type": "tensor_dict", "value": {
            "x": {"type": "tensor", "shape": [1], "value": [5]}
        }},
        {"type": "scalar", "data_type": "int64", "value": 3},
        {"type": "string", "value": "tag"}
    ]);
    let values = json_to_values(&payload).unwrap();
    assert_eq!(values.len(), 5);
    assert!(matches!(values[0], Value::Tensor(_)));
    assert!(matches!(&values[1], Value::List(items) if items.len() == 2));
    assert!(matches!(&values[2], Value::Dict(map) if map.contains_key("x")));
    assert_eq!(values[3], Value::Int(3));
    assert_eq!(values[4], Value::Str("tag".into()));
}

#[test]
fn empty_array_is_no_arguments() {
    assert!(json_to_values(&json!([])).unwrap().is_empty());
}

#[test]
fn scalar_types() {
    let float = only(json_to_values(&json!({"type": "scalar", "data_type": "float32", "value": 1.5})).unwrap());
    assert_eq!(float, Value::Float(1.5));
    let int = only(json_to_values(&json!({"type": "scalar", "data_type": "int16", "value": 9.9})).unwrap());
    assert_eq!(int, Value::Int(9));
    let flag = only(json_to_values(&json!({"type": "scalar", "data_type": "bool", "value": 2})).unwrap());
    assert_eq!(flag, Value::Bool(true));
}

// ─── Decoding Errors ───────────────────────────────────────────────

#[test]
fn shape_mismatch_is_a_shape_error() {
    let err = json_to_values(&json!({
        "type": "tensor", "shape": [2, 3], "value": [1, 2, 3]
    }))
    .unwrap_err();
    assert_eq!(
        err,
        TensorIoError::Shape(
            "Dimension mismatch - shape expected 6 total elements, found 3 total elements".into()
        )
    );
}

#[test]
fn overflowing_shape_is_a_shape_error() {
    let err = json_to_values(&json!({
        "type": "tensor", "shape": [4294967296u64, 4294967296u64, 2], "value": []
    }))
    .unwrap_err();
    assert!(matches!(err, TensorIoError::Shape(_)), "{:?}", err);
}

#[test]
fn unknown_data_type_is_a_type_error() {
    let err = json_to_values(&json!({
        "type": "tensor", "shape": [1], "data_type": "complex64", "value": [1]
    }))
    .unwrap_err();
    assert_eq!(
        err,
        TensorIoError::DataType("Invalid type for Tensor: complex64".into())
    );
}

#[test]
fn malformed_payloads_are_format_errors() {
    let cases = [
        (json!({"value": [1]}), "Error parsing payload, missing required attributes 'type' and 'value'."),
        (json!({"type": 3, "value": [1]}), "Field `type` must be a string"),
        (json!({"type": "tensor", "value": [1], "data_type": 5}), "If specified, data_type must be a string"),
        (json!({"type": "tensor", "value": [1]}), "Error parsing payload, expected 'shape' to be an array for 'type' of 'tensor'"),
        (json!({"type": "tensor", "shape": [1], "value": 1}), "Error parsing payload, expected 'value' to be an array to be converted to 'type' of 'tensor'"),
        (json!({"type": "tensor", "shape": [-1], "value": []}), "Tensor shape must only contain non-negative integers"),
        (json!({"type": "tensor", "shape": [2], "value": [[1], [2]]}), "Tensor values must be a flat array of numbers"),
        (json!({"type": "tensor_list", "value": {}}), "Type tensor_list must be an array"),
        (json!({"type": "tensor_dict", "value": []}), "Type tensor_dict must be an object"),
        (json!({"type": "scalar", "value": 1}), "Type scalar must specify a `data_type` as a string"),
        (json!({"type": "scalar", "data_type": "int64", "value": "1"}), "Type scalar must be a number"),
        (json!({"type": "string", "value": 1}), "Type string must specify a string value"),
        (json!({"type": "sparse", "value": 1}), "Unsupported type: sparse"),
        (json!([1, 2]), "Must be an array of objects"),
        (json!("tensor"), "Must be an array of objects"),
    ];
    for (payload, message) in cases {
        assert_eq!(
            json_to_values(&payload).unwrap_err(),
            TensorIoError::Format(message.to_string()),
            "payload: {}",
            payload
        );
    }
}
