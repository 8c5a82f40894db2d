// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from `.onnx` protobuf and `.json` files.
//!
//! Protobuf files are memory-mapped and decoded in one pass with `prost`;
//! the resulting messages are then lowered into the descriptor types. Tensor
//! payloads stored in external files are *not* read here: they become
//! [`TensorData::External`] references and are resolved by the importer,
//! relative to [`ModelDescriptor::base_dir`].

use crate::dtype::dtype_from_onnx;
use crate::proto::{self, attribute_type};
use crate::{
    AttributeValue, ExternalDataRef, GraphDescriptor, ModelDescriptor, ModelError,
    NodeDescriptor, OpsetImports, TensorData, TensorDescriptor, ValueInfo,
};
use prost::Message;
use std::collections::BTreeMap;
use std::path::Path;
use tensor_core::{Dim, PartialShape};

/// Loads model descriptions from disk.
///
/// # Example
/// ```no_run
/// use onnx_model::ModelLoader;
/// use std::path::Path;
///
/// let model = ModelLoader::load(Path::new("./models/resnet18.onnx")).unwrap();
/// println!("{} top-level nodes", model.graph.nodes.len());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model, choosing the format by file extension.
    ///
    /// The external-data base directory is set to the file's directory.
    pub fn load(path: &Path) -> Result<ModelDescriptor, ModelError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let model = match ext.as_deref() {
            Some("onnx") => {
                let file = std::fs::File::open(path)?;
                // SAFETY: the mapping is read-only and dropped before return;
                // decoding copies everything it keeps.
                let mmap = unsafe { memmap2::Mmap::map(&file) }?;
                let mut model = Self::from_bytes(&mmap)?;
                model.base_dir = path.parent().map(Path::to_path_buf);
                model
            }
            Some("json") => ModelDescriptor::from_json_file(path)?,
            _ => {
                return Err(ModelError::UnsupportedFormat {
                    path: path.display().to_string(),
                })
            }
        };

        model.validate()?;
        tracing::info!(
            "loaded model '{}' from {} ({} nodes)",
            model.graph.name,
            path.display(),
            model.graph.total_nodes(),
        );
        Ok(model)
    }

    /// Decodes an in-memory ONNX protobuf payload.
    ///
    /// The result has no base directory; set one with
    /// [`ModelDescriptor::with_base_dir`] if it references external data.
    pub fn from_bytes(bytes: &[u8]) -> Result<ModelDescriptor, ModelError> {
        let proto = proto::ModelProto::decode(bytes)?;
        model_from_proto(proto)
    }
}

// ── Proto lowering ─────────────────────────────────────────────────

fn model_from_proto(proto: proto::ModelProto) -> Result<ModelDescriptor, ModelError> {
    let graph = proto.graph.ok_or(ModelError::MissingGraph)?;

    let mut opset_imports = OpsetImports::new();
    for opset in &proto.opset_import {
        opset_imports.insert(&opset.domain, opset.version);
    }

    Ok(ModelDescriptor {
        ir_version: proto.ir_version,
        producer_name: proto.producer_name,
        opset_imports,
        graph: graph_from_proto(graph)?,
        base_dir: None,
    })
}

fn graph_from_proto(proto: proto::GraphProto) -> Result<GraphDescriptor, ModelError> {
    let initializers = proto
        .initializer
        .into_iter()
        .map(tensor_from_proto)
        .collect::<Result<Vec<_>, _>>()?;
    let nodes = proto
        .node
        .into_iter()
        .map(node_from_proto)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GraphDescriptor {
        name: proto.name,
        initializers,
        inputs: proto.input.into_iter().map(value_info_from_proto).collect(),
        nodes,
        outputs: proto.output.into_iter().map(value_info_from_proto).collect(),
    })
}

fn node_from_proto(proto: proto::NodeProto) -> Result<NodeDescriptor, ModelError> {
    let mut attributes = BTreeMap::new();
    for attr in proto.attribute {
        let name = attr.name.clone();
        if let Some(value) = attribute_from_proto(attr)? {
            attributes.insert(name, value);
        } else {
            tracing::warn!(
                "node '{}' ({}): skipping attribute '{name}' of unsupported type",
                proto.name,
                proto.op_type,
            );
        }
    }

    Ok(NodeDescriptor {
        name: proto.name,
        op_type: proto.op_type,
        domain: proto.domain,
        inputs: proto.input,
        outputs: proto.output,
        attributes,
    })
}

/// Lowers one attribute; `Ok(None)` for sparse-tensor and type-proto
/// attributes, which the descriptor model does not carry.
fn attribute_from_proto(proto: proto::AttributeProto) -> Result<Option<AttributeValue>, ModelError> {
    let kind = if proto.r#type == attribute_type::UNDEFINED {
        infer_attribute_type(&proto)
    } else {
        proto.r#type
    };

    let value = match kind {
        attribute_type::FLOAT => AttributeValue::Float(proto.f),
        attribute_type::INT => AttributeValue::Int(proto.i),
        attribute_type::STRING => {
            AttributeValue::String(String::from_utf8_lossy(&proto.s).into_owned())
        }
        attribute_type::TENSOR => match proto.t {
            Some(t) => AttributeValue::Tensor(tensor_from_proto(t)?),
            None => return Ok(None),
        },
        attribute_type::GRAPH => match proto.g {
            Some(g) => AttributeValue::Graph(graph_from_proto(g)?),
            None => return Ok(None),
        },
        attribute_type::FLOATS => AttributeValue::Floats(proto.floats),
        attribute_type::INTS => AttributeValue::Ints(proto.ints),
        attribute_type::STRINGS => AttributeValue::Strings(
            proto
                .strings
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
        ),
        attribute_type::TENSORS => AttributeValue::Tensors(
            proto
                .tensors
                .into_iter()
                .map(tensor_from_proto)
                .collect::<Result<_, _>>()?,
        ),
        attribute_type::GRAPHS => AttributeValue::Graphs(
            proto
                .graphs
                .into_iter()
                .map(graph_from_proto)
                .collect::<Result<_, _>>()?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Picks the populated field of an untyped (pre-IR-v2) attribute.
fn infer_attribute_type(proto: &proto::AttributeProto) -> i32 {
    if proto.g.is_some() {
        attribute_type::GRAPH
    } else if proto.t.is_some() {
        attribute_type::TENSOR
    } else if !proto.graphs.is_empty() {
        attribute_type::GRAPHS
    } else if !proto.tensors.is_empty() {
        attribute_type::TENSORS
    } else if !proto.floats.is_empty() {
        attribute_type::FLOATS
    } else if !proto.ints.is_empty() {
        attribute_type::INTS
    } else if !proto.strings.is_empty() {
        attribute_type::STRINGS
    } else if !proto.s.is_empty() {
        attribute_type::STRING
    } else if proto.f != 0.0 {
        attribute_type::FLOAT
    } else {
        attribute_type::INT
    }
}

fn tensor_from_proto(proto: proto::TensorProto) -> Result<TensorDescriptor, ModelError> {
    let data = if proto.data_location == proto::DATA_LOCATION_EXTERNAL {
        TensorData::External(external_ref(&proto)?)
    } else if !proto.raw_data.is_empty() {
        TensorData::Raw(proto.raw_data)
    } else if !proto.float_data.is_empty() {
        TensorData::Floats(proto.float_data)
    } else if !proto.int32_data.is_empty() {
        TensorData::Int32s(proto.int32_data)
    } else if !proto.int64_data.is_empty() {
        TensorData::Int64s(proto.int64_data)
    } else if !proto.double_data.is_empty() {
        TensorData::Doubles(proto.double_data)
    } else if !proto.uint64_data.is_empty() {
        TensorData::UInt64s(proto.uint64_data)
    } else if !proto.string_data.is_empty() {
        TensorData::Strings(proto.string_data)
    } else {
        TensorData::Empty
    };

    Ok(TensorDescriptor {
        name: proto.name,
        elem_type: proto.data_type,
        dims: proto.dims,
        data,
    })
}

/// Reads the `external_data` key/value entries.
///
/// A missing `location` is kept as an empty string so the importer reports
/// it as unresolvable external data, with the initializer's name attached.
fn external_ref(proto: &proto::TensorProto) -> Result<ExternalDataRef, ModelError> {
    let mut location = String::new();
    let mut offset = 0u64;
    let mut length = None;

    for entry in &proto.external_data {
        let parse = |value: &str| {
            value.parse::<u64>().map_err(|_| {
                ModelError::InvalidGraph(format!(
                    "tensor '{}': external data {} '{}' is not an integer",
                    proto.name, entry.key, value
                ))
            })
        };
        match entry.key.as_str() {
            "location" => location = entry.value.clone(),
            "offset" => offset = parse(&entry.value)?,
            "length" => length = Some(parse(&entry.value)?),
            _ => {}
        }
    }

    Ok(ExternalDataRef {
        location,
        offset,
        length,
    })
}

fn value_info_from_proto(proto: proto::ValueInfoProto) -> ValueInfo {
    let tensor_type = proto.r#type.and_then(|t| t.tensor_type);
    let (elem_type, shape) = match tensor_type {
        Some(t) => {
            let shape = match t.shape {
                Some(s) => PartialShape::Ranked(
                    s.dim
                        .iter()
                        .map(|d| match d.dim_value {
                            Some(v) if v >= 0 => Dim::Fixed(v as usize),
                            _ => Dim::Dynamic,
                        })
                        .collect(),
                ),
                None => PartialShape::dynamic(),
            };
            (dtype_from_onnx(t.elem_type), shape)
        }
        None => (None, PartialShape::dynamic()),
    };
    ValueInfo::new(proto.name, elem_type, shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::elem_type;
    use crate::proto::tensor_shape_proto::Dimension;
    use tensor_core::DType;

    fn value_info(name: &str, dims: &[Option<i64>]) -> proto::ValueInfoProto {
        proto::ValueInfoProto {
            name: name.into(),
            r#type: Some(proto::TypeProto {
                tensor_type: Some(proto::type_proto::Tensor {
                    elem_type: elem_type::FLOAT,
                    shape: Some(proto::TensorShapeProto {
                        dim: dims
                            .iter()
                            .map(|d| Dimension {
                                dim_value: *d,
                                dim_param: d.is_none().then(|| "batch".to_string()),
                            })
                            .collect(),
                    }),
                }),
            }),
            doc_string: String::new(),
        }
    }

    fn sample_proto() -> proto::ModelProto {
        let bias = proto::TensorProto {
            name: "b".into(),
            data_type: elem_type::FLOAT,
            dims: vec![2],
            float_data: vec![0.5, 1.5],
            ..Default::default()
        };
        let node = proto::NodeProto {
            name: "add0".into(),
            op_type: "Add".into(),
            input: vec!["a".into(), "b".into()],
            output: vec!["c".into()],
            attribute: vec![proto::AttributeProto {
                name: "note".into(),
                s: b"hello".to_vec(),
                ..Default::default()
            }],
            ..Default::default()
        };
        proto::ModelProto {
            ir_version: 8,
            producer_name: "unit-test".into(),
            graph: Some(proto::GraphProto {
                name: "g".into(),
                node: vec![node],
                initializer: vec![bias],
                input: vec![value_info("a", &[None, Some(2)])],
                output: vec![value_info("c", &[None, Some(2)])],
                ..Default::default()
            }),
            opset_import: vec![proto::OperatorSetIdProto {
                domain: "ai.onnx".into(),
                version: 17,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_from_bytes() {
        let bytes = sample_proto().encode_to_vec();
        let model = ModelLoader::from_bytes(&bytes).unwrap();

        assert_eq!(model.producer_name, "unit-test");
        assert_eq!(model.opset_imports.get(""), Some(17));
        assert_eq!(model.graph.nodes[0].name, "add0");
        assert_eq!(
            model.graph.initializers[0].data,
            TensorData::Floats(vec![0.5, 1.5])
        );
        assert_eq!(model.graph.inputs[0].elem_type, Some(DType::F32));
        assert_eq!(
            model.graph.inputs[0].shape,
            PartialShape::Ranked(vec![Dim::Dynamic, Dim::Fixed(2)])
        );
    }

    #[test]
    fn test_untyped_attribute_inferred() {
        let bytes = sample_proto().encode_to_vec();
        let model = ModelLoader::from_bytes(&bytes).unwrap();
        assert_eq!(
            model.graph.nodes[0].attribute("note"),
            Some(&AttributeValue::String("hello".into()))
        );
    }

    #[test]
    fn test_missing_graph() {
        let mut proto = sample_proto();
        proto.graph = None;
        let err = ModelLoader::from_bytes(&proto.encode_to_vec()).unwrap_err();
        assert!(matches!(err, ModelError::MissingGraph));
    }

    #[test]
    fn test_garbage_bytes() {
        let err = ModelLoader::from_bytes(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ModelError::Protobuf(_)));
    }

    #[test]
    fn test_external_data_reference() {
        let tensor = proto::TensorProto {
            name: "w".into(),
            data_type: elem_type::FLOAT,
            dims: vec![4],
            data_location: proto::DATA_LOCATION_EXTERNAL,
            external_data: vec![
                proto::StringStringEntryProto {
                    key: "location".into(),
                    value: "weights.bin".into(),
                },
                proto::StringStringEntryProto {
                    key: "offset".into(),
                    value: "16".into(),
                },
                proto::StringStringEntryProto {
                    key: "length".into(),
                    value: "16".into(),
                },
            ],
            ..Default::default()
        };
        let t = tensor_from_proto(tensor).unwrap();
        assert_eq!(
            t.data,
            TensorData::External(ExternalDataRef {
                location: "weights.bin".into(),
                offset: 16,
                length: Some(16),
            })
        );
    }

    #[test]
    fn test_bad_external_offset() {
        let tensor = proto::TensorProto {
            name: "w".into(),
            data_location: proto::DATA_LOCATION_EXTERNAL,
            external_data: vec![proto::StringStringEntryProto {
                key: "offset".into(),
                value: "sixteen".into(),
            }],
            ..Default::default()
        };
        assert!(tensor_from_proto(tensor).is_err());
    }

    #[test]
    fn test_subgraph_attribute() {
        let body = proto::GraphProto {
            name: "then".into(),
            ..Default::default()
        };
        let attr = proto::AttributeProto {
            name: "then_branch".into(),
            r#type: attribute_type::GRAPH,
            g: Some(body),
            ..Default::default()
        };
        let value = attribute_from_proto(attr).unwrap();
        assert!(matches!(value, Some(AttributeValue::Graph(g)) if g.name == "then"));
    }

    #[test]
    fn test_unsupported_attribute_type_skipped() {
        let attr = proto::AttributeProto {
            name: "sparse".into(),
            r#type: 11,
            ..Default::default()
        };
        assert!(attribute_from_proto(attr).unwrap().is_none());
    }

    #[test]
    fn test_load_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, sample_proto().encode_to_vec()).unwrap();

        let model = ModelLoader::load(&path).unwrap();
        assert_eq!(model.graph.name, "g");
        assert_eq!(model.base_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pb");
        std::fs::write(&path, b"").unwrap();
        let err = ModelLoader::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedFormat { .. }));
    }
}
