// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Initializer decoding.
//!
//! Turns a [`TensorDescriptor`] into a typed [`Tensor`]. Two failure
//! classes are kept apart because the graph treats them differently:
//!
//! - [`DecodeError::ExternalData`]: the payload lives in a side file that
//!   cannot be resolved. No constant can be substituted, so the import fails.
//! - [`DecodeError::Malformed`]: the descriptor is locally broken (unknown
//!   element type, negative or oversized dimensions, element count
//!   mismatch). The graph
//!   substitutes a zero scalar and carries on.
//!
//! External payloads are memory-mapped and copied out; the mapping does not
//! outlive the call.

use crate::ImportError;
use graph_ir::{IrGraph, Output};
use onnx_model::{ExternalDataRef, TensorData, TensorDescriptor};
use std::path::{Component, Path};
use tensor_core::{DType, Shape, Tensor};

/// Why a tensor descriptor could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid external data: {0}")]
    ExternalData(String),

    #[error("{0}")]
    Malformed(String),
}

/// Decodes a tensor descriptor.
///
/// External locations are resolved relative to `base_dir` and must stay
/// inside it.
pub fn decode_tensor(desc: &TensorDescriptor, base_dir: &Path) -> Result<Tensor, DecodeError> {
    let dtype = desc.dtype().ok_or_else(|| {
        DecodeError::Malformed(format!("unsupported element type code {}", desc.elem_type))
    })?;
    let shape = Shape::from_i64(&desc.dims).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let (count, size) = shape
        .checked_num_elements()
        .zip(shape.checked_size_bytes(dtype))
        .ok_or_else(|| DecodeError::Malformed(format!("shape {shape} is too large")))?;
    let malformed = |e: tensor_core::TensorError| DecodeError::Malformed(e.to_string());

    match &desc.data {
        TensorData::Empty if count == 0 => Ok(Tensor::zeros(shape, dtype)),
        TensorData::Empty => Err(DecodeError::Malformed(format!(
            "no data for {count} element(s) of shape {shape}"
        ))),
        TensorData::Raw(bytes) => Tensor::from_bytes(shape, dtype, bytes.clone()).map_err(malformed),
        TensorData::Floats(values) => {
            expect_dtype(dtype, &[DType::F32], "float_data")?;
            Tensor::from_f32(shape, values).map_err(malformed)
        }
        TensorData::Int32s(values) => {
            let bytes = int32_field_bytes(dtype, values)?;
            Tensor::from_bytes(shape, dtype, bytes).map_err(malformed)
        }
        TensorData::Int64s(values) => {
            expect_dtype(dtype, &[DType::I64], "int64_data")?;
            Tensor::from_i64(shape, values).map_err(malformed)
        }
        TensorData::Doubles(values) => {
            expect_dtype(dtype, &[DType::F64], "double_data")?;
            let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            Tensor::from_bytes(shape, dtype, bytes).map_err(malformed)
        }
        TensorData::UInt64s(values) => {
            expect_dtype(dtype, &[DType::U64, DType::U32], "uint64_data")?;
            let bytes = if dtype == DType::U32 {
                values.iter().flat_map(|&v| (v as u32).to_le_bytes()).collect()
            } else {
                values.iter().flat_map(|v| v.to_le_bytes()).collect()
            };
            Tensor::from_bytes(shape, dtype, bytes).map_err(malformed)
        }
        TensorData::Strings(_) => Err(DecodeError::Malformed(
            "string tensors have no IR representation".into(),
        )),
        TensorData::External(ext) => {
            let bytes = read_external(ext, base_dir, size)?;
            Tensor::from_bytes(shape, dtype, bytes).map_err(malformed)
        }
    }
}

/// Decodes an initializer into a constant node.
///
/// Unresolvable external data is fatal. Any other decode failure is logged
/// and replaced by a zero scalar of the initializer's element type (`f32`
/// when the type itself is unusable).
pub fn materialize(
    desc: &TensorDescriptor,
    base_dir: &Path,
    ir: &mut IrGraph,
) -> Result<Output, ImportError> {
    let tensor = match decode_tensor(desc, base_dir) {
        Ok(tensor) => tensor,
        Err(DecodeError::ExternalData(detail)) => {
            return Err(ImportError::InvalidExternalData {
                name: desc.name.clone(),
                detail,
            })
        }
        Err(DecodeError::Malformed(detail)) => {
            tracing::warn!(
                "could not create a constant for initializer '{}', substituting a zero scalar; \
                 make sure the connected input is optional: {detail}",
                desc.name,
            );
            Tensor::scalar_zero(desc.dtype().unwrap_or(DType::F32))
        }
    };

    let output = ir.add_constant(tensor);
    ir.set_friendly_name(output.node, desc.name.clone());
    ir.add_names(output, [desc.name.clone()]);
    Ok(output)
}

fn expect_dtype(dtype: DType, allowed: &[DType], field: &str) -> Result<(), DecodeError> {
    if allowed.contains(&dtype) {
        Ok(())
    } else {
        Err(DecodeError::Malformed(format!(
            "{field} cannot carry elements of type {dtype}"
        )))
    }
}

/// Narrows `int32_data` values to the element width of `dtype`.
///
/// ONNX stores every type of 32 bits or less (including the raw bit
/// patterns of f16/bf16) in this field.
fn int32_field_bytes(dtype: DType, values: &[i32]) -> Result<Vec<u8>, DecodeError> {
    let bytes = match dtype {
        DType::I32 => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        DType::I16 | DType::U16 | DType::F16 | DType::BF16 => {
            values.iter().flat_map(|&v| (v as u16).to_le_bytes()).collect()
        }
        DType::I8 | DType::U8 => values.iter().map(|&v| v as u8).collect(),
        DType::Bool => values.iter().map(|&v| u8::from(v != 0)).collect(),
        other => {
            return Err(DecodeError::Malformed(format!(
                "int32_data cannot carry elements of type {other}"
            )))
        }
    };
    Ok(bytes)
}

/// Reads an external payload of `expected` bytes.
fn read_external(ext: &ExternalDataRef, base_dir: &Path, expected: usize) -> Result<Vec<u8>, DecodeError> {
    let fail = |msg: String| DecodeError::ExternalData(msg);

    if ext.location.is_empty() {
        return Err(fail("no location given".into()));
    }
    let location = Path::new(&ext.location);
    let escapes = location
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(fail(format!(
            "location '{}' must be a relative path inside the model directory",
            ext.location
        )));
    }

    let path = base_dir.join(location);
    let file = std::fs::File::open(&path)
        .map_err(|e| fail(format!("cannot open '{}': {e}", path.display())))?;
    // SAFETY: read-only mapping, copied out before it is dropped.
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| fail(format!("cannot map '{}': {e}", path.display())))?;

    let file_len = mmap.len() as u64;
    let start = ext.offset;
    let end = match ext.length {
        Some(len) => start.checked_add(len),
        None => Some(file_len),
    };
    let end = match end {
        Some(end) if start <= end && end <= file_len => end,
        _ => {
            return Err(fail(format!(
                "range offset={} length={:?} is outside '{}' ({file_len} bytes)",
                ext.offset,
                ext.length,
                path.display()
            )))
        }
    };

    let payload = &mmap[start as usize..end as usize];
    if payload.len() != expected {
        return Err(fail(format!(
            "'{}' holds {} byte(s) at offset {}, the tensor needs {expected}",
            path.display(),
            payload.len(),
            ext.offset
        )));
    }
    tracing::debug!("read {} byte(s) of external data from {}", payload.len(), path.display());
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_model::dtype::elem_type;

    fn here() -> &'static Path {
        Path::new(".")
    }

    #[test]
    fn test_float_data() {
        let desc = TensorDescriptor::from_f32("w", &[2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let t = decode_tensor(&desc, here()).unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.shape().dims(), &[2, 2]);
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_raw_data() {
        let bytes: Vec<u8> = [7i64, -1].iter().flat_map(|v| v.to_le_bytes()).collect();
        let desc = TensorDescriptor::raw("idx", DType::I64, &[2], bytes);
        let t = decode_tensor(&desc, here()).unwrap();
        assert_eq!(t.to_i64_vec().unwrap(), vec![7, -1]);
    }

    #[test]
    fn test_int32_field_narrowing() {
        let desc = TensorDescriptor::new(
            "mask",
            elem_type::BOOL,
            vec![3],
            TensorData::Int32s(vec![1, 0, 5]),
        );
        let t = decode_tensor(&desc, here()).unwrap();
        assert_eq!(t.to_bool_vec().unwrap(), vec![true, false, true]);

        let desc = TensorDescriptor::new("b", elem_type::INT8, vec![2], TensorData::Int32s(vec![-1, 3]));
        let t = decode_tensor(&desc, here()).unwrap();
        assert_eq!(t.as_bytes(), &[0xff, 3]);
    }

    #[test]
    fn test_empty_tensor() {
        let desc = TensorDescriptor::new("e", elem_type::FLOAT, vec![0, 3], TensorData::Empty);
        let t = decode_tensor(&desc, here()).unwrap();
        assert_eq!(t.num_elements(), 0);
    }

    #[test]
    fn test_malformed_cases() {
        let wrong_count = TensorDescriptor::from_f32("w", &[3], &[1.0]);
        assert!(matches!(decode_tensor(&wrong_count, here()), Err(DecodeError::Malformed(_))));

        let negative = TensorDescriptor::from_f32("w", &[-2], &[1.0, 2.0]);
        assert!(matches!(decode_tensor(&negative, here()), Err(DecodeError::Malformed(_))));

        let unknown_type = TensorDescriptor::new("c", elem_type::COMPLEX64, vec![1], TensorData::Empty);
        assert!(matches!(decode_tensor(&unknown_type, here()), Err(DecodeError::Malformed(_))));

        let wrong_field = TensorDescriptor::new("f", elem_type::INT64, vec![1], TensorData::Floats(vec![1.0]));
        assert!(matches!(decode_tensor(&wrong_field, here()), Err(DecodeError::Malformed(_))));

        let missing = TensorDescriptor::new("m", elem_type::FLOAT, vec![2], TensorData::Empty);
        assert!(matches!(decode_tensor(&missing, here()), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_oversized_dims_are_malformed() {
        let huge = TensorDescriptor::new("h", elem_type::FLOAT, vec![1 << 40, 1 << 40], TensorData::Empty);
        let err = decode_tensor(&huge, here()).unwrap_err();
        assert!(matches!(&err, DecodeError::Malformed(m) if m.contains("too large")), "{err}");

        // Element count fits, byte size does not.
        let wide = TensorDescriptor::new("w", elem_type::INT64, vec![i64::MAX / 2], TensorData::Empty);
        assert!(matches!(decode_tensor(&wide, here()), Err(DecodeError::Malformed(_))));

        let external = TensorDescriptor::external("x", DType::F32, &[1 << 40, 1 << 40], "w.bin", 0, None);
        assert!(matches!(decode_tensor(&external, here()), Err(DecodeError::Malformed(_))));

        let mut ir = IrGraph::new();
        let out = materialize(&huge, here(), &mut ir).unwrap();
        let t = ir.constant(out).unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.shape().rank(), 0);
    }

    #[test]
    fn test_external_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut payload = vec![0u8; 8];
        payload.extend([1.5f32, -2.0].iter().flat_map(|v| v.to_le_bytes()));
        std::fs::write(dir.path().join("weights.bin"), &payload).unwrap();

        let desc = TensorDescriptor::external("w", DType::F32, &[2], "weights.bin", 8, Some(8));
        let t = decode_tensor(&desc, dir.path()).unwrap();
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.5, -2.0]);

        // Length omitted: read to end of file.
        let desc = TensorDescriptor::external("w", DType::F32, &[2], "weights.bin", 8, None);
        assert!(decode_tensor(&desc, dir.path()).is_ok());
    }

    #[test]
    fn test_external_data_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("w.bin"), [0u8; 8]).unwrap();
        let base = dir.path();

        let cases = [
            TensorDescriptor::external("a", DType::F32, &[2], "missing.bin", 0, None),
            TensorDescriptor::external("b", DType::F32, &[2], "w.bin", 4, Some(8)),
            TensorDescriptor::external("c", DType::F32, &[4], "w.bin", 0, None),
            TensorDescriptor::external("d", DType::F32, &[2], "../w.bin", 0, None),
            TensorDescriptor::external("e", DType::F32, &[2], "/etc/passwd", 0, None),
            TensorDescriptor::external("f", DType::F32, &[2], "", 0, None),
        ];
        for desc in &cases {
            let err = decode_tensor(desc, base).unwrap_err();
            assert!(matches!(err, DecodeError::ExternalData(_)), "{}: {err}", desc.name);
        }
    }

    #[test]
    fn test_materialize_degrades_malformed() {
        let mut ir = IrGraph::new();
        let desc = TensorDescriptor::from_i64("bad", &[4], &[1, 2]);
        let out = materialize(&desc, here(), &mut ir).unwrap();

        let t = ir.constant(out).unwrap();
        assert_eq!(t.dtype(), DType::I64);
        assert_eq!(t.shape().rank(), 0);
        assert_eq!(t.to_i64_vec().unwrap(), vec![0]);
        assert_eq!(ir.friendly_name(out.node), "bad");
        assert!(ir.info(out).names.contains("bad"));
    }

    #[test]
    fn test_materialize_external_is_fatal() {
        let mut ir = IrGraph::new();
        let desc = TensorDescriptor::external("w", DType::F32, &[2], "nope.bin", 0, None);
        let err = materialize(&desc, here(), &mut ir).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Decode);
        assert!(ir.is_empty());
    }
}
