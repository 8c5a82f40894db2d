// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mapping between ONNX `TensorProto.DataType` codes and [`DType`].

use tensor_core::DType;

/// ONNX element type codes (`TensorProto.DataType`).
pub mod elem_type {
    pub const UNDEFINED: i32 = 0;
    pub const FLOAT: i32 = 1;
    pub const UINT8: i32 = 2;
    pub const INT8: i32 = 3;
    pub const UINT16: i32 = 4;
    pub const INT16: i32 = 5;
    pub const INT32: i32 = 6;
    pub const INT64: i32 = 7;
    pub const STRING: i32 = 8;
    pub const BOOL: i32 = 9;
    pub const FLOAT16: i32 = 10;
    pub const DOUBLE: i32 = 11;
    pub const UINT32: i32 = 12;
    pub const UINT64: i32 = 13;
    pub const COMPLEX64: i32 = 14;
    pub const COMPLEX128: i32 = 15;
    pub const BFLOAT16: i32 = 16;
}

/// Converts an ONNX element type code to a [`DType`].
///
/// Returns `None` for `UNDEFINED`, strings, complex types and unknown codes.
pub fn dtype_from_onnx(code: i32) -> Option<DType> {
    use elem_type::*;
    match code {
        FLOAT => Some(DType::F32),
        UINT8 => Some(DType::U8),
        INT8 => Some(DType::I8),
        UINT16 => Some(DType::U16),
        INT16 => Some(DType::I16),
        INT32 => Some(DType::I32),
        INT64 => Some(DType::I64),
        BOOL => Some(DType::Bool),
        FLOAT16 => Some(DType::F16),
        DOUBLE => Some(DType::F64),
        UINT32 => Some(DType::U32),
        UINT64 => Some(DType::U64),
        BFLOAT16 => Some(DType::BF16),
        _ => None,
    }
}

/// Converts a [`DType`] to its ONNX element type code.
pub fn onnx_code(dtype: DType) -> i32 {
    use elem_type::*;
    match dtype {
        DType::F32 => FLOAT,
        DType::U8 => UINT8,
        DType::I8 => INT8,
        DType::U16 => UINT16,
        DType::I16 => INT16,
        DType::I32 => INT32,
        DType::I64 => INT64,
        DType::Bool => BOOL,
        DType::F16 => FLOAT16,
        DType::F64 => DOUBLE,
        DType::U32 => UINT32,
        DType::U64 => UINT64,
        DType::BF16 => BFLOAT16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(dtype_from_onnx(elem_type::FLOAT), Some(DType::F32));
        assert_eq!(dtype_from_onnx(elem_type::BFLOAT16), Some(DType::BF16));
        assert_eq!(onnx_code(DType::I64), elem_type::INT64);
    }

    #[test]
    fn test_unsupported_codes() {
        assert_eq!(dtype_from_onnx(elem_type::UNDEFINED), None);
        assert_eq!(dtype_from_onnx(elem_type::STRING), None);
        assert_eq!(dtype_from_onnx(elem_type::COMPLEX64), None);
        assert_eq!(dtype_from_onnx(99), None);
    }
}
