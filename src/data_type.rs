use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::endianness::{Endianness, NATIVE_ENDIAN};

/// A fixed-width scalar element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    /// The size of one element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// The N5 `dataType` name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    pub fn from_name(name: &str) -> crate::Result<Self> {
        let out = match name {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            s => {
                return Err(crate::Error::InvalidMetadata(format!(
                    "unsupported data type: {s}"
                )));
            }
        };
        Ok(out)
    }

    fn zarr_kind(&self) -> char {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => 'i',
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => 'u',
            Self::Float32 | Self::Float64 => 'f',
        }
    }

    /// The zarr `dtype` string, e.g. `<f4`.
    #[must_use]
    pub fn zarr_dtype(&self, endianness: Endianness) -> String {
        let order = if self.size() == 1 {
            '|'
        } else {
            match endianness {
                Endianness::Little => '<',
                Endianness::Big => '>',
            }
        };
        format!("{order}{}{}", self.zarr_kind(), self.size())
    }

    /// Parse a zarr `dtype` string into a data type and the byte order of its elements.
    ///
    /// Single-byte types report the native byte order.
    pub fn from_zarr_dtype(dtype: &str) -> crate::Result<(Self, Endianness)> {
        let invalid = || crate::Error::InvalidMetadata(format!("unsupported zarr dtype: {dtype}"));
        let mut chars = dtype.chars();
        let endianness = match chars.next().ok_or_else(invalid)? {
            '<' => Endianness::Little,
            '>' => Endianness::Big,
            '|' => NATIVE_ENDIAN,
            _ => return Err(invalid()),
        };
        let data_type = match chars.as_str() {
            "i1" => Self::Int8,
            "i2" => Self::Int16,
            "i4" => Self::Int32,
            "i8" => Self::Int64,
            "u1" => Self::UInt8,
            "u2" => Self::UInt16,
            "u4" => Self::UInt32,
            "u8" => Self::UInt64,
            "f4" => Self::Float32,
            "f8" => Self::Float64,
            _ => return Err(invalid()),
        };
        Ok((data_type, endianness))
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust scalar type with a corresponding [`DataType`].
pub trait Element: bytemuck::Pod {
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($ty:ty, $dt:ident) => {
        impl Element for $ty {
            const DATA_TYPE: DataType = DataType::$dt;
        }
    };
}

impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, UInt8);
impl_element!(u16, UInt16);
impl_element!(u32, UInt32);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zarr_dtypes() {
        assert_eq!(DataType::Float32.zarr_dtype(Endianness::Little), "<f4");
        assert_eq!(DataType::UInt16.zarr_dtype(Endianness::Big), ">u2");
        assert_eq!(DataType::Int8.zarr_dtype(Endianness::Big), "|i1");

        assert_eq!(
            DataType::from_zarr_dtype(">i8").unwrap(),
            (DataType::Int64, Endianness::Big)
        );
        assert_eq!(DataType::from_zarr_dtype("|u1").unwrap().0, DataType::UInt8);
        assert!(DataType::from_zarr_dtype("<c8").is_err());
        assert!(DataType::from_zarr_dtype("").is_err());
    }

    #[test]
    fn names_round_trip_through_serde() {
        let dt: DataType = serde_json::from_str("\"uint64\"").unwrap();
        assert_eq!(dt, DataType::UInt64);
        assert_eq!(serde_json::to_string(&DataType::Float64).unwrap(), "\"float64\"");
        assert_eq!(DataType::from_name("int16").unwrap(), DataType::Int16);
        assert!(DataType::from_name("bool").is_err());
    }

    #[test]
    fn element_sizes_match() {
        assert_eq!(<f64 as Element>::DATA_TYPE.size(), size_of::<f64>());
        assert_eq!(<u16 as Element>::DATA_TYPE.size(), size_of::<u16>());
        assert_eq!(<i8 as Element>::DATA_TYPE, DataType::Int8);
    }
}
