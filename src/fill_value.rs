//! Fill values and the all-fill check behind chunk elision.

use crate::data_type::DataType;

/// The fill value of a dataset, stored as the native-endian bytes of one element.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl std::fmt::Display for FillValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FillValue {
                fn from(value: $ty) -> Self {
                    FillValue(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_from_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl FillValue {
    /// Create a new fill value composed of `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The all-zero fill value of `data_type`.
    #[must_use]
    pub fn zero(data_type: DataType) -> Self {
        Self(vec![0; data_type.size()])
    }

    /// Parse a JSON fill value for `data_type`.
    ///
    /// `null` means zero. Floats also accept `"NaN"`, `"Infinity"` and `"-Infinity"`.
    pub fn from_json(value: &serde_json::Value, data_type: DataType) -> crate::Result<Self> {
        use serde_json::Value;

        let invalid =
            || crate::Error::InvalidMetadata(format!("invalid fill value {value} for {data_type}"));

        if value.is_null() {
            return Ok(Self::zero(data_type));
        }

        macro_rules! int {
            ($ty:ty) => {{
                let v = if let Some(i) = value.as_i64() {
                    <$ty>::try_from(i).map_err(|_| invalid())?
                } else if let Some(u) = value.as_u64() {
                    <$ty>::try_from(u).map_err(|_| invalid())?
                } else {
                    return Err(invalid());
                };
                Self::from(v)
            }};
        }

        let float = || -> crate::Result<f64> {
            match value {
                Value::Number(n) => n.as_f64().ok_or_else(invalid),
                Value::String(s) => match s.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "Infinity" => Ok(f64::INFINITY),
                    "-Infinity" => Ok(f64::NEG_INFINITY),
                    _ => Err(invalid()),
                },
                _ => Err(invalid()),
            }
        };

        let out = match data_type {
            DataType::Int8 => int!(i8),
            DataType::Int16 => int!(i16),
            DataType::Int32 => int!(i32),
            DataType::Int64 => int!(i64),
            DataType::UInt8 => int!(u8),
            DataType::UInt16 => int!(u16),
            DataType::UInt32 => int!(u32),
            DataType::UInt64 => int!(u64),
            #[allow(clippy::cast_possible_truncation)]
            DataType::Float32 => Self::from(float()? as f32),
            DataType::Float64 => Self::from(float()?),
        };
        Ok(out)
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if every element of `bytes` is equal to the fill value.
    ///
    /// The comparison is bitwise.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        if self.0.is_empty() || bytes.len() % self.0.len() != 0 {
            return false;
        }
        match self.0.len() {
            1 => {
                let fill = self.0[0];
                bytes.iter().all(|b| *b == fill)
            }
            n => bytes.chunks_exact(n).all(|element| element == self.0.as_slice()),
        }
    }
}
