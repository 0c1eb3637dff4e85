//! Element types of sample arrays.
//!
//! ODIM_H5 data layers are stored in whatever numeric type the producer chose
//! (`u8` and `u16` are common, some products use floats). The backing store
//! hands arrays over as a [`SampleBuffer`] tagged with that storage type, and
//! [`Sample`] converts between it and the caller's element type.

use std::fmt;

use num_traits::{NumCast, ToPrimitive};

/// Storage type of a sample array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl SampleType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A whole sample array in its storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Run `$body` with `$values` bound to the typed vector inside a buffer.
///
/// Every arm expands `$body` separately, so the body can call generic code
/// that is monomorphised per storage type.
macro_rules! dispatch_buffer {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            $crate::sample::SampleBuffer::I8($values) => $body,
            $crate::sample::SampleBuffer::U8($values) => $body,
            $crate::sample::SampleBuffer::I16($values) => $body,
            $crate::sample::SampleBuffer::U16($values) => $body,
            $crate::sample::SampleBuffer::I32($values) => $body,
            $crate::sample::SampleBuffer::U32($values) => $body,
            $crate::sample::SampleBuffer::I64($values) => $body,
            $crate::sample::SampleBuffer::U64($values) => $body,
            $crate::sample::SampleBuffer::F32($values) => $body,
            $crate::sample::SampleBuffer::F64($values) => $body,
        }
    };
}
pub(crate) use dispatch_buffer;

impl SampleBuffer {
    /// A buffer of `len` zeroes in the given storage type.
    pub fn zeroed(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::I8 => Self::I8(vec![0; len]),
            SampleType::U8 => Self::U8(vec![0; len]),
            SampleType::I16 => Self::I16(vec![0; len]),
            SampleType::U16 => Self::U16(vec![0; len]),
            SampleType::I32 => Self::I32(vec![0; len]),
            SampleType::U32 => Self::U32(vec![0; len]),
            SampleType::I64 => Self::I64(vec![0; len]),
            SampleType::U64 => Self::U64(vec![0; len]),
            SampleType::F32 => Self::F32(vec![0.0; len]),
            SampleType::F64 => Self::F64(vec![0.0; len]),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::I8(_) => SampleType::I8,
            Self::U8(_) => SampleType::U8,
            Self::I16(_) => SampleType::I16,
            Self::U16(_) => SampleType::U16,
            Self::I32(_) => SampleType::I32,
            Self::U32(_) => SampleType::U32,
            Self::I64(_) => SampleType::I64,
            Self::U64(_) => SampleType::U64,
            Self::F32(_) => SampleType::F32,
            Self::F64(_) => SampleType::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_buffer!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element into `T`.
    ///
    /// Fails with the index of the first element that `T` cannot represent.
    pub fn convert<T: Sample>(self) -> Result<Vec<T>, usize> {
        dispatch_buffer!(self, values => cast_all(values))
    }

    /// Build a buffer of `sample_type` from caller values, converting each.
    ///
    /// Fails with the index of the first value the storage type cannot
    /// represent.
    pub fn from_samples<T: Sample>(sample_type: SampleType, values: &[T]) -> Result<Self, usize> {
        if sample_type == T::TYPE {
            return Ok(T::into_buffer(values.to_vec()));
        }
        let buffer = match sample_type {
            SampleType::I8 => Self::I8(cast_slice(values)?),
            SampleType::U8 => Self::U8(cast_slice(values)?),
            SampleType::I16 => Self::I16(cast_slice(values)?),
            SampleType::U16 => Self::U16(cast_slice(values)?),
            SampleType::I32 => Self::I32(cast_slice(values)?),
            SampleType::U32 => Self::U32(cast_slice(values)?),
            SampleType::I64 => Self::I64(cast_slice(values)?),
            SampleType::U64 => Self::U64(cast_slice(values)?),
            SampleType::F32 => Self::F32(cast_slice(values)?),
            SampleType::F64 => Self::F64(cast_slice(values)?),
        };
        Ok(buffer)
    }
}

fn cast_all<S: Sample, T: Sample>(values: Vec<S>) -> Result<Vec<T>, usize> {
    cast_slice(&values)
}

fn cast_slice<S: Sample, T: Sample>(values: &[S]) -> Result<Vec<T>, usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| <T as NumCast>::from(v).ok_or(i))
        .collect()
}

/// A Rust element type that can live in a sample array.
pub trait Sample: Copy + PartialEq + NumCast + ToPrimitive + fmt::Debug + 'static {
    const TYPE: SampleType;

    fn into_buffer(values: Vec<Self>) -> SampleBuffer;

    /// Unwrap a buffer of exactly this type, handing it back otherwise.
    fn from_buffer(buffer: SampleBuffer) -> std::result::Result<Vec<Self>, SampleBuffer>;

    /// Convert a physical-domain value into this type, rounding to nearest
    /// for integral types. `None` if the value is out of range.
    fn from_physical(value: f64) -> Option<Self> {
        if Self::TYPE.is_integral() {
            <Self as NumCast>::from(value.round())
        } else {
            <Self as NumCast>::from(value)
        }
    }
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const TYPE: SampleType = SampleType::$variant;

            fn into_buffer(values: Vec<Self>) -> SampleBuffer {
                SampleBuffer::$variant(values)
            }

            fn from_buffer(buffer: SampleBuffer) -> std::result::Result<Vec<Self>, SampleBuffer> {
                match buffer {
                    SampleBuffer::$variant(values) => Ok(values),
                    other => Err(other),
                }
            }
        }
    };
}

impl_sample!(i8, I8);
impl_sample!(u8, U8);
impl_sample!(i16, I16);
impl_sample!(u16, U16);
impl_sample!(i32, I32);
impl_sample!(u32, U32);
impl_sample!(i64, I64);
impl_sample!(u64, U64);
impl_sample!(f32, F32);
impl_sample!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_widens() {
        let buffer = SampleBuffer::U8(vec![0, 7, 255]);
        let values: Vec<f64> = buffer.convert().unwrap();
        assert_eq!(values, vec![0.0, 7.0, 255.0]);
    }

    #[test]
    fn test_convert_reports_first_unrepresentable_index() {
        let buffer = SampleBuffer::I16(vec![1, 300, -5]);
        let err = buffer.convert::<u8>().unwrap_err();
        assert_eq!(err, 1);
    }

    #[test]
    fn test_from_samples_same_type_is_identity() {
        let buffer = SampleBuffer::from_samples(SampleType::U16, &[1u16, 2, 3]).unwrap();
        assert_eq!(buffer, SampleBuffer::U16(vec![1, 2, 3]));
    }

    #[test]
    fn test_from_samples_narrows_with_check() {
        let buffer = SampleBuffer::from_samples(SampleType::U8, &[1.0f64, 254.0]).unwrap();
        assert_eq!(buffer, SampleBuffer::U8(vec![1, 254]));
        assert_eq!(SampleBuffer::from_samples(SampleType::U8, &[-1i32]), Err(0));
    }

    #[test]
    fn test_from_physical_rounds_integral_types() {
        assert_eq!(u8::from_physical(6.6), Some(7));
        assert_eq!(u8::from_physical(256.0), None);
        assert_eq!(i16::from_physical(-2.5), Some(-3));
        assert_eq!(f32::from_physical(6.6), Some(6.6f32));
    }

    #[test]
    fn test_sample_type_properties() {
        assert_eq!(SampleType::U16.size(), 2);
        assert!(SampleType::U8.is_integral());
        assert!(!SampleType::F32.is_integral());
        assert!(!SampleType::U32.is_signed());
        assert_eq!(SampleBuffer::zeroed(SampleType::F32, 3).len(), 3);
    }
}
