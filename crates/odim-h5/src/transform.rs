//! Linear pack/unpack between stored codes and physical values.
//!
//! `physical = raw * gain + offset`, with two reserved raw codes: `undetect`
//! (measured, nothing there) and `nodata` (not measured). Sentinels are
//! compared in the raw storage type so a `u8` code of 255 is recognised
//! whatever float type the caller unpacks into.

use num_traits::{Float, NumCast, ToPrimitive};
use thiserror::Error;

use crate::sample::Sample;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("gain must be finite and non-zero, got {0}")]
    InvalidGain(f64),

    #[error("offset must be finite, got {0}")]
    InvalidOffset(f64),

    #[error("{which} code {code} is not representable in the storage type")]
    UnrepresentableSentinel { which: &'static str, code: f64 },

    #[error("sample matched the {0} predicate but no {0} code is set")]
    MissingSentinel(&'static str),

    #[error("sample {index} packs to {value}, out of range of the storage type")]
    OutOfRange { index: usize, value: f64 },

    #[error("sample {index} cannot be unpacked into the requested type")]
    Unconvertible { index: usize },
}

/// Parameters of the transform, as stored in a layer's `what` group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub gain: f64,
    pub offset: f64,
    pub nodata: Option<f64>,
    pub undetect: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
            nodata: None,
            undetect: None,
        }
    }
}

impl Packing {
    pub fn new(gain: f64, offset: f64) -> Self {
        Self {
            gain,
            offset,
            ..Self::default()
        }
    }

    pub fn with_nodata(mut self, code: f64) -> Self {
        self.nodata = Some(code);
        self
    }

    pub fn with_undetect(mut self, code: f64) -> Self {
        self.undetect = Some(code);
        self
    }

    fn validate(&self) -> Result<(), TransformError> {
        if !self.gain.is_finite() || self.gain == 0.0 {
            return Err(TransformError::InvalidGain(self.gain));
        }
        if !self.offset.is_finite() {
            return Err(TransformError::InvalidOffset(self.offset));
        }
        Ok(())
    }

    /// Physical value of one raw code, ignoring sentinels.
    pub fn to_physical(&self, raw: f64) -> f64 {
        raw * self.gain + self.offset
    }

    /// Raw value of one physical value, before rounding.
    pub fn to_raw(&self, physical: f64) -> f64 {
        (physical - self.offset) / self.gain
    }
}

/// A sentinel code in the raw type. Integral types must hold it exactly;
/// float types take the nearest value, as the producer did when writing.
fn raw_code<R: Sample>(code: f64) -> Option<R> {
    let raw = <R as NumCast>::from(code)?;
    if R::TYPE.is_integral() {
        (raw.to_f64()? == code).then_some(raw)
    } else {
        Some(raw)
    }
}

/// Same, but failing when the code cannot be stored.
fn required_code<R: Sample>(
    which: &'static str,
    code: Option<f64>,
) -> Result<Option<R>, TransformError> {
    match code {
        Some(code) => raw_code(code)
            .map(Some)
            .ok_or(TransformError::UnrepresentableSentinel { which, code }),
        None => Ok(None),
    }
}

/// Convert raw codes to physical values.
///
/// Samples equal to the undetect code become `undetect_value`, samples equal
/// to the nodata code become `nodata_value`. A sentinel code the raw type
/// cannot hold never matches.
pub fn unpack<R, P>(
    raw: &[R],
    packing: &Packing,
    nodata_value: P,
    undetect_value: P,
) -> Result<Vec<P>, TransformError>
where
    R: Sample,
    P: Sample + Float,
{
    let undetect = packing.undetect.and_then(raw_code::<R>);
    let nodata = packing.nodata.and_then(raw_code::<R>);

    raw.iter()
        .enumerate()
        .map(|(index, &sample)| {
            if undetect == Some(sample) {
                return Ok(undetect_value);
            }
            if nodata == Some(sample) {
                return Ok(nodata_value);
            }
            sample
                .to_f64()
                .map(|value| packing.to_physical(value))
                .and_then(<P as NumCast>::from)
                .ok_or(TransformError::Unconvertible { index })
        })
        .collect()
}

/// Convert physical values to raw codes.
///
/// The predicates are evaluated on the physical value, undetect first; a
/// match stores the corresponding code, which must then be configured.
/// Other values are stored as `(physical - offset) / gain`, rounded to
/// nearest for integral storage types.
pub fn pack<R, P>(
    physical: &[P],
    packing: &Packing,
    is_nodata: impl Fn(P) -> bool,
    is_undetect: impl Fn(P) -> bool,
) -> Result<Vec<R>, TransformError>
where
    R: Sample,
    P: Sample,
{
    packing.validate()?;
    let undetect = required_code::<R>("undetect", packing.undetect)?;
    let nodata = required_code::<R>("nodata", packing.nodata)?;

    physical
        .iter()
        .enumerate()
        .map(|(index, &sample)| {
            if is_undetect(sample) {
                return undetect.ok_or(TransformError::MissingSentinel("undetect"));
            }
            if is_nodata(sample) {
                return nodata.ok_or(TransformError::MissingSentinel("nodata"));
            }
            let value = sample
                .to_f64()
                .map(|v| packing.to_raw(v))
                .unwrap_or(f64::NAN);
            R::from_physical(value).ok_or(TransformError::OutOfRange { index, value })
        })
        .collect()
}
