//! Type-directed conversion of loosely-typed column values into Rust destinations.
//!
//! Resolution for every destination slot:
//!
//! 1. A NULL source resets the destination to its zero value and never fails.
//! 2. A destination with its own [`ScanTarget`] implementation receives the raw value.
//! 3. Built-in destinations implement [`Coerce`]: the source variant either converts
//!    directly within its category (numeric to numeric, text to text) or goes through
//!    the fixed cross-category rules of that destination; anything else is a
//!    [`ConversionError`].
//!
//! Numbers headed for text are always rendered as digits: `Int(42)` becomes `"42"`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{ConversionError, SqlMiddlewareDbError};
use crate::types::RowValues;

/// A destination slot that can absorb a column value.
///
/// Every [`Coerce`] type is a `ScanTarget` through the coercion table. Implement this
/// trait directly to take over conversion for a type entirely:
/// ```rust
/// use sql_middleware_d1::prelude::*;
///
/// #[derive(Default)]
/// struct Tags(Vec<String>);
///
/// impl ScanTarget for Tags {
///     fn set_zero(&mut self) {
///         self.0.clear();
///     }
///
///     fn accept_raw(&mut self, value: &RowValues) -> Result<(), SqlMiddlewareDbError> {
///         let text = value
///             .as_text()
///             .ok_or_else(|| ConversionError::new::<Tags>(value))?;
///         self.0 = text.split(',').map(str::to_string).collect();
///         Ok(())
///     }
/// }
/// ```
pub trait ScanTarget {
    /// Reset to the zero value. Called instead of [`ScanTarget::accept_raw`] for NULL.
    fn set_zero(&mut self);

    /// Store a non-NULL source value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be represented by the destination.
    fn accept_raw(&mut self, value: &RowValues) -> Result<(), SqlMiddlewareDbError>;
}

/// Static conversion table entry for a built-in destination type.
///
/// `coerce_from` is only consulted for non-NULL sources; NULL maps to `Default::default()`.
pub trait Coerce: Sized + Default {
    /// Convert a non-NULL source value.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` when the (source kind, destination) pair is unsupported
    /// or the value is out of range or malformed.
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError>;
}

impl<T: Coerce> ScanTarget for T {
    fn set_zero(&mut self) {
        *self = T::default();
    }

    fn accept_raw(&mut self, value: &RowValues) -> Result<(), SqlMiddlewareDbError> {
        *self = T::coerce_from(value)?;
        Ok(())
    }
}

/// Coerce `source` into `dest`.
///
/// # Errors
///
/// Returns `SqlMiddlewareDbError::Conversion` for unsupported pairs, or whatever a custom
/// [`ScanTarget`] reports.
pub fn coerce(dest: &mut dyn ScanTarget, source: &RowValues) -> Result<(), SqlMiddlewareDbError> {
    if source.is_null() {
        dest.set_zero();
        return Ok(());
    }
    dest.accept_raw(source)
}

/// Convert a value into an owned `T`, treating NULL as `T::default()`.
///
/// # Errors
///
/// Returns `ConversionError` when `T` cannot be built from the value.
pub fn from_value<T: Coerce>(source: &RowValues) -> Result<T, ConversionError> {
    if source.is_null() {
        return Ok(T::default());
    }
    T::coerce_from(source)
}

/// Fill `dest` positionally from `values`.
///
/// Stops without error when either side runs out: extra destinations are left untouched,
/// extra values are ignored.
///
/// # Errors
///
/// Returns the first conversion failure, annotated with its column index.
pub fn scan_values(
    values: &[RowValues],
    dest: &mut [&mut dyn ScanTarget],
) -> Result<(), SqlMiddlewareDbError> {
    for (idx, (slot, value)) in dest.iter_mut().zip(values).enumerate() {
        coerce(&mut **slot, value)
            .map_err(|err| SqlMiddlewareDbError::in_column(idx.to_string(), err))?;
    }
    Ok(())
}

/// Parse an integer literal the way SQL text columns tend to carry them: optional sign,
/// then `0x`/`0o`/`0b` prefixes or a leading `0` for octal, otherwise decimal.
fn parse_int_literal(text: &str) -> Option<i128> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let lower = unsigned.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits) = match lower.as_deref() {
        Some("0x") => (16, &unsigned[2..]),
        Some("0o") => (8, &unsigned[2..]),
        Some("0b") => (2, &unsigned[2..]),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..]),
        _ => (10, unsigned),
    };

    // from_str_radix would accept a second sign here
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let magnitude = i128::from(u64::from_str_radix(digits, radix).ok()?);
    Some(if negative { -magnitude } else { magnitude })
}

/// Truncate toward zero; non-finite values have no integer form.
fn float_to_wide(value: f64) -> Option<i128> {
    if !value.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let wide = value.trunc() as i128;
    Some(wide)
}

fn parse_bool_token(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

macro_rules! impl_coerce_integer {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Coerce for $t {
                fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
                    let wide = match value {
                        RowValues::Int(i) => Some(i128::from(*i)),
                        RowValues::UInt(u) => Some(i128::from(*u)),
                        RowValues::Float(f) => float_to_wide(*f),
                        RowValues::Bool(b) => Some(i128::from(*b)),
                        RowValues::Text(s) => parse_int_literal(s),
                        RowValues::Timestamp(ts) => Some(i128::from(ts.timestamp())),
                        RowValues::Null | RowValues::Blob(_) => None,
                    };
                    wide.and_then(|w| <$t>::try_from(w).ok())
                        .ok_or_else(|| ConversionError::new::<$t>(value))
                }
            }
        )+
    };
}

impl_coerce_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_coerce_float {
    ($($t:ty),+ $(,)?) => {
        $(
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            impl Coerce for $t {
                fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
                    match value {
                        RowValues::Float(f) => Ok(*f as $t),
                        RowValues::Int(i) => Ok(*i as $t),
                        RowValues::UInt(u) => Ok(*u as $t),
                        RowValues::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                        RowValues::Text(s) => s
                            .parse::<$t>()
                            .map_err(|_| ConversionError::new::<$t>(value)),
                        RowValues::Null | RowValues::Blob(_) | RowValues::Timestamp(_) => {
                            Err(ConversionError::new::<$t>(value))
                        }
                    }
                }
            }
        )+
    };
}

impl_coerce_float!(f32, f64);

impl Coerce for bool {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::Bool(b) => Ok(*b),
            RowValues::Int(i) => Ok(*i != 0),
            RowValues::UInt(u) => Ok(*u != 0),
            RowValues::Float(f) => Ok(*f != 0.0),
            RowValues::Text(s) => {
                parse_bool_token(s).ok_or_else(|| ConversionError::new::<bool>(value))
            }
            RowValues::Null | RowValues::Blob(_) | RowValues::Timestamp(_) => {
                Err(ConversionError::new::<bool>(value))
            }
        }
    }
}

impl Coerce for String {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::Text(s) => Ok(s.clone()),
            RowValues::Int(i) => Ok(i.to_string()),
            RowValues::UInt(u) => Ok(u.to_string()),
            // Display for f64 is the shortest text that parses back to the same value
            RowValues::Float(f) => Ok(f.to_string()),
            RowValues::Bool(b) => Ok(b.to_string()),
            RowValues::Blob(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            RowValues::Timestamp(ts) => Ok(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            RowValues::Null => Err(ConversionError::new::<String>(value)),
        }
    }
}

impl Coerce for Vec<u8> {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::Blob(bytes) => Ok(bytes.clone()),
            RowValues::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(ConversionError::new::<Vec<u8>>(value)),
        }
    }
}

impl Coerce for DateTime<Utc> {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        let converted = match value {
            RowValues::Timestamp(ts) => Some(*ts),
            RowValues::Int(i) => unix_seconds(*i),
            RowValues::UInt(u) => i64::try_from(*u).ok().and_then(unix_seconds),
            RowValues::Float(f) => float_to_wide(*f)
                .and_then(|w| i64::try_from(w).ok())
                .and_then(unix_seconds),
            RowValues::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    parse_int_literal(s)
                        .and_then(|w| i64::try_from(w).ok())
                        .and_then(unix_seconds)
                }),
            RowValues::Null | RowValues::Bool(_) | RowValues::Blob(_) => None,
        };
        converted.ok_or_else(|| ConversionError::new::<DateTime<Utc>>(value))
    }
}

impl Coerce for NaiveDateTime {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        DateTime::<Utc>::coerce_from(value)
            .map(|dt| dt.naive_utc())
            .map_err(|_| ConversionError::new::<NaiveDateTime>(value))
    }
}

impl Coerce for RowValues {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: Coerce> Coerce for Option<T> {
    fn coerce_from(value: &RowValues) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        T::coerce_from(value).map(Some)
    }
}

/// Give single-field newtypes the conversion rules of their inner type.
///
/// ```rust
/// use sql_middleware_d1::coerce_newtype;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct UserId(i64);
///
/// coerce_newtype!(UserId => i64);
/// ```
#[macro_export]
macro_rules! coerce_newtype {
    ($($newtype:ty => $inner:ty),+ $(,)?) => {
        $(
            impl $crate::coerce::Coerce for $newtype {
                fn coerce_from(
                    value: &$crate::types::RowValues,
                ) -> ::std::result::Result<Self, $crate::error::ConversionError> {
                    <$inner as $crate::coerce::Coerce>::coerce_from(value)
                        .map(Self)
                        .map_err(|_| $crate::error::ConversionError::new::<$newtype>(value))
                }
            }
        )+
    };
}
