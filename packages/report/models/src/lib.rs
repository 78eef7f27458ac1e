#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Observation report, coordinate and toast types.
//!
//! These types are shared by the marker synchronization component, the
//! report submission flow, and the data sources that feed them. Report
//! records are deserialized leniently: a record with garbage coordinates
//! still parses, and is filtered out later when it is projected onto the
//! map. One malformed record must never fail a whole batch.

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display};

/// Maximum absolute latitude in WGS84 degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Maximum absolute longitude in WGS84 degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a position from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and inside the WGS84
    /// range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= MAX_LATITUDE
            && self.longitude.abs() <= MAX_LONGITUDE
    }
}

/// A coordinate component as it arrived on the wire.
///
/// Backends send coordinates either as JSON numbers or as numeric
/// strings. Anything else (booleans, objects, `null`) is kept as
/// [`CoordinateValue::Invalid`] rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CoordinateValue {
    /// A JSON number.
    Number(f64),
    /// A string that may contain a number.
    Text(String),
    /// A missing or non-numeric value.
    #[default]
    Invalid,
}

impl CoordinateValue {
    /// Coerces the value to a finite `f64`.
    ///
    /// Strings contribute their leading decimal number, so `"26.1224 N"`
    /// and `"26.1224°"` both read as `26.1224`. A string without a leading
    /// number is rejected.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => leading_number(s)?,
            Self::Invalid => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// Parses the longest decimal literal at the start of `s`, after leading
/// whitespace: optional sign, digits with an optional fraction (at least
/// one digit overall), then an optional exponent that is only consumed
/// when it has digits.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

impl From<f64> for CoordinateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CoordinateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl Serialize for CoordinateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Invalid => serializer.serialize_unit(),
        }
    }
}

struct CoordinateVisitor;

impl<'de> Visitor<'de> for CoordinateVisitor {
    type Value = CoordinateValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Number(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Number(v as f64))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Number(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Text(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Invalid)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Invalid)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(CoordinateValue::Invalid)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(CoordinateValue::Invalid)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(CoordinateValue::Invalid)
    }
}

impl<'de> Deserialize<'de> for CoordinateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CoordinateVisitor)
    }
}

/// One observed sighting as delivered by a report data source.
///
/// Immutable from the map's point of view. The coordinate fields are kept
/// in their raw wire form; use [`ReportRecord::coordinates`] to get a
/// validated position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Display label for the observed species.
    #[serde(default)]
    pub species_name: Option<String>,
    /// Raw latitude.
    #[serde(default)]
    pub latitude: CoordinateValue,
    /// Raw longitude.
    #[serde(default)]
    pub longitude: CoordinateValue,
    /// Storage key of the report photo, resolvable to a URL.
    #[serde(default, alias = "image_ref")]
    pub image_file_name: Option<String>,
    /// Whether the species is invasive (`None` = unknown).
    #[serde(default, deserialize_with = "lenient_flag")]
    pub invasive: Option<InvasiveFlag>,
}

impl ReportRecord {
    /// Creates a record from numeric coordinates with no optional fields.
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: CoordinateValue::Number(latitude),
            longitude: CoordinateValue::Number(longitude),
            ..Self::default()
        }
    }

    /// Sets the species label.
    #[must_use]
    pub fn with_species(mut self, species_name: impl Into<String>) -> Self {
        self.species_name = Some(species_name.into());
        self
    }

    /// Sets the image storage key.
    #[must_use]
    pub fn with_image(mut self, image_file_name: impl Into<String>) -> Self {
        self.image_file_name = Some(image_file_name.into());
        self
    }

    /// Sets the invasive flag.
    #[must_use]
    pub fn with_invasive(mut self, invasive: bool) -> Self {
        self.invasive = Some(InvasiveFlag::Known(invasive));
        self
    }

    /// The invasive flag as a boolean, when the source sent one.
    #[must_use]
    pub fn is_invasive(&self) -> Option<bool> {
        match self.invasive {
            Some(InvasiveFlag::Known(b)) => Some(b),
            Some(InvasiveFlag::Label(_)) | None => None,
        }
    }

    /// Both coordinate components coerced to finite numbers, without a
    /// range check.
    #[must_use]
    pub fn finite_coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(
            self.latitude.as_f64()?,
            self.longitude.as_f64()?,
        ))
    }

    /// The record's position if it can be placed on a map.
    ///
    /// Returns `None` when either component is missing, non-numeric,
    /// non-finite, or outside the WGS84 range.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.finite_coordinates().filter(Coordinates::is_valid)
    }

    /// The image storage key, if present and non-blank.
    #[must_use]
    pub fn image_ref(&self) -> Option<&str> {
        self.image_file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// The invasive flag as a source sent it.
///
/// Sources are not consistent: most send a boolean, some a free-form label
/// such as `"yes"`. Labels are kept so the detail view can show them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InvasiveFlag {
    /// A boolean, or a `"true"`/`"false"` string.
    Known(bool),
    /// Any other non-blank scalar, verbatim.
    Label(String),
}

impl fmt::Display for InvasiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(b) => write!(f, "{b}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Accepts booleans, `"true"`/`"false"` strings and other scalar labels.
/// Blank strings, `null`, arrays and objects become `None`.
fn lenient_flag<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<InvasiveFlag>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagRepr {
        Bool(bool),
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Option::<FlagRepr>::deserialize(deserializer)? {
        Some(FlagRepr::Bool(b)) => Some(InvasiveFlag::Known(b)),
        Some(FlagRepr::Number(n)) => Some(InvasiveFlag::Label(n.to_string())),
        Some(FlagRepr::Text(s)) => {
            let label = s.trim();
            match label.to_ascii_lowercase().as_str() {
                "" => None,
                "true" => Some(InvasiveFlag::Known(true)),
                "false" => Some(InvasiveFlag::Known(false)),
                _ => Some(InvasiveFlag::Label(label.to_string())),
            }
        }
        Some(FlagRepr::Other(_)) | None => None,
    })
}

/// Human-readable projection of a selected report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    /// Species label, `"Unknown"` when absent.
    pub species: String,
    /// `"true"`, `"false"`, the source's own label, or `"unknown"`.
    pub invasive: String,
    /// `"lng, lat"` with five decimals, when both coordinates are finite.
    pub position: Option<String>,
}

impl From<&ReportRecord> for ReportDetails {
    fn from(record: &ReportRecord) -> Self {
        Self {
            species: record
                .species_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            invasive: record
                .invasive
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string),
            position: record
                .finite_coordinates()
                .map(|c| format!("{:.5}, {:.5}", c.longitude, c.latitude)),
        }
    }
}

/// Identifier of a toast within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ToastId(pub u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Outcome category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToastKind {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Error,
}

/// A transient status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Queue-unique identifier.
    pub id: ToastId,
    /// Success or error.
    pub kind: ToastKind,
    /// Text shown to the user.
    pub message: String,
}
