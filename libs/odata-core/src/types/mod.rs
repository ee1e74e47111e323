//! EDM primitive type system: type kinds, facets, runtime values and their
//! canonical text codecs.

pub mod codec;
pub mod geo;
pub mod literal;
mod temporal;

pub use codec::{format, parse};
pub use geo::{Dimension, Geo, GeoKind, GeoShape, Position};
pub use literal::{from_uri_literal, to_uri_literal};

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::fmt;
use uuid::Uuid;

/// Namespace of the built-in primitive types.
pub const EDM_NAMESPACE: &str = "Edm";

/// Closed set of EDM primitive types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveTypeKind {
    Binary,
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Date,
    DateTimeOffset,
    Duration,
    Guid,
    TimeOfDay,
    Stream,
    Geography(GeoKind),
    Geometry(GeoKind),
}

impl PrimitiveTypeKind {
    /// Every non-spatial kind, in declaration order.
    pub const SCALARS: [PrimitiveTypeKind; 17] = [
        PrimitiveTypeKind::Binary,
        PrimitiveTypeKind::Boolean,
        PrimitiveTypeKind::Byte,
        PrimitiveTypeKind::SByte,
        PrimitiveTypeKind::Int16,
        PrimitiveTypeKind::Int32,
        PrimitiveTypeKind::Int64,
        PrimitiveTypeKind::Single,
        PrimitiveTypeKind::Double,
        PrimitiveTypeKind::Decimal,
        PrimitiveTypeKind::String,
        PrimitiveTypeKind::Date,
        PrimitiveTypeKind::DateTimeOffset,
        PrimitiveTypeKind::Duration,
        PrimitiveTypeKind::Guid,
        PrimitiveTypeKind::TimeOfDay,
        PrimitiveTypeKind::Stream,
    ];

    /// Unqualified type name, e.g. `Int16` or `GeographyPoint`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveTypeKind::Binary => "Binary",
            PrimitiveTypeKind::Boolean => "Boolean",
            PrimitiveTypeKind::Byte => "Byte",
            PrimitiveTypeKind::SByte => "SByte",
            PrimitiveTypeKind::Int16 => "Int16",
            PrimitiveTypeKind::Int32 => "Int32",
            PrimitiveTypeKind::Int64 => "Int64",
            PrimitiveTypeKind::Single => "Single",
            PrimitiveTypeKind::Double => "Double",
            PrimitiveTypeKind::Decimal => "Decimal",
            PrimitiveTypeKind::String => "String",
            PrimitiveTypeKind::Date => "Date",
            PrimitiveTypeKind::DateTimeOffset => "DateTimeOffset",
            PrimitiveTypeKind::Duration => "Duration",
            PrimitiveTypeKind::Guid => "Guid",
            PrimitiveTypeKind::TimeOfDay => "TimeOfDay",
            PrimitiveTypeKind::Stream => "Stream",
            PrimitiveTypeKind::Geography(kind) => match kind {
                GeoKind::Point => "GeographyPoint",
                GeoKind::LineString => "GeographyLineString",
                GeoKind::Polygon => "GeographyPolygon",
                GeoKind::MultiPoint => "GeographyMultiPoint",
                GeoKind::MultiLineString => "GeographyMultiLineString",
                GeoKind::MultiPolygon => "GeographyMultiPolygon",
                GeoKind::Collection => "GeographyCollection",
            },
            PrimitiveTypeKind::Geometry(kind) => match kind {
                GeoKind::Point => "GeometryPoint",
                GeoKind::LineString => "GeometryLineString",
                GeoKind::Polygon => "GeometryPolygon",
                GeoKind::MultiPoint => "GeometryMultiPoint",
                GeoKind::MultiLineString => "GeometryMultiLineString",
                GeoKind::MultiPolygon => "GeometryMultiPolygon",
                GeoKind::Collection => "GeometryCollection",
            },
        }
    }

    /// Resolve a qualified primitive type name such as `Edm.Int32`.
    #[must_use]
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        let simple = name.strip_prefix("Edm.")?;
        if let Some(found) = Self::SCALARS.iter().find(|k| k.name() == simple) {
            return Some(*found);
        }
        let (dimension, rest) = if let Some(rest) = simple.strip_prefix("Geography") {
            (Dimension::Geography, rest)
        } else if let Some(rest) = simple.strip_prefix("Geometry") {
            (Dimension::Geometry, rest)
        } else {
            return None;
        };
        let kind = GeoKind::from_name(rest)?;
        Some(match dimension {
            Dimension::Geography => PrimitiveTypeKind::Geography(kind),
            Dimension::Geometry => PrimitiveTypeKind::Geometry(kind),
        })
    }

    /// Dimension and shape kind for the spatial types.
    #[must_use]
    pub fn spatial(self) -> Option<(Dimension, GeoKind)> {
        match self {
            PrimitiveTypeKind::Geography(kind) => Some((Dimension::Geography, kind)),
            PrimitiveTypeKind::Geometry(kind) => Some((Dimension::Geometry, kind)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveTypeKind::Byte
                | PrimitiveTypeKind::SByte
                | PrimitiveTypeKind::Int16
                | PrimitiveTypeKind::Int32
                | PrimitiveTypeKind::Int64
        )
    }
}

impl fmt::Display for PrimitiveTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EDM_NAMESPACE}.{}", self.name())
    }
}

/// Per-property type facets, built once when the model is loaded.
///
/// `None` means the facet was not declared and imposes no constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unicode: Option<bool>,
    pub nullable: Option<bool>,
    pub srid: Option<u32>,
}

impl Facets {
    pub const NONE: Facets = Facets {
        max_length: None,
        precision: None,
        scale: None,
        unicode: None,
        nullable: None,
        srid: None,
    };

    /// Nullability defaults to `true` when undeclared.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }
}

/// Runtime value of a primitive property.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveValue {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    Date(NaiveDate),
    DateTimeOffset(DateTime<Utc>),
    Duration(TimeDelta),
    Guid(Uuid),
    TimeOfDay(NaiveTime),
    Geo(Geo),
}

impl PrimitiveValue {
    /// The kind this value naturally belongs to.
    #[must_use]
    pub fn kind(&self) -> PrimitiveTypeKind {
        match self {
            PrimitiveValue::Binary(_) => PrimitiveTypeKind::Binary,
            PrimitiveValue::Boolean(_) => PrimitiveTypeKind::Boolean,
            PrimitiveValue::Byte(_) => PrimitiveTypeKind::Byte,
            PrimitiveValue::SByte(_) => PrimitiveTypeKind::SByte,
            PrimitiveValue::Int16(_) => PrimitiveTypeKind::Int16,
            PrimitiveValue::Int32(_) => PrimitiveTypeKind::Int32,
            PrimitiveValue::Int64(_) => PrimitiveTypeKind::Int64,
            PrimitiveValue::Single(_) => PrimitiveTypeKind::Single,
            PrimitiveValue::Double(_) => PrimitiveTypeKind::Double,
            PrimitiveValue::Decimal(_) => PrimitiveTypeKind::Decimal,
            PrimitiveValue::String(_) => PrimitiveTypeKind::String,
            PrimitiveValue::Date(_) => PrimitiveTypeKind::Date,
            PrimitiveValue::DateTimeOffset(_) => PrimitiveTypeKind::DateTimeOffset,
            PrimitiveValue::Duration(_) => PrimitiveTypeKind::Duration,
            PrimitiveValue::Guid(_) => PrimitiveTypeKind::Guid,
            PrimitiveValue::TimeOfDay(_) => PrimitiveTypeKind::TimeOfDay,
            PrimitiveValue::Geo(geo) => geo.kind(),
        }
    }

    /// Integer payload of any integral variant.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimitiveValue::Byte(v) => Some(i64::from(*v)),
            PrimitiveValue::SByte(v) => Some(i64::from(*v)),
            PrimitiveValue::Int16(v) => Some(i64::from(*v)),
            PrimitiveValue::Int32(v) => Some(i64::from(*v)),
            PrimitiveValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Human-readable variant name used in error messages.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Canonical URI literal of the value for its own kind.
    ///
    /// # Errors
    /// Returns `Error::Format` when the value has no literal form (e.g. a
    /// duration outside the representable range).
    pub fn to_uri_literal(&self) -> Result<String, crate::Error> {
        literal::to_uri_literal(self.kind(), self, &Facets::NONE)
    }
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PrimitiveValue {
                fn from(value: $ty) -> Self {
                    PrimitiveValue::$variant(value)
                }
            }
        )*
    };
}

primitive_from! {
    Vec<u8> => Binary,
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    BigDecimal => Decimal,
    String => String,
    NaiveDate => Date,
    DateTime<Utc> => DateTimeOffset,
    TimeDelta => Duration,
    Uuid => Guid,
    NaiveTime => TimeOfDay,
    Geo => Geo,
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::String(value.to_owned())
    }
}
