//! Geography and geometry values and their `SRID=n;Shape(...)` text form.

use super::codec::{is_decimal_syntax, render_float};
use super::{Facets, PrimitiveTypeKind};
use crate::Error;

/// Nesting bound for `Collection(...)` literals.
const MAX_COLLECTION_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Geography,
    Geometry,
}

impl Dimension {
    /// SRID assumed when a literal does not carry one.
    #[must_use]
    pub fn default_srid(self) -> u32 {
        match self {
            Dimension::Geography => 4326,
            Dimension::Geometry => 0,
        }
    }

    /// Literal prefix, e.g. `geography'...'`.
    #[must_use]
    pub fn literal_prefix(self) -> &'static str {
        match self {
            Dimension::Geography => "geography",
            Dimension::Geometry => "geometry",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeoKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    Collection,
}

impl GeoKind {
    pub const ALL: [GeoKind; 7] = [
        GeoKind::Point,
        GeoKind::LineString,
        GeoKind::Polygon,
        GeoKind::MultiPoint,
        GeoKind::MultiLineString,
        GeoKind::MultiPolygon,
        GeoKind::Collection,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GeoKind::Point => "Point",
            GeoKind::LineString => "LineString",
            GeoKind::Polygon => "Polygon",
            GeoKind::MultiPoint => "MultiPoint",
            GeoKind::MultiLineString => "MultiLineString",
            GeoKind::MultiPolygon => "MultiPolygon",
            GeoKind::Collection => "Collection",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeoShape {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    Collection(Vec<GeoShape>),
}

impl GeoShape {
    #[must_use]
    pub fn kind(&self) -> GeoKind {
        match self {
            GeoShape::Point(_) => GeoKind::Point,
            GeoShape::LineString(_) => GeoKind::LineString,
            GeoShape::Polygon(_) => GeoKind::Polygon,
            GeoShape::MultiPoint(_) => GeoKind::MultiPoint,
            GeoShape::MultiLineString(_) => GeoKind::MultiLineString,
            GeoShape::MultiPolygon(_) => GeoKind::MultiPolygon,
            GeoShape::Collection(_) => GeoKind::Collection,
        }
    }
}

/// A spatial value: shape plus shared dimension and SRID.
#[derive(Clone, Debug, PartialEq)]
pub struct Geo {
    pub dimension: Dimension,
    pub srid: u32,
    pub shape: GeoShape,
}

impl Geo {
    #[must_use]
    pub fn geography(shape: GeoShape) -> Self {
        Self {
            dimension: Dimension::Geography,
            srid: Dimension::Geography.default_srid(),
            shape,
        }
    }

    #[must_use]
    pub fn geometry(shape: GeoShape) -> Self {
        Self {
            dimension: Dimension::Geometry,
            srid: Dimension::Geometry.default_srid(),
            shape,
        }
    }

    #[must_use]
    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = srid;
        self
    }

    #[must_use]
    pub fn kind(&self) -> PrimitiveTypeKind {
        let kind = self.shape.kind();
        match self.dimension {
            Dimension::Geography => PrimitiveTypeKind::Geography(kind),
            Dimension::Geometry => PrimitiveTypeKind::Geometry(kind),
        }
    }
}

pub(super) fn format_geo(kind: PrimitiveTypeKind, geo: &Geo, facets: &Facets) -> Result<String, Error> {
    if geo.kind() != kind {
        return Err(Error::format(
            kind,
            format!("value of type {} does not match", geo.kind()),
        ));
    }
    if let Some(srid) = facets.srid
        && srid != geo.srid
    {
        return Err(Error::format(
            kind,
            format!("SRID {} differs from declared SRID {srid}", geo.srid),
        ));
    }
    let mut out = format!("SRID={};", geo.srid);
    write_shape(&mut out, &geo.shape);
    Ok(out)
}

fn write_position(out: &mut String, p: &Position) {
    out.push_str(&render_float(p.x, false));
    out.push(' ');
    out.push_str(&render_float(p.y, false));
    if let Some(z) = p.z {
        out.push(' ');
        out.push_str(&render_float(z, false));
    }
}

fn write_list<T>(out: &mut String, items: &[T], mut write: impl FnMut(&mut String, &T)) {
    out.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write(out, item);
    }
    out.push(')');
}

fn write_positions(out: &mut String, positions: &[Position]) {
    write_list(out, positions, write_position);
}

fn write_polygon(out: &mut String, rings: &[Vec<Position>]) {
    write_list(out, rings, |out, ring| write_positions(out, ring));
}

fn write_shape(out: &mut String, shape: &GeoShape) {
    out.push_str(shape.kind().name());
    match shape {
        GeoShape::Point(p) => write_list(out, std::slice::from_ref(p), write_position),
        GeoShape::LineString(points) => write_positions(out, points),
        GeoShape::Polygon(rings) => write_polygon(out, rings),
        GeoShape::MultiPoint(points) => write_list(out, points, |out, p| {
            write_list(out, std::slice::from_ref(p), write_position);
        }),
        GeoShape::MultiLineString(lines) => {
            write_list(out, lines, |out, line| write_positions(out, line));
        }
        GeoShape::MultiPolygon(polygons) => {
            write_list(out, polygons, |out, polygon| write_polygon(out, polygon));
        }
        GeoShape::Collection(shapes) => write_list(out, shapes, write_shape),
    }
}

pub(super) fn parse_geo(kind: PrimitiveTypeKind, text: &str, facets: &Facets) -> Result<Geo, Error> {
    let Some((dimension, geo_kind)) = kind.spatial() else {
        return Err(Error::parse(kind, text, "not a spatial type"));
    };
    let mut reader = Reader { rest: text };
    let srid = reader.srid().unwrap_or_else(|| dimension.default_srid());
    let shape = reader
        .shape(Some(geo_kind), 0)
        .filter(|_| reader.rest.is_empty())
        .ok_or_else(|| Error::parse(kind, text, format!("malformed {} literal", geo_kind.name())))?;
    if let Some(declared) = facets.srid
        && declared != srid
    {
        return Err(Error::parse(
            kind,
            text,
            format!("SRID {srid} differs from declared SRID {declared}"),
        ));
    }
    Ok(Geo {
        dimension,
        srid,
        shape,
    })
}

struct Reader<'a> {
    rest: &'a str,
}

impl Reader<'_> {
    fn keyword(&mut self, word: &str) -> bool {
        match self.rest.get(..word.len()) {
            Some(head) if head.eq_ignore_ascii_case(word) => {
                self.rest = &self.rest[word.len()..];
                true
            }
            _ => false,
        }
    }

    fn symbol(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn srid(&mut self) -> Option<u32> {
        if !self.keyword("SRID=") {
            return None;
        }
        let end = self.rest.find(';')?;
        let srid = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end + 1..];
        Some(srid)
    }

    fn number(&mut self) -> Option<f64> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
            .unwrap_or(self.rest.len());
        let (number, rest) = self.rest.split_at(end);
        if !is_decimal_syntax(number) {
            return None;
        }
        self.rest = rest;
        number.parse().ok()
    }

    fn position(&mut self) -> Option<Position> {
        let x = self.number()?;
        if !self.symbol(' ') {
            return None;
        }
        let y = self.number()?;
        let z = if self.symbol(' ') { Some(self.number()?) } else { None };
        Some(Position { x, y, z })
    }

    /// `(item,item,...)`
    fn list<T>(
        &mut self,
        allow_empty: bool,
        mut item: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<Vec<T>> {
        if !self.symbol('(') {
            return None;
        }
        let mut items = Vec::new();
        if allow_empty && self.symbol(')') {
            return Some(items);
        }
        loop {
            items.push(item(self)?);
            if self.symbol(')') {
                return Some(items);
            }
            if !self.symbol(',') {
                return None;
            }
        }
    }

    fn positions(&mut self) -> Option<Vec<Position>> {
        self.list(false, Self::position)
    }

    fn point_data(&mut self) -> Option<Position> {
        self.list(false, Self::position)
            .filter(|points| points.len() == 1)
            .and_then(|points| points.first().copied())
    }

    fn polygon_data(&mut self) -> Option<Vec<Vec<Position>>> {
        self.list(false, Self::positions)
    }

    /// Parse one shape; with `expected == None` any kind is accepted.
    fn shape(&mut self, expected: Option<GeoKind>, depth: usize) -> Option<GeoShape> {
        if depth > MAX_COLLECTION_DEPTH {
            return None;
        }
        let kind = match expected {
            Some(kind) => self.keyword(kind.name()).then_some(kind)?,
            None => GeoKind::ALL
                .into_iter()
                .find(|k| self.keyword(k.name()))?,
        };
        match kind {
            GeoKind::Point => self.point_data().map(GeoShape::Point),
            GeoKind::LineString => self.positions().map(GeoShape::LineString),
            GeoKind::Polygon => self.polygon_data().map(GeoShape::Polygon),
            GeoKind::MultiPoint => self.list(true, Self::point_data).map(GeoShape::MultiPoint),
            GeoKind::MultiLineString => self
                .list(true, Self::positions)
                .map(GeoShape::MultiLineString),
            GeoKind::MultiPolygon => self
                .list(true, Self::polygon_data)
                .map(GeoShape::MultiPolygon),
            GeoKind::Collection => self
                .list(false, |r| r.shape(None, depth + 1))
                .map(GeoShape::Collection),
        }
    }
}
