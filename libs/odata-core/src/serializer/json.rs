//! OData JSON format, minimal or no metadata.

use super::{ODataFormat, ODataSerializer, SerializerOptions};
use crate::data::{ComplexValue, Delta, Entity, EntityCollection, LinkTarget, Value};
use crate::edm::{
    Edm, EdmBindingTarget, EdmNavigationProperty, EdmProperty, EdmStructuredType, EdmType,
    FullQualifiedName, OperationKind,
};
use crate::problem_mapping::ODataServerError;
use crate::query::{ExpandItem, ExpandOption, Levels, SelectOption};
use crate::types::{Facets, Geo, GeoShape, Position, PrimitiveTypeKind, PrimitiveValue, codec};
use crate::uri::canonical::key_predicate_text;
use crate::uri::encoding::encode_path_segment;
use crate::Error;
use serde_json::{Map, Value as Json, json};
use std::borrow::Cow;
use std::sync::Arc;

pub struct JsonSerializer {
    edm: Arc<Edm>,
    metadata: bool,
}

impl JsonSerializer {
    /// Minimal metadata: context URL, derived types, ids of references.
    #[must_use]
    pub fn new(edm: Arc<Edm>) -> Self {
        Self { edm, metadata: true }
    }

    /// No control information besides count, next link and reference ids.
    #[must_use]
    pub fn without_metadata(edm: Arc<Edm>) -> Self {
        Self {
            edm,
            metadata: false,
        }
    }

    fn writer<'a>(&'a self, options: &'a SerializerOptions) -> Writer<'a> {
        Writer {
            edm: &self.edm,
            options,
            metadata: self.metadata,
        }
    }
}

/// Where an entity lives; decides its `@odata.id`.
#[derive(Clone, Debug)]
enum Location {
    Set(String),
    Singleton(String),
    /// Contained navigation below an entity id, e.g. `People('a')/Trips`.
    Contained { base: String, keyed: bool },
    Unknown,
}

impl Location {
    fn of(target: EdmBindingTarget<'_>) -> Self {
        match target {
            EdmBindingTarget::EntitySet(set) => Location::Set(set.name.clone()),
            EdmBindingTarget::Singleton(singleton) => Location::Singleton(singleton.name.clone()),
            EdmBindingTarget::Unbound(_) => Location::Unknown,
        }
    }
}

struct Writer<'a> {
    edm: &'a Edm,
    options: &'a SerializerOptions,
    metadata: bool,
}

impl<'a> Writer<'a> {
    fn context(&self, map: &mut Map<String, Json>) {
        if self.metadata
            && let Some(context) = self.options.context_url()
        {
            map.insert("@odata.context".to_owned(), Json::String(context.to_string()));
        }
    }

    fn bound_procedures(&self, map: &mut Map<String, Json>) {
        if !self.metadata {
            return;
        }
        for procedure in self.options.bound_procedures() {
            let title = procedure
                .title
                .clone()
                .unwrap_or_else(|| procedure.name.name().to_owned());
            map.insert(
                format!("#{}", procedure.name),
                json!({ "title": title, "target": procedure.target }),
            );
        }
    }

    fn actual_type(
        &self,
        declared: &'a EdmStructuredType,
        type_name: Option<&FullQualifiedName>,
    ) -> Result<&'a EdmStructuredType, Error> {
        let Some(type_name) = type_name else {
            return Ok(declared);
        };
        let actual = self.edm.resolve_type(type_name)?;
        if !self.edm.is_same_or_derived(actual.fqn(), declared.fqn()) {
            return Err(Error::Serialization(format!(
                "`{}` does not derive from `{}`",
                actual.fqn(),
                declared.fqn()
            )));
        }
        Ok(actual)
    }

    fn type_annotation(
        &self,
        map: &mut Map<String, Json>,
        actual: &EdmStructuredType,
        declared: &EdmStructuredType,
    ) {
        if self.metadata && actual.fqn() != declared.fqn() {
            map.insert("@odata.type".to_owned(), Json::String(format!("#{}", actual.fqn())));
        }
    }

    fn entity(
        &self,
        declared: &'a EdmStructuredType,
        entity: &Entity,
        select: Option<&SelectOption>,
        expand: Option<&ExpandOption>,
        location: &Location,
        depth: u32,
    ) -> Result<Map<String, Json>, Error> {
        let actual = self.actual_type(declared, entity.type_name.as_ref())?;
        let mut map = Map::new();
        self.type_annotation(&mut map, actual, declared);
        if self.metadata
            && actual.has_stream()
            && let Some(media) = &entity.media
        {
            map.insert(
                "@odata.mediaContentType".to_owned(),
                Json::String(media.content_type.clone()),
            );
        }

        for property in actual.properties() {
            if !is_selected(select, &property.name) {
                continue;
            }
            if let Some(value) = entity.property(&property.name) {
                map.insert(property.name.clone(), self.value(property, &value.value)?);
            }
        }

        let Some(expand) = expand else {
            return Ok(map);
        };
        if depth >= self.options.max_expand_depth() {
            return Ok(map);
        }
        for navigation in actual.navigation_properties() {
            let Some(item) = expand.get(&navigation.name) else {
                continue;
            };
            let target_type = self.edm.resolve_entity_type(&navigation.target)?;
            let nested = self.navigation_location(location, navigation, actual, entity);
            let link = entity.link(&navigation.name).map(|l| &l.target);
            if item.is_ref {
                map.insert(
                    navigation.name.clone(),
                    self.link_references(navigation, target_type, link, &nested)?,
                );
                continue;
            }
            self.expanded(&mut map, navigation, target_type, link, item, &nested, depth)?;
        }
        Ok(map)
    }

    #[allow(clippy::too_many_arguments)]
    fn expanded(
        &self,
        map: &mut Map<String, Json>,
        navigation: &EdmNavigationProperty,
        target_type: &'a EdmStructuredType,
        link: Option<&LinkTarget>,
        item: &ExpandItem,
        location: &Location,
        depth: u32,
    ) -> Result<(), Error> {
        let nested_expand = nested_expand(item, self.options.max_expand_depth());
        let nested_select = item.options.select.as_ref();
        let value = match (link, navigation.collection) {
            (Some(LinkTarget::Collection(entities)), true) => {
                if item.options.count == Some(true) {
                    map.insert(
                        format!("{}@odata.count", navigation.name),
                        Json::from(entities.len()),
                    );
                }
                let values = entities
                    .iter()
                    .map(|e| {
                        self.entity(
                            target_type,
                            e,
                            nested_select,
                            nested_expand.as_deref(),
                            location,
                            depth + 1,
                        )
                        .map(Json::Object)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Json::Array(values)
            }
            (Some(LinkTarget::Single(Some(e))), false) => Json::Object(self.entity(
                target_type,
                e,
                nested_select,
                nested_expand.as_deref(),
                location,
                depth + 1,
            )?),
            (Some(LinkTarget::Single(None)) | None, false) => Json::Null,
            (None, true) => Json::Array(Vec::new()),
            _ => return Err(link_mismatch(navigation)),
        };
        map.insert(navigation.name.clone(), value);
        Ok(())
    }

    fn link_references(
        &self,
        navigation: &EdmNavigationProperty,
        target_type: &EdmStructuredType,
        link: Option<&LinkTarget>,
        location: &Location,
    ) -> Result<Json, Error> {
        match (link, navigation.collection) {
            (Some(LinkTarget::Collection(entities)), true) => entities
                .iter()
                .map(|e| self.reference(target_type, e, location))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (Some(LinkTarget::Single(Some(e))), false) => self.reference(target_type, e, location),
            (Some(LinkTarget::Single(None)) | None, false) => Ok(Json::Null),
            (None, true) => Ok(Json::Array(Vec::new())),
            _ => Err(link_mismatch(navigation)),
        }
    }

    fn reference(
        &self,
        entity_type: &EdmStructuredType,
        entity: &Entity,
        location: &Location,
    ) -> Result<Json, Error> {
        let id = self.entity_id(location, entity_type, entity)?;
        Ok(json!({ "@odata.id": self.absolute(&id) }))
    }

    /// Entity id relative to the service root.
    fn entity_id(
        &self,
        location: &Location,
        entity_type: &EdmStructuredType,
        entity: &Entity,
    ) -> Result<String, Error> {
        match location {
            Location::Set(name) => Ok(format!(
                "{}{}",
                encode_path_segment(name),
                key_predicate_text(entity_type, entity)?
            )),
            Location::Singleton(name) => Ok(encode_path_segment(name).into_owned()),
            Location::Contained { base, keyed: true } => {
                Ok(format!("{base}{}", key_predicate_text(entity_type, entity)?))
            }
            Location::Contained { base, keyed: false } => Ok(base.clone()),
            Location::Unknown => Err(Error::Serialization(format!(
                "no entity set known for an instance of `{}`",
                entity_type.fqn()
            ))),
        }
    }

    fn absolute(&self, id: &str) -> String {
        match self.options.service_root() {
            Some(root) => format!("{}/{id}", root.trim_end_matches('/')),
            None => id.to_owned(),
        }
    }

    fn navigation_location(
        &self,
        parent: &Location,
        navigation: &EdmNavigationProperty,
        parent_type: &EdmStructuredType,
        parent_entity: &Entity,
    ) -> Location {
        if navigation.contains_target {
            return match self.entity_id(parent, parent_type, parent_entity) {
                Ok(id) => Location::Contained {
                    base: format!("{id}/{}", encode_path_segment(&navigation.name)),
                    keyed: navigation.collection,
                },
                Err(_) => Location::Unknown,
            };
        }
        let parent_name = match parent {
            Location::Set(name) | Location::Singleton(name) => name,
            Location::Contained { .. } | Location::Unknown => return Location::Unknown,
        };
        let bound = self
            .edm
            .entity_container()
            .and_then(|container| container.binding_target(parent_name))
            .and_then(|target| target.navigation_target(&navigation.name));
        match bound {
            Some(name) if self.edm.entity_set(name).is_some() => Location::Set(name.to_owned()),
            Some(name) => Location::Singleton(name.to_owned()),
            None => Location::Unknown,
        }
    }

    fn value(&self, property: &EdmProperty, value: &Value) -> Result<Json, Error> {
        self.typed_value(
            &property.name,
            &property.ty,
            property.collection,
            &property.facets,
            value,
        )
    }

    fn typed_value(
        &self,
        name: &str,
        ty: &EdmType,
        collection: bool,
        facets: &Facets,
        value: &Value,
    ) -> Result<Json, Error> {
        match (value, collection) {
            (Value::Null, _) if facets.is_nullable() => Ok(Json::Null),
            (Value::Null, _) => Err(mismatch(name, "null is not allowed")),
            (Value::Collection(items), true) => items
                .iter()
                .map(|item| self.single(name, ty, facets, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (Value::Collection(_), false) => Err(mismatch(name, "unexpected collection")),
            (_, true) => Err(mismatch(name, "expected a collection")),
            (value, false) => self.single(name, ty, facets, value),
        }
    }

    fn single(&self, name: &str, ty: &EdmType, facets: &Facets, value: &Value) -> Result<Json, Error> {
        match (ty, value) {
            (_, Value::Null) => Ok(Json::Null),
            (EdmType::Primitive(kind), Value::Primitive(v)) => self.primitive(name, *kind, v, facets),
            (EdmType::Enum(fqn), Value::Enum(n)) => {
                Ok(Json::String(self.edm.resolve_enum_type(fqn)?.format(*n)?))
            }
            (EdmType::Complex(fqn), Value::Complex(complex)) => self.complex(fqn, complex),
            _ => Err(mismatch(name, &format!("expected {ty}"))),
        }
    }

    fn complex(&self, fqn: &FullQualifiedName, complex: &ComplexValue) -> Result<Json, Error> {
        let declared = self.edm.resolve_type(fqn)?;
        let actual = self.actual_type(declared, complex.type_name.as_ref())?;
        let mut map = Map::new();
        self.type_annotation(&mut map, actual, declared);
        for property in actual.properties() {
            if let Some(value) = complex.property(&property.name) {
                map.insert(property.name.clone(), self.value(property, &value.value)?);
            }
        }
        Ok(Json::Object(map))
    }

    fn primitive(
        &self,
        name: &str,
        kind: PrimitiveTypeKind,
        value: &PrimitiveValue,
        facets: &Facets,
    ) -> Result<Json, Error> {
        let text = codec::format(kind, value, facets)?;
        if let PrimitiveTypeKind::Geography(_) | PrimitiveTypeKind::Geometry(_) = kind {
            let PrimitiveValue::Geo(geo) = value else {
                return Err(mismatch(name, &format!("expected {kind}")));
            };
            return Ok(geo_json(geo));
        }
        Ok(match kind {
            PrimitiveTypeKind::Boolean => Json::Bool(text == "true"),
            PrimitiveTypeKind::Byte
            | PrimitiveTypeKind::SByte
            | PrimitiveTypeKind::Int16
            | PrimitiveTypeKind::Int32 => number(name, &text)?,
            PrimitiveTypeKind::Int64 | PrimitiveTypeKind::Decimal
                if self.options.ieee754_compatible() =>
            {
                Json::String(text)
            }
            PrimitiveTypeKind::Int64 | PrimitiveTypeKind::Decimal => number(name, &text)?,
            PrimitiveTypeKind::Single | PrimitiveTypeKind::Double
                if matches!(text.as_str(), "INF" | "-INF" | "NaN") =>
            {
                Json::String(text)
            }
            PrimitiveTypeKind::Single | PrimitiveTypeKind::Double => number(name, &text)?,
            _ => Json::String(text),
        })
    }
}

fn is_selected(select: Option<&SelectOption>, name: &str) -> bool {
    match select {
        None => true,
        Some(select) => select.is_empty() || select.is_star() || select.contains(name),
    }
}

/// Expand options for the level below `item`, with `$levels` unrolled one step.
fn nested_expand(item: &ExpandItem, max_depth: u32) -> Option<Cow<'_, ExpandOption>> {
    let Some(levels) = item.options.levels else {
        return item.options.expand.as_ref().map(Cow::Borrowed);
    };
    let remaining = levels.resolve(max_depth);
    let mut expand = item.options.expand.clone().unwrap_or_default();
    if remaining > 1 {
        let mut again = item.clone();
        again.options.levels = Some(Levels::Depth(remaining - 1));
        expand.push(again);
    }
    if expand.is_empty() {
        None
    } else {
        Some(Cow::Owned(expand))
    }
}

fn number(name: &str, text: &str) -> Result<Json, Error> {
    serde_json::from_str::<serde_json::Number>(text)
        .map(Json::Number)
        .map_err(|err| mismatch(name, &format!("`{text}` is not a JSON number: {err}")))
}

fn mismatch(name: &str, reason: &str) -> Error {
    Error::Serialization(format!("property `{name}`: {reason}"))
}

fn link_mismatch(navigation: &EdmNavigationProperty) -> Error {
    let expected = if navigation.collection {
        "a collection"
    } else {
        "a single entity"
    };
    Error::Serialization(format!(
        "navigation `{}`: expected {expected}",
        navigation.name
    ))
}

fn geo_json(geo: &Geo) -> Json {
    let mut value = shape_json(&geo.shape);
    if geo.srid != geo.dimension.default_srid()
        && let Json::Object(map) = &mut value
    {
        map.insert(
            "crs".to_owned(),
            json!({ "type": "name", "properties": { "name": format!("EPSG:{}", geo.srid) } }),
        );
    }
    value
}

fn shape_json(shape: &GeoShape) -> Json {
    fn position(p: &Position) -> Json {
        match p.z {
            Some(z) => json!([p.x, p.y, z]),
            None => json!([p.x, p.y]),
        }
    }
    fn line(points: &[Position]) -> Json {
        Json::Array(points.iter().map(position).collect())
    }
    fn polygon(rings: &[Vec<Position>]) -> Json {
        Json::Array(rings.iter().map(|r| line(r)).collect())
    }

    match shape {
        GeoShape::Point(p) => json!({ "type": "Point", "coordinates": position(p) }),
        GeoShape::LineString(points) => json!({ "type": "LineString", "coordinates": line(points) }),
        GeoShape::Polygon(rings) => json!({ "type": "Polygon", "coordinates": polygon(rings) }),
        GeoShape::MultiPoint(points) => json!({ "type": "MultiPoint", "coordinates": line(points) }),
        GeoShape::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": Json::Array(lines.iter().map(|l| line(l)).collect()),
        }),
        GeoShape::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": Json::Array(polygons.iter().map(|p| polygon(p)).collect()),
        }),
        GeoShape::Collection(shapes) => json!({
            "type": "GeometryCollection",
            "geometries": Json::Array(shapes.iter().map(shape_json).collect()),
        }),
    }
}

fn to_bytes(map: Map<String, Json>) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(&Json::Object(map)).map_err(|err| Error::Serialization(err.to_string()))
}

impl ODataSerializer for JsonSerializer {
    fn format(&self) -> ODataFormat {
        if self.metadata {
            ODataFormat::Json
        } else {
            ODataFormat::JsonNoMetadata
        }
    }

    fn service_document(&self, options: &SerializerOptions) -> Result<Vec<u8>, Error> {
        let mut entries = Vec::new();
        if let Some(container) = self.edm.entity_container() {
            for set in container.entity_sets() {
                if set.include_in_service_document {
                    entries.push(json!({ "name": set.name, "kind": "EntitySet", "url": set.name }));
                }
            }
            for singleton in container.singletons() {
                entries.push(
                    json!({ "name": singleton.name, "kind": "Singleton", "url": singleton.name }),
                );
            }
            for import in container.operation_imports() {
                if import.kind == OperationKind::Function && import.include_in_service_document {
                    entries.push(
                        json!({ "name": import.name, "kind": "FunctionImport", "url": import.name }),
                    );
                }
            }
        }

        let mut map = Map::new();
        if self.metadata {
            let context = match options.service_root() {
                Some(root) => format!("{}/$metadata", root.trim_end_matches('/')),
                None => "$metadata".to_owned(),
            };
            map.insert("@odata.context".to_owned(), Json::String(context));
        }
        map.insert("value".to_owned(), Json::Array(entries));
        to_bytes(map)
    }

    fn entity(
        &self,
        target: EdmBindingTarget<'_>,
        entity: &Entity,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let writer = self.writer(options);
        let declared = self.edm.resolve_entity_type(target.entity_type())?;
        let body = writer.entity(
            declared,
            entity,
            options.select(),
            options.expand(),
            &Location::of(target),
            0,
        )?;

        let mut map = Map::new();
        writer.context(&mut map);
        writer.bound_procedures(&mut map);
        map.extend(body);
        to_bytes(map)
    }

    fn entity_collection(
        &self,
        target: EdmBindingTarget<'_>,
        entities: &EntityCollection,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let writer = self.writer(options);
        let declared = self.edm.resolve_entity_type(target.entity_type())?;
        let location = Location::of(target);
        let values = entities
            .entities
            .iter()
            .map(|e| {
                writer
                    .entity(declared, e, options.select(), options.expand(), &location, 0)
                    .map(Json::Object)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = Map::new();
        writer.context(&mut map);
        if options.count() {
            map.insert("@odata.count".to_owned(), Json::from(entities.total_count()));
        }
        writer.bound_procedures(&mut map);
        map.insert("value".to_owned(), Json::Array(values));
        if let Some(next) = &entities.next_link {
            map.insert("@odata.nextLink".to_owned(), Json::String(next.clone()));
        }
        to_bytes(map)
    }

    fn entity_property(
        &self,
        property: &EdmProperty,
        value: &Value,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let writer = self.writer(options);
        let mut map = Map::new();
        writer.context(&mut map);
        match writer.value(property, value)? {
            Json::Object(fields) if !property.collection => map.extend(fields),
            other => {
                map.insert("value".to_owned(), other);
            }
        }
        to_bytes(map)
    }

    fn reference(
        &self,
        target: EdmBindingTarget<'_>,
        entity: &Entity,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let writer = self.writer(options);
        let entity_type = self.edm.resolve_entity_type(target.entity_type())?;
        let id = writer.entity_id(&Location::of(target), entity_type, entity)?;

        let mut map = Map::new();
        writer.context(&mut map);
        map.insert("@odata.id".to_owned(), Json::String(writer.absolute(&id)));
        to_bytes(map)
    }

    fn reference_collection(
        &self,
        target: EdmBindingTarget<'_>,
        entities: &EntityCollection,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let writer = self.writer(options);
        let entity_type = self.edm.resolve_entity_type(target.entity_type())?;
        let location = Location::of(target);
        let values = entities
            .entities
            .iter()
            .map(|e| writer.reference(entity_type, e, &location))
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = Map::new();
        writer.context(&mut map);
        if options.count() {
            map.insert("@odata.count".to_owned(), Json::from(entities.total_count()));
        }
        map.insert("value".to_owned(), Json::Array(values));
        if let Some(next) = &entities.next_link {
            map.insert("@odata.nextLink".to_owned(), Json::String(next.clone()));
        }
        to_bytes(map)
    }

    fn delta(
        &self,
        target: EdmBindingTarget<'_>,
        delta: &Delta,
        options: &SerializerOptions,
    ) -> Result<Vec<u8>, Error> {
        let Some(name) = target.name() else {
            return Err(Error::Serialization(
                "a delta payload needs an entity set or singleton".to_owned(),
            ));
        };
        if delta.next_link.is_some() && delta.delta_link.is_some() {
            return Err(Error::Serialization(
                "a delta page carries either a next link or a delta link".to_owned(),
            ));
        }
        let writer = self.writer(options);
        let declared = self.edm.resolve_entity_type(target.entity_type())?;
        let location = Location::of(target);
        let fragment = |kind: &str| format!("#{}/{kind}", encode_path_segment(name));

        let mut values = delta
            .entities
            .iter()
            .map(|e| {
                writer
                    .entity(declared, e, options.select(), options.expand(), &location, 0)
                    .map(Json::Object)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for deleted in &delta.deleted_entities {
            values.push(json!({
                "@odata.context": fragment("$deletedEntity"),
                "id": writer.absolute(&deleted.id),
                "reason": deleted.reason.as_str(),
            }));
        }
        for (links, kind) in [(&delta.added_links, "$link"), (&delta.deleted_links, "$deletedLink")] {
            for link in links {
                values.push(json!({
                    "@odata.context": fragment(kind),
                    "source": writer.absolute(&link.source),
                    "relationship": link.relationship,
                    "target": writer.absolute(&link.target),
                }));
            }
        }

        let mut map = Map::new();
        writer.context(&mut map);
        if options.count() {
            map.insert("@odata.count".to_owned(), Json::from(delta.total_count()));
        }
        map.insert("value".to_owned(), Json::Array(values));
        if let Some(next) = &delta.next_link {
            map.insert("@odata.nextLink".to_owned(), Json::String(next.clone()));
        }
        if let Some(link) = &delta.delta_link {
            map.insert("@odata.deltaLink".to_owned(), Json::String(link.clone()));
        }
        to_bytes(map)
    }

    fn error(&self, error: &ODataServerError) -> Result<Vec<u8>, Error> {
        let mut body = Map::new();
        body.insert("code".to_owned(), Json::String(error.code.clone()));
        body.insert("message".to_owned(), Json::String(error.message.clone()));
        if let Some(target) = &error.target {
            body.insert("target".to_owned(), Json::String(target.clone()));
        }
        if !error.details.is_empty() {
            let details = error
                .details
                .iter()
                .map(|d| {
                    let mut detail = Map::new();
                    detail.insert("code".to_owned(), Json::String(d.code.clone()));
                    detail.insert("message".to_owned(), Json::String(d.message.clone()));
                    if let Some(target) = &d.target {
                        detail.insert("target".to_owned(), Json::String(target.clone()));
                    }
                    Json::Object(detail)
                })
                .collect();
            body.insert("details".to_owned(), Json::Array(details));
        }
        let mut map = Map::new();
        map.insert("error".to_owned(), Json::Object(body));
        to_bytes(map)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::query::QueryOptions;

    #[test]
    fn test_levels_unroll_one_step() {
        let item = ExpandItem::new("Friends")
            .with_options(QueryOptions::new().with_levels(Levels::Depth(3)));
        let nested = nested_expand(&item, 5).unwrap();
        let again = nested.get("Friends").unwrap();
        assert_eq!(again.options.levels, Some(Levels::Depth(2)));

        let last = ExpandItem::new("Friends")
            .with_options(QueryOptions::new().with_levels(Levels::Depth(1)));
        assert!(nested_expand(&last, 5).is_none());
    }

    #[test]
    fn test_levels_max_is_bounded() {
        let item =
            ExpandItem::new("Friends").with_options(QueryOptions::new().with_levels(Levels::Max));
        let nested = nested_expand(&item, 2).unwrap();
        assert_eq!(
            nested.get("Friends").unwrap().options.levels,
            Some(Levels::Depth(1))
        );
    }

    #[test]
    fn test_geo_crs_only_for_non_default_srid() {
        let point = |srid| Geo {
            dimension: crate::types::Dimension::Geography,
            srid,
            shape: GeoShape::Point(Position {
                x: 1.0,
                y: 2.0,
                z: None,
            }),
        };
        assert_eq!(
            geo_json(&point(4326)),
            json!({ "type": "Point", "coordinates": [1.0, 2.0] })
        );
        assert_eq!(
            geo_json(&point(3857))["crs"]["properties"]["name"],
            json!("EPSG:3857")
        );
    }

    #[test]
    fn test_number_rejects_garbage() {
        assert_eq!(number("P", "12").unwrap(), json!(12));
        assert_eq!(number("P", "1e+16").unwrap(), json!(1e16));
        assert!(number("P", "INF").is_err());
    }
}
