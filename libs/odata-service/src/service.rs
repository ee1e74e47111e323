use crate::config::ODataServiceConfig;
use crate::error::ServiceError;
use crate::exchange::{ODataRequest, ODataResponse, ODataResponseKind};
use crate::provider::{DataProvider, DataRequest};
use odata_core::edm::{
    EdmBindingTarget, EdmProperty, EdmType, FullQualifiedName, MetadataProvider, OperationKind,
};
use odata_core::serializer::JsonSerializer;
use odata_core::uri::{UriResourcePath, build_canonical_url, parse_canonical_url, parse_resource_path, parse_uri};
use odata_core::{
    BoundProcedure, ContextUrl, Edm, EdmRegistry, Entity, Error, Facets, ODataFormat,
    ODataSerializer, ODataServerError, QueryOptions, ResourceKind, SerializerOptions,
    SerializerOptionsParts, UriInfoKind, UriResource, Value, create_serializer,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TEXT_PLAIN: &str = "text/plain";

/// OData request processor over a swappable model and a data provider.
///
/// Each request works on the model snapshot taken when it started; a
/// concurrent [`ODataService::reload_metadata`] only affects later requests.
pub struct ODataService {
    config: ODataServiceConfig,
    registry: EdmRegistry,
    data: Arc<dyn DataProvider>,
}

/// Format and numeric mode chosen for one request.
#[derive(Clone, Copy, Debug)]
struct Negotiated {
    format: ODataFormat,
    ieee754_compatible: bool,
}

impl ODataService {
    #[must_use]
    pub fn new(config: ODataServiceConfig, edm: Edm, data: Arc<dyn DataProvider>) -> Self {
        Self {
            config,
            registry: EdmRegistry::new(edm),
            data,
        }
    }

    /// # Errors
    /// `ServiceError::Model` when the metadata cannot be read or is invalid.
    pub fn from_provider(
        config: ODataServiceConfig,
        metadata: &dyn MetadataProvider,
        data: Arc<dyn DataProvider>,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            config,
            registry: EdmRegistry::from_provider(metadata)?,
            data,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ODataServiceConfig {
        &self.config
    }

    /// Current model snapshot.
    #[must_use]
    pub fn model(&self) -> Arc<Edm> {
        self.registry.snapshot()
    }

    /// Rebuild the model; on failure the current one stays in service.
    ///
    /// # Errors
    /// `ServiceError::Model` with the provider or validation error.
    pub fn reload_metadata(&self, metadata: &dyn MetadataProvider) -> Result<(), ServiceError> {
        let edm = self.registry.reload(metadata)?;
        info!(namespaces = ?edm.namespaces(), "OData metadata reloaded");
        Ok(())
    }

    /// Serve one request. Failures become OData error responses.
    pub fn handle(&self, request: &ODataRequest) -> ODataResponse {
        let span = tracing::info_span!("odata_request", path = %request.path, query = %request.query);
        let _entered = span.enter();

        let edm = self.registry.snapshot();
        let mut negotiated = Negotiated {
            format: self.config.default_format,
            ieee754_compatible: self.config.ieee754_compatible,
        };
        match self.process(&edm, request, &mut negotiated) {
            Ok(response) => {
                debug!(status = %response.status, "request served");
                response
            }
            Err(err) => error_response(&edm, negotiated, err),
        }
    }

    fn process(
        &self,
        edm: &Arc<Edm>,
        request: &ODataRequest,
        negotiated: &mut Negotiated,
    ) -> Result<ODataResponse, Error> {
        let info = parse_uri(edm, &request.path, &request.query, &self.config.limits)?;
        *negotiated = self.negotiate(info.query.format.as_deref(), request.accept.as_deref())?;
        let kind = ODataResponseKind::of(&info)?;
        debug!(?kind, format = ?negotiated.format, "dispatching");

        let exchange = Exchange {
            service: self,
            edm,
            serializer: create_serializer(negotiated.format, Arc::clone(edm)),
            query: &info.query,
            ieee754_compatible: negotiated.ieee754_compatible,
        };
        match &info.kind {
            UriInfoKind::Resource(path) => exchange.resource(path, kind),
            UriInfoKind::EntityId { type_cast } => {
                exchange.entity_id(type_cast.as_ref(), &self.config.limits)
            }
            _ => exchange.document(kind),
        }
    }

    fn negotiate(&self, format: Option<&str>, accept: Option<&str>) -> Result<Negotiated, Error> {
        let ieee754_compatible = self.config.ieee754_compatible
            || accept.is_some_and(|a| a.to_ascii_lowercase().contains("ieee754compatible=true"));
        let format = match format {
            Some(value) => ODataFormat::from_query_value(value).ok_or_else(|| {
                Error::InvalidQueryOption {
                    option: "$format".to_owned(),
                    reason: format!("unsupported format `{value}`"),
                }
            })?,
            None => accept
                .and_then(format_from_accept)
                .unwrap_or(self.config.default_format),
        };
        Ok(Negotiated {
            format,
            ieee754_compatible,
        })
    }
}

fn error_response(edm: &Arc<Edm>, negotiated: Negotiated, err: Error) -> ODataResponse {
    let error = ODataServerError::from(err);
    if error.status.is_server_error() {
        warn!(status = %error.status, code = %error.code, message = %error.message, "request failed");
    } else {
        debug!(status = %error.status, code = %error.code, message = %error.message, "request rejected");
    }

    let serializer = create_serializer(negotiated.format, Arc::clone(edm));
    let (body, content_type) = match serializer.error(&error) {
        Ok(body) => (body, serializer.content_type()),
        Err(_) => {
            let json = JsonSerializer::new(Arc::clone(edm));
            (json.error(&error).unwrap_or_default(), json.content_type())
        }
    };
    ODataResponse {
        status: error.status,
        content_type: Some(content_type.to_owned()),
        body,
    }
}

/// First media range of an `Accept` header naming a supported format.
fn format_from_accept(accept: &str) -> Option<ODataFormat> {
    accept.split(',').find_map(|range| {
        let range = range.trim().to_ascii_lowercase().replace(' ', "");
        let media_type = range.split(';').next().unwrap_or_default();
        match media_type {
            "application/json" if range.contains("odata.metadata=none") => {
                Some(ODataFormat::JsonNoMetadata)
            }
            "application/json" => Some(ODataFormat::Json),
            "application/xml" | "application/atom+xml" => Some(ODataFormat::Xml),
            _ => None,
        }
    })
}

/// State of one request after URI parsing and negotiation.
struct Exchange<'a> {
    service: &'a ODataService,
    edm: &'a Arc<Edm>,
    serializer: Box<dyn ODataSerializer>,
    query: &'a QueryOptions,
    ieee754_compatible: bool,
}

impl Exchange<'_> {
    fn document(&self, kind: ODataResponseKind) -> Result<ODataResponse, Error> {
        match kind {
            ODataResponseKind::ServiceDocument => {
                let body = self.serializer.service_document(&self.options(None, Vec::new())?)?;
                Ok(self.payload(body))
            }
            _ => Err(Error::NotImplemented("CSDL metadata document".to_owned())),
        }
    }

    /// `$entity?$id=...`: resolve the id to its canonical path and read it.
    fn entity_id(
        &self,
        type_cast: Option<&FullQualifiedName>,
        limits: &odata_core::ODataLimits,
    ) -> Result<ODataResponse, Error> {
        let id = self.query.id.as_deref().ok_or_else(|| Error::InvalidQueryOption {
            option: "$id".to_owned(),
            reason: "required by $entity".to_owned(),
        })?;
        let root = self.service.config.service_root.as_deref().unwrap_or_default();
        let reference = parse_canonical_url(self.edm, root, id)?;
        let path = parse_resource_path(self.edm, &reference.to_path_string(), limits)?;
        if let (Some(cast), Some(EdmType::Entity(declared))) = (type_cast, path.target_type())
            && !self.edm.is_same_or_derived(cast, declared)
        {
            return Err(Error::ResourceNotFound {
                kind: ResourceKind::Type,
                name: cast.to_string(),
                index: None,
            });
        }
        self.resource(&path, ODataResponseKind::Entity)
    }

    fn resource(&self, path: &UriResourcePath, kind: ODataResponseKind) -> Result<ODataResponse, Error> {
        let data = self.service.data.as_ref();
        let request = DataRequest {
            edm: self.edm,
            path,
            query: self.query,
        };
        match kind {
            ODataResponseKind::EntityCollection => {
                let entities = data.read_entity_collection(&request)?;
                let options = self.options(self.context(path)?, Vec::new())?;
                let body = self
                    .serializer
                    .entity_collection(self.binding(path)?, &entities, &options)?;
                Ok(self.payload(body))
            }
            ODataResponseKind::Entity => {
                let entity = data.read_entity(&request)?.ok_or_else(|| missing(path))?;
                let target = self.binding(path)?;
                let procedures = self.bound_actions(target, &entity)?;
                let options = self.options(self.context(path)?, procedures)?;
                let body = self.serializer.entity(target, &entity, &options)?;
                Ok(self.payload(body))
            }
            ODataResponseKind::Property { .. } => {
                let Some(value) = data.read_property(&request)? else {
                    return Ok(ODataResponse::no_content());
                };
                let property = self.result_property(path)?;
                let options = self.options(self.context(path)?, Vec::new())?;
                let body = self.serializer.entity_property(&property, &value, &options)?;
                Ok(self.payload(body))
            }
            ODataResponseKind::PrimitiveValue => match data.read_property(&request)? {
                None | Some(Value::Null) => Ok(ODataResponse::no_content()),
                Some(value) => {
                    let property = self.result_property(path)?;
                    Ok(ODataResponse::ok(TEXT_PLAIN, self.raw_value(&property, &value)?))
                }
            },
            ODataResponseKind::MediaValue => {
                let entity = data.read_entity(&request)?.ok_or_else(|| missing(path))?;
                match entity.media {
                    Some(media) => Ok(ODataResponse::ok(media.content_type, media.bytes)),
                    None => Ok(ODataResponse::no_content()),
                }
            }
            ODataResponseKind::Count => {
                let count = match path.target_type() {
                    Some(EdmType::Entity(_)) => data.count(&request)?,
                    _ => match data.read_property(&request)? {
                        Some(Value::Collection(items)) => u64::try_from(items.len()).unwrap_or(u64::MAX),
                        _ => 0,
                    },
                };
                Ok(ODataResponse::ok(TEXT_PLAIN, self.serializer.count(count)?))
            }
            ODataResponseKind::Reference => {
                let entity = data.read_entity(&request)?.ok_or_else(|| missing(path))?;
                let options = self.options(self.context(path)?, Vec::new())?;
                let body = self.serializer.reference(self.binding(path)?, &entity, &options)?;
                Ok(self.payload(body))
            }
            ODataResponseKind::ReferenceCollection => {
                let entities = data.read_entity_collection(&request)?;
                let options = self.options(self.context(path)?, Vec::new())?;
                let body = self
                    .serializer
                    .reference_collection(self.binding(path)?, &entities, &options)?;
                Ok(self.payload(body))
            }
            ODataResponseKind::NoContent => {
                data.invoke_action(&request)?;
                Ok(ODataResponse::no_content())
            }
            ODataResponseKind::ServiceDocument | ODataResponseKind::Metadata => self.document(kind),
        }
    }

    fn context(&self, path: &UriResourcePath) -> Result<Option<ContextUrl>, Error> {
        ContextUrl::for_path(
            self.edm,
            path,
            self.query,
            self.service.config.service_root.as_deref(),
        )
    }

    fn options(
        &self,
        context_url: Option<ContextUrl>,
        bound_procedures: Vec<BoundProcedure>,
    ) -> Result<SerializerOptions, Error> {
        let config = &self.service.config;
        SerializerOptions::new(SerializerOptionsParts {
            bound_procedures,
            ieee754_compatible: self.ieee754_compatible,
            service_root: config.service_root.clone(),
            max_expand_depth: config.limits.max_expand_depth,
            ..SerializerOptionsParts::from_query(context_url, self.query)
        })
    }

    fn payload(&self, body: Vec<u8>) -> ODataResponse {
        let content_type = self.serializer.content_type();
        if self.ieee754_compatible && self.serializer.format() != ODataFormat::Xml {
            ODataResponse::ok(format!("{content_type};IEEE754Compatible=true"), body)
        } else {
            ODataResponse::ok(content_type, body)
        }
    }

    /// Entity set or singleton of the addressed entities, or their bare type.
    fn binding<'p>(&'p self, path: &'p UriResourcePath) -> Result<EdmBindingTarget<'p>, Error> {
        if let Some(name) = path.binding_target()
            && let Some(target) = self
                .edm
                .entity_container()
                .and_then(|container| container.binding_target(name))
        {
            return Ok(target);
        }
        match path.target_type() {
            Some(EdmType::Entity(fqn)) => Ok(EdmBindingTarget::Unbound(fqn)),
            _ => Err(Error::Serialization(format!(
                "`{path}` does not address entities"
            ))),
        }
    }

    /// Bound actions applicable to an entity read from an entity set.
    fn bound_actions(
        &self,
        target: EdmBindingTarget<'_>,
        entity: &Entity,
    ) -> Result<Vec<BoundProcedure>, Error> {
        let EdmBindingTarget::EntitySet(set) = target else {
            return Ok(Vec::new());
        };
        if !self.service.config.advertise_actions
            || self.serializer.format() != ODataFormat::Json
        {
            return Ok(Vec::new());
        }

        let entity_type = entity.type_name.as_ref().unwrap_or(&set.entity_type);
        let mut procedures: Vec<BoundProcedure> = Vec::new();
        let mut entity_id: Option<String> = None;
        for operation in self.edm.operations() {
            let applies = operation.kind == OperationKind::Action
                && operation.binding_parameter().is_some_and(|binding| {
                    !binding.collection
                        && matches!(&binding.ty, EdmType::Entity(bound) if self.edm.is_same_or_derived(entity_type, bound))
                });
            if !applies || procedures.iter().any(|p| p.name == operation.fqn) {
                continue;
            }
            if entity_id.is_none() {
                entity_id = Some(build_canonical_url(self.edm, set, entity)?);
            }
            procedures.push(BoundProcedure {
                name: operation.fqn.clone(),
                title: None,
                target: format!("{}/{}", entity_id.as_deref().unwrap_or_default(), operation.fqn),
            });
        }
        Ok(procedures)
    }

    /// Declaration of the addressed property, or a synthetic one for an
    /// operation result.
    fn result_property(&self, path: &UriResourcePath) -> Result<EdmProperty, Error> {
        let mut owner: Option<&FullQualifiedName> = None;
        let mut found = None;
        for segment in path.segments() {
            match segment {
                UriResource::EntitySet { entity_type, .. }
                | UriResource::Singleton { entity_type, .. } => owner = Some(entity_type),
                UriResource::Navigation { target, .. } => owner = Some(target),
                UriResource::TypeCast(fqn) => owner = Some(fqn),
                UriResource::Property { name, ty, .. } => {
                    found = owner
                        .and_then(|fqn| self.edm.find_type(fqn))
                        .and_then(|ty| ty.property(name))
                        .cloned();
                    if let EdmType::Complex(fqn) = ty {
                        owner = Some(fqn);
                    }
                }
                UriResource::Operation {
                    name,
                    return_type: Some(returns),
                    ..
                } => found = Some(synthetic(&name.to_string(), returns)),
                UriResource::OperationImport {
                    name,
                    return_type: Some(returns),
                    ..
                } => found = Some(synthetic(name, returns)),
                _ => {}
            }
        }
        found.ok_or_else(|| Error::Serialization(format!("`{path}` does not address a property")))
    }

    fn raw_value(&self, property: &EdmProperty, value: &Value) -> Result<Vec<u8>, Error> {
        match (value, &property.ty) {
            (Value::Primitive(primitive), _) => {
                self.serializer.primitive_value(primitive, &property.facets)
            }
            (Value::Enum(number), EdmType::Enum(fqn)) => {
                Ok(self.edm.resolve_enum_type(fqn)?.format(*number)?.into_bytes())
            }
            _ => Err(Error::Serialization(format!(
                "`{}` has no raw value",
                property.name
            ))),
        }
    }
}

fn synthetic(name: &str, returns: &odata_core::edm::EdmReturnType) -> EdmProperty {
    EdmProperty {
        name: name.to_owned(),
        ty: returns.ty.clone(),
        collection: returns.collection,
        facets: Facets {
            nullable: Some(returns.nullable),
            ..Facets::NONE
        },
        default_value: None,
    }
}

fn missing(path: &UriResourcePath) -> Error {
    Error::ResourceNotFound {
        kind: ResourceKind::Entity,
        name: path.to_path_string(),
        index: None,
    }
}
