//! Instance data handed to the serializers and canonical URL builder.

use crate::edm::FullQualifiedName;
use crate::types::PrimitiveValue;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Primitive(PrimitiveValue),
    /// Numeric value of an enum member or flags combination.
    Enum(i64),
    Complex(ComplexValue),
    Collection(Vec<Value>),
}

impl Value {
    pub fn primitive(value: impl Into<PrimitiveValue>) -> Self {
        Value::Primitive(value.into())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Primitive(value.into())
                }
            }
        )*
    };
}

value_from! {
    PrimitiveValue,
    Vec<u8>,
    bool,
    u8,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
    bigdecimal::BigDecimal,
    String,
    &str,
    chrono::NaiveDate,
    chrono::DateTime<chrono::Utc>,
    chrono::TimeDelta,
    uuid::Uuid,
    chrono::NaiveTime,
    crate::types::Geo,
}

impl From<ComplexValue> for Value {
    fn from(value: ComplexValue) -> Self {
        Value::Complex(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexValue {
    /// Set when the instance is of a type derived from the declared one.
    pub type_name: Option<FullQualifiedName>,
    pub properties: Vec<Property>,
}

impl ComplexValue {
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Inline content of a navigation property.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkTarget {
    Single(Option<Box<Entity>>),
    Collection(Vec<Entity>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NavigationLink {
    pub name: String,
    pub target: LinkTarget,
}

/// Media resource of an entity whose type has a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    /// Set when the instance is of a type derived from the set's type.
    pub type_name: Option<FullQualifiedName>,
    pub properties: Vec<Property>,
    pub links: Vec<NavigationLink>,
    pub media: Option<MediaContent>,
}

impl Entity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, type_name: FullQualifiedName) -> Self {
        self.type_name = Some(type_name);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }

    #[must_use]
    pub fn with_link(mut self, name: impl Into<String>, entity: Option<Entity>) -> Self {
        self.links.push(NavigationLink {
            name: name.into(),
            target: LinkTarget::Single(entity.map(Box::new)),
        });
        self
    }

    #[must_use]
    pub fn with_links(mut self, name: impl Into<String>, entities: Vec<Entity>) -> Self {
        self.links.push(NavigationLink {
            name: name.into(),
            target: LinkTarget::Collection(entities),
        });
        self
    }

    #[must_use]
    pub fn with_media(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.media = Some(MediaContent {
            content_type: content_type.into(),
            bytes,
        });
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Replace the value of `name`, appending the property if absent.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.properties.push(Property { name, value }),
        }
    }

    #[must_use]
    pub fn link(&self, name: &str) -> Option<&NavigationLink> {
        self.links.iter().find(|l| l.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityCollection {
    pub entities: Vec<Entity>,
    /// Total count when known; defaults to the number of entities.
    pub count: Option<u64>,
    pub next_link: Option<String>,
}

impl EntityCollection {
    #[must_use]
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            count: None,
            next_link: None,
        }
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.count
            .unwrap_or_else(|| u64::try_from(self.entities.len()).unwrap_or(u64::MAX))
    }
}

/// Why an entity left a delta result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemovedReason {
    /// The entity no longer exists.
    #[default]
    Deleted,
    /// The entity still exists but no longer matches the tracked query.
    Changed,
}

impl RemovedReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RemovedReason::Deleted => "deleted",
            RemovedReason::Changed => "changed",
        }
    }
}

/// Entity removed from a tracked result, identified by its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletedEntity {
    /// Entity id relative to the service root, e.g. `People('russellwhyte')`.
    pub id: String,
    pub reason: RemovedReason,
}

impl DeletedEntity {
    #[must_use]
    pub fn new(id: impl Into<String>, reason: RemovedReason) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }
}

/// Relationship between two entity ids, added or removed since the last delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityLink {
    pub source: String,
    /// Navigation property of `source`.
    pub relationship: String,
    pub target: String,
}

impl EntityLink {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }
}

/// Changes to a tracked entity collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delta {
    /// Added or changed entities.
    pub entities: Vec<Entity>,
    pub deleted_entities: Vec<DeletedEntity>,
    pub added_links: Vec<EntityLink>,
    pub deleted_links: Vec<EntityLink>,
    /// Total count when known; defaults to the number of entries.
    pub count: Option<u64>,
    pub next_link: Option<String>,
    /// Link for the next round of changes; only on the last page.
    pub delta_link: Option<String>,
}

impl Delta {
    #[must_use]
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.deleted_entities.is_empty()
            && self.added_links.is_empty()
            && self.deleted_links.is_empty()
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.count.unwrap_or_else(|| {
            let entries = self.entities.len()
                + self.deleted_entities.len()
                + self.added_links.len()
                + self.deleted_links.len();
            u64::try_from(entries).unwrap_or(u64::MAX)
        })
    }
}
