use crate::Error;
use std::fmt;
use std::str::FromStr;

/// `(namespace, name)` identity of a schema element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullQualifiedName {
    namespace: String,
    name: String,
}

impl FullQualifiedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same name under another namespace (alias resolution).
    #[must_use]
    pub fn with_namespace(&self, namespace: &str) -> Self {
        Self::new(namespace, self.name.clone())
    }
}

impl fmt::Display for FullQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for FullQualifiedName {
    type Err = Error;

    /// Splits at the last `.`; both halves must be non-empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(Error::InvalidModel(format!(
                "`{s}` is not a namespace-qualified name"
            ))),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_splits_at_last_dot() {
        let fqn: FullQualifiedName = "Microsoft.OData.SampleService.Models.TripPin.Person"
            .parse()
            .unwrap();
        assert_eq!(fqn.namespace(), "Microsoft.OData.SampleService.Models.TripPin");
        assert_eq!(fqn.name(), "Person");
        assert_eq!(
            fqn.to_string(),
            "Microsoft.OData.SampleService.Models.TripPin.Person"
        );
    }

    #[test]
    fn test_rejects_unqualified() {
        assert!("Person".parse::<FullQualifiedName>().is_err());
        assert!(".Person".parse::<FullQualifiedName>().is_err());
        assert!("Ns.".parse::<FullQualifiedName>().is_err());
    }
}
