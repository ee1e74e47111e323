use super::FullQualifiedName;

/// Overload identity of an operation.
///
/// `(name, binding type + binding cardinality, sorted parameter names)`.
/// Parameter names never include the binding parameter, and an absent list is
/// the same key as an empty one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationKey {
    name: FullQualifiedName,
    binding: Option<(FullQualifiedName, bool)>,
    parameter_names: Vec<String>,
}

impl OperationKey {
    pub fn new<I, S>(
        name: FullQualifiedName,
        binding: Option<(FullQualifiedName, bool)>,
        parameter_names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parameter_names: Vec<String> = parameter_names
            .into_iter()
            .map(|n| n.as_ref().to_owned())
            .collect();
        parameter_names.sort_unstable();
        Self {
            name,
            binding,
            parameter_names,
        }
    }

    pub fn unbound<I, S>(name: FullQualifiedName, parameter_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(name, None, parameter_names)
    }

    #[must_use]
    pub fn name(&self) -> &FullQualifiedName {
        &self.name
    }

    #[must_use]
    pub fn binding(&self) -> Option<(&FullQualifiedName, bool)> {
        self.binding.as_ref().map(|(fqn, collection)| (fqn, *collection))
    }

    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// The same key rebound to another binding type.
    #[must_use]
    pub(crate) fn rebind(&self, binding_type: &FullQualifiedName) -> Self {
        Self {
            name: self.name.clone(),
            binding: self
                .binding
                .as_ref()
                .map(|(_, collection)| (binding_type.clone(), *collection)),
            parameter_names: self.parameter_names.clone(),
        }
    }
}
