use crate::types::SqlValue;

/// Caller-declared type of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Double,
    Null,
}

/// Type tag handed to the native execute call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Text,
    Integer,
    Double,
}

impl NativeType {
    /// Maps a declared parameter type to the native tag.
    /// Undeclared parameters are sent as text.
    pub fn for_parameter(declared: Option<ParameterType>) -> Self {
        match declared {
            Some(ParameterType::Double) => NativeType::Double,
            Some(ParameterType::Integer) | Some(ParameterType::Null) => NativeType::Integer,
            Some(ParameterType::String) | None => NativeType::Text,
        }
    }
}

/// A parameter value as passed to the native execute call.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub value: SqlValue,
    pub native_type: NativeType,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: Option<String>,
    value: SqlValue,
    declared: Option<ParameterType>,
}

/// Ordered set of statement parameters.
///
/// Entries are positional; an entry may additionally carry a name.
/// Positional order is the order of insertion.
///
/// # Example
/// ```
/// use sqladapter::types::{ParameterContainer, ParameterType};
///
/// let mut container = ParameterContainer::new();
/// container.push(42);
/// container.set_named_typed("price", 9.5, ParameterType::Double);
/// assert_eq!(container.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterContainer {
    entries: Vec<Entry>,
}

impl ParameterContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from positional values.
    pub fn from_positional<V: Into<SqlValue>>(values: impl IntoIterator<Item = V>) -> Self {
        let mut container = Self::new();
        for value in values {
            container.push(value);
        }
        container
    }

    /// Appends a positional value.
    pub fn push(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.entries.push(Entry {
            name: None,
            value: value.into(),
            declared: None,
        });
        self
    }

    /// Appends a positional value with a declared type.
    pub fn push_typed(&mut self, value: impl Into<SqlValue>, declared: ParameterType) -> &mut Self {
        self.entries.push(Entry {
            name: None,
            value: value.into(),
            declared: Some(declared),
        });
        self
    }

    /// Sets a named value, replacing an existing entry of the same name in place.
    pub fn set_named(&mut self, name: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.upsert(name, value.into(), None)
    }

    /// Sets a named value with a declared type.
    pub fn set_named_typed(
        &mut self,
        name: &str,
        value: impl Into<SqlValue>,
        declared: ParameterType,
    ) -> &mut Self {
        self.upsert(name, value.into(), Some(declared))
    }

    /// Overwrites values by position, appending any beyond the current length.
    /// Names and declared types of overwritten entries are kept.
    pub fn set_from_values(&mut self, values: impl IntoIterator<Item = SqlValue>) -> &mut Self {
        for (index, value) in values.into_iter().enumerate() {
            match self.entries.get_mut(index) {
                Some(entry) => entry.value = value,
                None => {
                    self.push(value);
                }
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .map(|e| &e.value)
    }

    pub fn get_at(&self, index: usize) -> Option<&SqlValue> {
        self.entries.get(index).map(|e| &e.value)
    }

    /// Declared type of the entry at `index`, if any was given.
    pub fn declared_type(&self, index: usize) -> Option<ParameterType> {
        self.entries.get(index).and_then(|e| e.declared)
    }

    /// Values in positional order.
    pub fn positional_values(&self) -> Vec<SqlValue> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    /// Named entries in positional order.
    pub fn named_values(&self) -> Vec<(&str, &SqlValue)> {
        self.entries
            .iter()
            .filter_map(|e| e.name.as_deref().map(|n| (n, &e.value)))
            .collect()
    }

    /// Values in positional order with their native type tags.
    /// A `Null` declaration clears the value.
    pub fn bound_parameters(&self) -> Vec<BoundParameter> {
        self.entries
            .iter()
            .map(|e| BoundParameter {
                value: match e.declared {
                    Some(ParameterType::Null) => SqlValue::Null,
                    _ => e.value.clone(),
                },
                native_type: NativeType::for_parameter(e.declared),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn upsert(&mut self, name: &str, value: SqlValue, declared: Option<ParameterType>) -> &mut Self {
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.as_deref() == Some(name))
        {
            Some(entry) => {
                entry.value = value;
                if declared.is_some() {
                    entry.declared = declared;
                }
            }
            None => self.entries.push(Entry {
                name: Some(name.to_string()),
                value,
                declared,
            }),
        }
        self
    }
}

/// Parameters supplied to `Statement::execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// Plain positional values, merged into the statement's container.
    Values(Vec<SqlValue>),
    /// A full container; used only when the statement holds none.
    Container(ParameterContainer),
}

impl From<Vec<SqlValue>> for Parameters {
    fn from(values: Vec<SqlValue>) -> Self {
        Parameters::Values(values)
    }
}

impl From<ParameterContainer> for Parameters {
    fn from(container: ParameterContainer) -> Self {
        Parameters::Container(container)
    }
}
