//! Values bound to the parameters of one compiled query.

use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};
use crate::metamodel::BasicType;
use crate::sql::ParameterExpansions;

use super::parameter::{ParameterName, QueryParameter, Value};

/// One bound value, or a list for a multi-valued parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Single(Value),
    Multi(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameterBinding {
    pub value: BindValue,
    /// Type the value is bound as; explicit or anticipated.
    pub bind_type: Option<BasicType>,
}

impl QueryParameterBinding {
    /// Value at `element` of a multi-valued binding, or the single value.
    pub fn value_at(&self, element: Option<usize>) -> Option<&Value> {
        match (&self.value, element) {
            (BindValue::Single(value), None | Some(0)) => Some(value),
            (BindValue::Single(_), Some(_)) => None,
            (BindValue::Multi(values), Some(i)) => values.get(i),
            (BindValue::Multi(values), None) => values.first(),
        }
    }
}

/// Bindings for the parameters a query declares.
///
/// ```ignore
/// let mut bindings = QueryParameterBindings::new(plan.parameters());
/// bindings.bind("name", "Ann")?.bind("age", 42)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameterBindings {
    parameters: BTreeMap<ParameterName, QueryParameter>,
    bindings: BTreeMap<ParameterName, QueryParameterBinding>,
}

impl QueryParameterBindings {
    pub fn new(parameters: &[QueryParameter]) -> Self {
        Self {
            parameters: parameters
                .iter()
                .map(|p| (p.name.clone(), p.clone()))
                .collect(),
            bindings: BTreeMap::new(),
        }
    }

    fn parameter(&self, name: &ParameterName) -> QueryResult<&QueryParameter> {
        self.parameters
            .get(name)
            .ok_or_else(|| QueryError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn bind(
        &mut self,
        name: impl Into<ParameterName>,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        let name = name.into();
        let bind_type = self.parameter(&name)?.bind_type();
        self.store(name, BindValue::Single(value.into()), bind_type)
    }

    /// Bind with an explicit type, overriding the anticipated one.
    pub fn bind_with_type(
        &mut self,
        name: impl Into<ParameterName>,
        value: impl Into<Value>,
        bind_type: BasicType,
    ) -> QueryResult<&mut Self> {
        let name = name.into();
        self.parameter(&name)?;
        self.store(name, BindValue::Single(value.into()), Some(bind_type))
    }

    pub fn bind_multi<I, V>(
        &mut self,
        name: impl Into<ParameterName>,
        values: I,
    ) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let parameter = self.parameter(&name)?;
        if !parameter.allows_multi_valued {
            return Err(QueryError::InvalidBinding {
                name: name.to_string(),
                reason: "parameter does not allow multi-valued binding".into(),
            });
        }
        let bind_type = parameter.bind_type();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(QueryError::InvalidBinding {
                name: name.to_string(),
                reason: "multi-valued binding needs at least one value".into(),
            });
        }
        self.store(name, BindValue::Multi(values), bind_type)
    }

    /// Permit [`bind_multi`](Self::bind_multi) for `name`.
    pub fn allow_multi_valued(&mut self, name: impl Into<ParameterName>) -> QueryResult<&mut Self> {
        let name = name.into();
        match self.parameters.get_mut(&name) {
            Some(parameter) => {
                parameter.allows_multi_valued = true;
                Ok(self)
            }
            None => Err(QueryError::UnknownParameter {
                name: name.to_string(),
            }),
        }
    }

    fn store(
        &mut self,
        name: ParameterName,
        value: BindValue,
        bind_type: Option<BasicType>,
    ) -> QueryResult<&mut Self> {
        if let Some(ty) = bind_type {
            let values = match &value {
                BindValue::Single(v) => std::slice::from_ref(v),
                BindValue::Multi(vs) => vs.as_slice(),
            };
            let family = ty.value_type.family();
            if let Some(bad) = values.iter().find(|v| !v.is_compatible_with(family)) {
                return Err(QueryError::InvalidBinding {
                    name: name.to_string(),
                    reason: format!(
                        "{} value {} cannot be bound as {}",
                        bad.type_name(),
                        bad,
                        ty.value_type
                    ),
                });
            }
        }
        self.bindings
            .insert(name, QueryParameterBinding { value, bind_type });
        Ok(self)
    }

    pub fn binding(&self, name: &ParameterName) -> Option<&QueryParameterBinding> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &ParameterName) -> bool {
        self.bindings.contains_key(name)
    }

    /// Declared parameters, in name order.
    pub fn parameters(&self) -> impl Iterator<Item = &QueryParameter> {
        self.parameters.values()
    }

    /// First declared parameter without a value.
    pub fn first_unbound(&self) -> Option<&ParameterName> {
        self.parameters.keys().find(|name| !self.is_bound(name))
    }

    /// Marker counts for multi-valued bindings, used when rendering.
    pub fn expansions(&self) -> ParameterExpansions {
        self.bindings
            .iter()
            .filter_map(|(name, binding)| match &binding.value {
                BindValue::Multi(values) => Some((name.clone(), values.len())),
                BindValue::Single(_) => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
