//! # Positional Arguments
//!
//! `IntoArgs` turns what a caller passes into the ordered list that goes on the
//! wire; `Args` is the same list as a method body sees it.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::method::MethodError;

/// Ordered arguments of a single call, as received by a method body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserializes the argument at `index`.
    ///
    /// A missing argument reads as `null`, so `Option<T>` accepts it and
    /// anything else reports it.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, MethodError> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| MethodError::new(format!("argument {}: {}", index, e)))
    }

    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Anything a caller can pass as the argument list of a call.
///
/// Implemented for `()`, raw `Vec<Value>`, `Args`, and tuples of up to
/// eight serializable values.
pub trait IntoArgs {
    fn into_args(self) -> serde_json::Result<Vec<Value>>;
}

impl IntoArgs for () {
    fn into_args(self) -> serde_json::Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl IntoArgs for Vec<Value> {
    fn into_args(self) -> serde_json::Result<Vec<Value>> {
        Ok(self)
    }
}

impl IntoArgs for Args {
    fn into_args(self) -> serde_json::Result<Vec<Value>> {
        Ok(self.0)
    }
}

macro_rules! impl_into_args_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Serialize),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> serde_json::Result<Vec<Value>> {
                let ($($name,)+) = self;
                Ok(vec![$(serde_json::to_value($name)?),+])
            }
        }
    };
}

impl_into_args_for_tuple!(A);
impl_into_args_for_tuple!(A, B);
impl_into_args_for_tuple!(A, B, C);
impl_into_args_for_tuple!(A, B, C, D);
impl_into_args_for_tuple!(A, B, C, D, E);
impl_into_args_for_tuple!(A, B, C, D, E, F);
impl_into_args_for_tuple!(A, B, C, D, E, F, G);
impl_into_args_for_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tuple_order_is_preserved() {
        let args = (1, "two", [3.0]).into_args().unwrap();
        assert_eq!(args, vec![json!(1), json!("two"), json!([3.0])]);
    }

    #[test]
    fn test_unit_is_no_args() {
        assert!(().into_args().unwrap().is_empty());
    }

    #[test]
    fn test_single_vec_argument_stays_one_argument() {
        let args = (vec![1, 2, 3],).into_args().unwrap();
        assert_eq!(args, vec![json!([1, 2, 3])]);
    }

    #[test]
    fn test_missing_argument_reads_as_null() {
        let args = Args::new(vec![json!(1)]);
        assert_eq!(args.get::<Option<i64>>(1).unwrap(), None);
        assert!(args.get::<i64>(1).is_err());
    }
}
