// Copyright 2025 Cowboy AI, LLC.

//! Members: the values a class template or an instance carries
//!
//! A member is either plain data (a JSON value) or a method. Methods are
//! shared closures; cloning a [`Method`] shares the same function, which is
//! what lets a method keep its identity when it is copied down a hierarchy.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::dispatch::Call;
use crate::errors::ClassResult;

type MethodFn = dyn Fn(&mut Call<'_>) -> ClassResult<Value>;

/// A callable member
///
/// # Example
///
/// ```
/// use cim_class::Method;
/// use serde_json::Value;
///
/// let speak = Method::new(|_call| Ok(Value::from("woof")));
/// let copy = speak.clone();
/// assert!(speak.ptr_eq(&copy));
/// ```
#[derive(Clone)]
pub struct Method {
    body: Rc<MethodFn>,
}

impl Method {
    /// Wrap a closure as a method
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> ClassResult<Value> + 'static,
    {
        Self {
            body: Rc::new(body),
        }
    }

    /// Whether both handles point at the same function
    pub fn ptr_eq(&self, other: &Method) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    pub(crate) fn invoke(&self, call: &mut Call<'_>) -> ClassResult<Value> {
        (self.body)(call)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({:p})", Rc::as_ptr(&self.body) as *const ())
    }
}

/// A named slot on a class template, a class, or an instance
#[derive(Debug, Clone)]
pub enum Member {
    /// Plain data
    Data(Value),
    /// Callable member
    Method(Method),
}

impl Member {
    /// Check if this member can be invoked
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    /// Borrow the method, if this is one
    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Member::Method(method) => Some(method),
            Member::Data(_) => None,
        }
    }

    /// Borrow the data, if this is data
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Member::Data(value) => Some(value),
            Member::Method(_) => None,
        }
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Data(value)
    }
}

impl From<Method> for Member {
    fn from(method: Method) -> Self {
        Member::Method(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_identity() {
        let a = Method::new(|_| Ok(Value::Null));
        let b = Method::new(|_| Ok(Value::Null));
        let a2 = a.clone();

        assert!(a.ptr_eq(&a2));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_member_accessors() {
        let data: Member = json!({"legs": 4}).into();
        assert!(!data.is_method());
        assert_eq!(data.as_data(), Some(&json!({"legs": 4})));
        assert!(data.as_method().is_none());

        let method: Member = Method::new(|_| Ok(Value::Null)).into();
        assert!(method.is_method());
        assert!(method.as_data().is_none());
        assert!(method.as_method().is_some());
    }

    #[test]
    fn test_method_debug_is_pointer() {
        let method = Method::new(|_| Ok(Value::Null));
        assert!(format!("{:?}", method).starts_with("Method(0x"));
    }
}
