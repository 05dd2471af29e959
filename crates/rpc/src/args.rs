//! The argument array of one call.
//!
//! The binder fills an [`Args`] from the request, plugins may rewrite it during
//! `modify_call`, and the handler finally consumes it.

use crate::error::RpcError;
use crate::extract::FromParam;
use crate::route::ParamSpec;
use crate::value::ParamValue;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Opaque per-request object supplied by the transport (a connection, a header map, ...).
pub type TransportHandle = Rc<dyn Any>;

pub struct Args {
    specs: Arc<[ParamSpec]>,
    values: Vec<ParamValue>,
    transport: Option<TransportHandle>,
}

impl Args {
    /// `values` must line up with `specs`; missing trailing values are filled with `Null`.
    pub fn new(specs: Arc<[ParamSpec]>, mut values: Vec<ParamValue>, transport: Option<TransportHandle>) -> Self {
        values.resize(specs.len(), ParamValue::Null);
        Self { specs, values, transport }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name() == name)
    }

    pub fn by_name(&self, name: &str) -> Option<&ParamValue> {
        self.index_of(name).map(|index| &self.values[index])
    }

    /// Reads the named argument as `T`.
    pub fn value<T: FromParam>(&self, name: &str) -> Result<T, RpcError> {
        let index = self.index_of(name).ok_or_else(|| RpcError::internal(format!("no parameter named '{name}'")))?;
        T::from_param(&self.specs[index], &self.values[index])
    }

    /// Overwrites the slot at `index`; returns the previous value.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<ParamValue>) -> ParamValue {
        std::mem::replace(&mut self.values[index], value.into())
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<ParamValue, RpcError> {
        let index = self.index_of(name).ok_or_else(|| RpcError::internal(format!("no parameter named '{name}'")))?;
        Ok(self.set(index, value))
    }

    pub fn transport<T: 'static>(&self) -> Option<&T> {
        self.transport.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (spec, value) in self.specs.iter().zip(&self.values) {
            map.entry(&spec.name(), value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamType;

    fn args() -> Args {
        let specs: Arc<[ParamSpec]> =
            vec![ParamSpec::path("id", ParamType::Int), ParamSpec::injected("user", ParamType::String)].into();
        Args::new(specs, vec![ParamValue::Int(3)], Some(Rc::new("conn-1")))
    }

    #[test]
    fn pads_missing_values() {
        let args = args();
        assert_eq!(args.len(), 2);
        assert_eq!(args.by_name("user"), Some(&ParamValue::Null));
    }

    #[test]
    fn typed_access() {
        let mut args = args();
        assert_eq!(args.value::<i32>("id"), Ok(3));
        assert_eq!(args.value::<Option<String>>("user"), Ok(None));

        args.set_by_name("user", "alice").unwrap();
        assert_eq!(args.value::<String>("user").as_deref(), Ok("alice"));
        assert!(args.value::<i32>("nope").is_err());
    }

    #[test]
    fn transport_handle() {
        let args = args();
        assert_eq!(args.transport::<&str>(), Some(&"conn-1"));
        assert_eq!(args.transport::<u32>(), None);
    }
}
