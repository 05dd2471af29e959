use crate::error::RpcError;
use crate::route::ParamSpec;
use crate::value::{ParamType, ParamValue};

/// Reads a typed value out of one bound argument.
///
/// The binder has already checked the value against the declared [`ParamType`], so a
/// mismatch here is a wiring bug between route and handler and reported as
/// [`RpcError::Internal`].
pub trait FromParam: Sized {
    /// Whether a parameter declared as `ty` can be read as `Self`.
    fn accepts(ty: ParamType) -> bool;

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError>;
}

fn mismatch(spec: &ParamSpec, expected: &str, value: &ParamValue) -> RpcError {
    RpcError::internal(format!("parameter '{}' expected {expected}, got {value:?}", spec.name()))
}

impl FromParam for i32 {
    fn accepts(ty: ParamType) -> bool {
        ty == ParamType::Int
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::Int(v) => Ok(*v),
            other => Err(mismatch(spec, "int", other)),
        }
    }
}

impl FromParam for i64 {
    fn accepts(ty: ParamType) -> bool {
        matches!(ty, ParamType::Long | ParamType::Int)
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::Long(v) => Ok(*v),
            ParamValue::Int(v) => Ok(i64::from(*v)),
            other => Err(mismatch(spec, "long", other)),
        }
    }
}

impl FromParam for f64 {
    fn accepts(ty: ParamType) -> bool {
        matches!(ty, ParamType::Float | ParamType::Int)
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(f64::from(*v)),
            other => Err(mismatch(spec, "float", other)),
        }
    }
}

impl FromParam for bool {
    fn accepts(ty: ParamType) -> bool {
        ty == ParamType::Bool
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(mismatch(spec, "boolean", other)),
        }
    }
}

impl FromParam for String {
    fn accepts(ty: ParamType) -> bool {
        ty == ParamType::String
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::String(v) => Ok(v.clone()),
            other => Err(mismatch(spec, "string", other)),
        }
    }
}

impl FromParam for ParamValue {
    fn accepts(_ty: ParamType) -> bool {
        true
    }

    fn from_param(_spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        Ok(value.clone())
    }
}

/// `None` for `Null`, otherwise the inner conversion.
impl<T: FromParam> FromParam for Option<T> {
    fn accepts(ty: ParamType) -> bool {
        T::accepts(ty)
    }

    fn from_param(spec: &ParamSpec, value: &ParamValue) -> Result<Self, RpcError> {
        match value {
            ParamValue::Null => Ok(None),
            other => T::from_param(spec, other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversions() {
        let spec = ParamSpec::query("n", ParamType::Int);
        assert_eq!(i32::from_param(&spec, &ParamValue::Int(3)), Ok(3));
        assert_eq!(i64::from_param(&spec, &ParamValue::Int(3)), Ok(3));
        assert_eq!(f64::from_param(&spec, &ParamValue::Int(3)), Ok(3.0));
        assert_eq!(Option::<i32>::from_param(&spec, &ParamValue::Null), Ok(None));
        assert_eq!(Option::<i32>::from_param(&spec, &ParamValue::Int(1)), Ok(Some(1)));
    }

    #[test]
    fn mismatch_names_parameter() {
        let spec = ParamSpec::query("flag", ParamType::Bool);
        let err = bool::from_param(&spec, &ParamValue::Int(1)).unwrap_err();
        assert_eq!(err, RpcError::internal("parameter 'flag' expected boolean, got Int(1)"));
        assert!(!err.is_expected());
    }

    #[test]
    fn accepted_declarations() {
        assert!(i32::accepts(ParamType::Int));
        assert!(!i32::accepts(ParamType::Long));
        assert!(i64::accepts(ParamType::Int));
        assert!(f64::accepts(ParamType::Int));
        assert!(!String::accepts(ParamType::Bool));
        assert!(Option::<bool>::accepts(ParamType::Bool));
        assert!(ParamValue::accepts(ParamType::Float));
    }
}
