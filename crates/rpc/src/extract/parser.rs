use crate::value::{ParamType, ParamValue};

/// Converts raw parameter text into a typed value.
///
/// Transports may supply their own parser; [`DefaultParser`] covers the usual textual forms.
/// Returning `None` makes the binder fail the call with
/// [`RpcError::InvalidState`](crate::RpcError::InvalidState).
#[cfg_attr(test, mockall::automock)]
pub trait PrimitiveParser: Send + Sync {
    fn parse(&self, ty: ParamType, raw: &str) -> Option<ParamValue>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl PrimitiveParser for DefaultParser {
    fn parse(&self, ty: ParamType, raw: &str) -> Option<ParamValue> {
        let trimmed = raw.trim();
        match ty {
            ParamType::Int => trimmed.parse().ok().map(ParamValue::Int),
            ParamType::Long => trimmed.parse().ok().map(ParamValue::Long),
            ParamType::Float => trimmed.parse().ok().map(ParamValue::Float),
            ParamType::Bool if trimmed.eq_ignore_ascii_case("true") => Some(ParamValue::Bool(true)),
            ParamType::Bool if trimmed.eq_ignore_ascii_case("false") => Some(ParamValue::Bool(false)),
            ParamType::Bool => None,
            ParamType::String => Some(ParamValue::String(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars() {
        let parser = DefaultParser;
        assert_eq!(parser.parse(ParamType::Int, "42"), Some(ParamValue::Int(42)));
        assert_eq!(parser.parse(ParamType::Int, "4294967296"), None);
        assert_eq!(parser.parse(ParamType::Long, "4294967296"), Some(ParamValue::Long(4_294_967_296)));
        assert_eq!(parser.parse(ParamType::Float, "1.5"), Some(ParamValue::Float(1.5)));
        assert_eq!(parser.parse(ParamType::Bool, "TRUE"), Some(ParamValue::Bool(true)));
        assert_eq!(parser.parse(ParamType::Bool, "yes"), None);
        assert_eq!(parser.parse(ParamType::String, " abc"), Some(ParamValue::String(" abc".into())));
        assert_eq!(parser.parse(ParamType::Int, " 7 "), Some(ParamValue::Int(7)));
        assert_eq!(parser.parse(ParamType::Int, "abc"), None);
    }
}
