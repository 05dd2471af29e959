//! Parameter binding.
//!
//! Turns the path text captured by the router and the values found in the request's query
//! sources into the typed argument array of a route.
//!
//! - path captures are mapped to their declared parameter through the segment they matched,
//!   then parsed with the transport's [`PrimitiveParser`]
//! - query parameters come from the first [`SourceKind`] (in the configured order) that
//!   supplies a value; missing optional ones get their default
//! - injected parameters stay `Null` until a plugin writes them

mod extract_tuple;
mod from_param;
mod parser;
mod source;

pub use extract_tuple::FromArgs;
pub use from_param::FromParam;
pub use parser::{DefaultParser, PrimitiveParser};
pub use source::{QuerySources, RawValue, SourceKind};

#[cfg(test)]
pub(crate) use parser::MockPrimitiveParser;

use crate::error::RpcError;
use crate::route::{ParamSource, ParamSpec, PathSegment, Route};
use crate::router::Capture;
use crate::value::{ParamType, ParamValue};
use serde_json::Value;

/// Binds the arguments of `route` for one request.
pub fn bind(
    route: &Route,
    captures: &[Capture<'_>],
    sources: &QuerySources,
    order: &[SourceKind],
    parser: &dyn PrimitiveParser,
) -> Result<Vec<ParamValue>, RpcError> {
    let specs = route.params();
    let mut values = vec![ParamValue::Null; specs.len()];

    for capture in captures {
        let Some(PathSegment::Capture { param, .. }) = route.segments().get(capture.depth) else {
            return Err(RpcError::internal(format!(
                "route '{}' has no capture at depth {}",
                route.name(),
                capture.depth
            )));
        };
        let spec = &specs[*param];
        values[*param] = parser.parse(spec.param_type(), capture.text).ok_or_else(|| {
            RpcError::invalid_state(format!(
                "path parameter '{}' has invalid {} value '{}'",
                spec.name(),
                spec.param_type(),
                capture.text
            ))
        })?;
    }

    for (index, spec) in specs.iter().enumerate() {
        if spec.source() != ParamSource::Query {
            continue;
        }
        values[index] = match sources.lookup(order, spec.name_hash(), spec.name()) {
            Some((_, RawValue::Text(raw))) => parse_text(spec, raw, parser)?,
            Some((_, RawValue::Json(json))) => convert_json(spec, json, parser)?,
            None if spec.is_required() => return Err(missing(spec)),
            None => spec.default().clone(),
        };
    }

    Ok(values)
}

fn missing(spec: &ParamSpec) -> RpcError {
    RpcError::invalid_state(format!(
        "missing required parameter '{}' of type {}: {}",
        spec.name(),
        spec.param_type(),
        spec.description()
    ))
}

fn invalid(spec: &ParamSpec, raw: impl std::fmt::Display) -> RpcError {
    RpcError::invalid_state(format!("parameter '{}' has invalid {} value '{raw}'", spec.name(), spec.param_type()))
}

fn parse_text(spec: &ParamSpec, raw: &str, parser: &dyn PrimitiveParser) -> Result<ParamValue, RpcError> {
    parser.parse(spec.param_type(), raw).ok_or_else(|| invalid(spec, raw))
}

fn convert_json(spec: &ParamSpec, json: &Value, parser: &dyn PrimitiveParser) -> Result<ParamValue, RpcError> {
    if let Value::String(raw) = json {
        return parse_text(spec, raw, parser);
    }

    let value = match spec.param_type() {
        ParamType::Int => json.as_i64().and_then(|v| i32::try_from(v).ok()).map(ParamValue::Int),
        ParamType::Long => json.as_i64().map(ParamValue::Long),
        ParamType::Float => json.as_f64().map(ParamValue::Float),
        ParamType::Bool => json.as_bool().map(ParamValue::Bool),
        ParamType::String => match json {
            Value::Number(_) | Value::Bool(_) => Some(ParamValue::String(json.to_string())),
            _ => None,
        },
    };
    value.ok_or_else(|| invalid(spec, json))
}
