use crate::extract::{DefaultParser, PrimitiveParser, SourceKind};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Per-dispatcher settings.
///
/// Can be assembled with [`DispatchConfig::builder`] or deserialized, e.g. from JSON:
///
/// ```
/// use micro_rpc::DispatchConfig;
/// use micro_rpc::extract::SourceKind;
///
/// let config: DispatchConfig = serde_json::from_str(r#"{ "source_order": ["json", "query"] }"#).unwrap();
/// assert_eq!(config.source_order(), &[SourceKind::Json, SourceKind::Query]);
/// assert_eq!(config.default_version(), u32::MAX);
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    source_order: Vec<SourceKind>,
    default_version: u32,
    #[serde(skip, default = "default_parser")]
    parser: Arc<dyn PrimitiveParser>,
}

fn default_parser() -> Arc<dyn PrimitiveParser> {
    Arc::new(DefaultParser)
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            source_order: vec![SourceKind::Query, SourceKind::Form, SourceKind::Json],
            default_version: u32::MAX,
            parser: default_parser(),
        }
    }
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder { config: Self::default() }
    }

    /// Query parameter sources, highest precedence first.
    pub fn source_order(&self) -> &[SourceKind] {
        &self.source_order
    }

    /// Version requested when the transport does not name one; the default picks the newest
    /// registered route.
    pub fn default_version(&self) -> u32 {
        self.default_version
    }

    pub fn parser(&self) -> &dyn PrimitiveParser {
        self.parser.as_ref()
    }
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("source_order", &self.source_order)
            .field("default_version", &self.default_version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    pub fn source_order(mut self, order: impl IntoIterator<Item = SourceKind>) -> Self {
        self.config.source_order = order.into_iter().collect();
        self
    }

    pub fn default_version(mut self, version: u32) -> Self {
        self.config.default_version = version;
        self
    }

    pub fn parser(mut self, parser: impl PrimitiveParser + 'static) -> Self {
        self.config.parser = Arc::new(parser);
        self
    }

    pub fn build(self) -> DispatchConfig {
        self.config
    }
}
