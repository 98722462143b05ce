//! Per-invocation context handed to every provider call.

use tracing::{Span, info_span};

use crate::config::Config;

/// Immutable binding of one [`Config`] to the provider calls of a command.
///
/// The context captures a tracing span at construction, so a context must be
/// rebuilt whenever its configuration is replaced (for example after merging
/// a package manifest).
#[derive(Clone, Debug)]
pub struct Context {
    config: Config,
    span: Span,
}

impl Context {
    /// Binds `config` to a new context.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let span = info_span!(
            "image",
            platform = %config.cloud_config.platform,
            image = %config.cloud_config.image_name,
        );
        Self { config, span }
    }

    /// Configuration this context was built from.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Span grouping log events emitted on behalf of this context.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }
}
