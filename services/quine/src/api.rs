//! API server builder and router

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::RegistryState;

/// Registry builder for creating the registry service
#[derive(Debug)]
pub struct RegistryBuilder {
    state: RegistryState,
    trace: bool,
}

impl RegistryBuilder {
    /// Create a new registry builder serving `state`
    pub fn new(state: impl Into<RegistryState>) -> Self {
        Self {
            state: state.into(),
            trace: true,
        }
    }

    /// Enable or disable per-request trace logging (enabled by default)
    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Build the registry service
    ///
    /// Returns a Router that can be served with any tower-compatible server
    pub fn build(self) -> Router {
        let router = Router::new()
            .route("/v2/", get(api_version_check))
            .merge(crate::blob::router())
            .merge(crate::manifest::router())
            .with_state(self.state);

        if self.trace {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        }
    }
}

/// Build the registry router with default settings
pub fn router(state: impl Into<RegistryState>) -> Router {
    RegistryBuilder::new(state).build()
}

/// API version check endpoint
///
/// Returns 200 OK with an empty body to indicate the registry speaks v2
async fn api_version_check() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ArtifactBuilder;

    #[test]
    fn test_builder() {
        let artifacts = ArtifactBuilder::from_bytes(&b"payload"[..]).build().unwrap();
        let _registry = RegistryBuilder::new(artifacts).trace(false).build();
    }
}
