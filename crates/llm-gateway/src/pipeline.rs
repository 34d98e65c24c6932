//! Ordered request processing stages
//!
//! Every request is normalized and then authenticated before routing. The
//! order is fixed by [`Pipeline::new`].

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{AuthFailure, AuthGate};
use crate::normalize::UrlNormalizer;

/// One step applied to an inbound request
#[derive(Debug, Clone)]
pub enum Stage {
    Normalize(UrlNormalizer),
    Authenticate(Arc<AuthGate>),
}

impl Stage {
    async fn apply(&self, mut request: Request) -> Result<Request, AuthFailure> {
        match self {
            Self::Normalize(normalizer) => {
                normalizer.apply(&mut request);
                Ok(request)
            }
            Self::Authenticate(gate) => {
                gate.authenticate(&mut request).await?;
                Ok(request)
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Normalize(_) => "normalize",
            Self::Authenticate(_) => "authenticate",
        }
    }
}

/// Stages run in order; the first failure ends the request
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Arc<[Stage]>,
}

impl Pipeline {
    /// Normalize the target, then authenticate
    #[must_use]
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self {
            stages: Arc::from([
                Stage::Normalize(UrlNormalizer::new()),
                Stage::Authenticate(gate),
            ]),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub async fn run(&self, mut request: Request) -> Result<Request, AuthFailure> {
        for stage in self.stages.iter() {
            request = stage.apply(request).await?;
        }
        Ok(request)
    }
}

/// axum middleware running the pipeline ahead of routing
pub async fn run_pipeline(State(pipeline): State<Pipeline>, request: Request, next: Next) -> Response {
    match pipeline.run(request).await {
        Ok(request) => next.run(request).await,
        Err(failure) => failure.into_response(),
    }
}
