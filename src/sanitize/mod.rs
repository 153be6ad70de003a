//! Input sanitization.
//!
//! # Data Flow
//! ```text
//! RequestContext (query, body parsed)
//!     → nosql.rs (drop `$`-prefixed and dotted keys)
//!     → xss.rs (escape `<` in keys and strings)
//!     → pollution.rs (collapse repeated parameters)
//!     → handler-set
//! ```
//!
//! # Design Decisions
//! - Passes run in a fixed order over the already-parsed context
//! - Pollution filtering applies to the query and to form bodies; JSON
//!   arrays are data, not repeated parameters
//! - Path parameters do not exist before dispatch, so they are not covered

pub mod nosql;
pub mod pollution;
pub mod xss;

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::config::SanitizeConfig;
use crate::error::ApiError;
use crate::http::context::{BodyKind, RequestContext};
use crate::http::server::AppState;

/// Sanitization settings resolved at startup.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    allow_list: HashSet<String>,
}

impl Sanitizer {
    pub fn new(config: &SanitizeConfig) -> Self {
        Self {
            allow_list: config.allow_list.iter().cloned().collect(),
        }
    }

    /// Run every pass over the context.
    pub fn apply(&self, ctx: &mut RequestContext) {
        let removed = nosql::strip_operator_keys(&mut ctx.query) + nosql::strip_operators(&mut ctx.body);
        if removed > 0 {
            tracing::warn!(
                client = %ctx.client_key(),
                path = %ctx.path,
                removed,
                "Removed operator keys from request input"
            );
        }

        xss::escape_map(&mut ctx.query);
        xss::escape_markup(&mut ctx.body);

        ctx.query_polluted = pollution::collapse(&mut ctx.query, &self.allow_list);
        if ctx.body_kind == BodyKind::Form {
            if let Value::Object(body) = &mut ctx.body {
                ctx.body_polluted = pollution::collapse(body, &self.allow_list);
            }
        }
    }
}

/// Middleware: sanitize the request context in place.
pub async fn sanitize_input(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let ctx = request
        .extensions_mut()
        .get_mut::<RequestContext>()
        .ok_or_else(|| ApiError::internal("request context missing at sanitization"))?;
    state.sanitizer.apply(ctx);

    Ok(next.run(request).await)
}
