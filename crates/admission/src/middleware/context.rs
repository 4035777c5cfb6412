//! Per-request attribute bag.

use crate::auth::Identity;
use crate::deadline::Deadline;
use axum::extract::Request;

/// What the pipeline knows about the current request.
///
/// Created by the request-identification stage and dropped with the request.
/// Handlers read it with `Extension<RequestContext>`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    identity: Option<Identity>,
    deadline: Option<Deadline>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            identity: None,
            deadline: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Authenticated caller, set only after the authentication stage passed.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn deadline(&self) -> Option<&Deadline> {
        self.deadline.as_ref()
    }
}

/// Update the request's context in place, creating one if an earlier stage
/// did not.
pub(crate) fn update_context(req: &mut Request, update: impl FnOnce(&mut RequestContext)) {
    let mut context = req
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_else(|| RequestContext::new(uuid::Uuid::new_v4().to_string()));
    update(&mut context);
    req.extensions_mut().insert(context);
}

pub(crate) fn set_identity(req: &mut Request, identity: Identity) {
    update_context(req, |context| context.identity = Some(identity));
}

pub(crate) fn set_deadline(req: &mut Request, deadline: Deadline) {
    update_context(req, |context| context.deadline = Some(deadline));
}
