pub mod documents;
pub mod liveness;
pub mod messages;
pub mod readiness;
