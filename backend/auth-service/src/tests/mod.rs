/// In-crate tests for the auth service core flows.
///
/// Everything runs against the in-memory store and user repository, so no
/// external services are required.
pub mod fixtures;
