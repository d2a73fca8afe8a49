// src/checker/mod.rs
// =============================================================================
// URL health checking.
//
// Submodules:
// - gate: the admission gate bounding in-flight requests
// - http: fetches one URL and classifies the outcome
// - html: title / h1 / description fingerprint of a page
//
// This file (mod.rs) is the module root - it re-exports the public API so
// callers write `checker::check_url()` instead of `checker::http::check_url()`.
// =============================================================================

mod gate;
mod html;
mod http;

pub use gate::AdmissionGate;
pub use http::{build_client, check_url, UrlCheck};
