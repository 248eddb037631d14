//! Bridge between a learning platform and a national course registry.
//!
//! The crate does three things:
//! 1. Assembles a canonical course record from the platform's catalog
//!    fields and the marked-up course "about" page ([`course`], [`extract`]).
//! 2. Forwards enrollment and grade lifecycle events to the registry as
//!    asynchronous background jobs ([`sync`]).
//! 3. Exposes a thin JSON API for the admin catalog UI ([`server`]).
//!
//! All registry and platform calls are stateless request/response with a
//! uniform 5-second timeout; transient failures degrade to "unavailable"
//! (`None`) instead of surfacing as errors.

pub mod config;
pub mod course;
pub mod extract;
pub mod platform;
pub mod registry;
pub mod server;
pub mod sync;
pub mod types;
