//! `gatekeeper-auth`: token authentication and declarative authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: it signs and
//! verifies tokens, carries the request's identity, and decides whether an
//! identity may reach a protected operation. Transports live in `gatekeeper-api`.

pub mod authority;
pub mod claims;
pub mod context;
pub mod identity;
pub mod lookup;
pub mod pattern;
pub mod policy;
pub mod registry;
pub mod template;
pub mod token;

pub use authority::{Authority, AuthoritySet};
pub use claims::{Claims, RESERVED_CLAIMS, extract_subject, validate_claims};
pub use context::{IdentityContext, KEY_ACCOUNT, KEY_SUBJECT, KEY_USER_ID, KEY_USER_NAME};
pub use identity::Identity;
pub use lookup::{IdentityLookup, LookupError, StaticIdentityLookup, lookup_with_timeout};
pub use pattern::{PathMatcher, PathPattern};
pub use policy::{AuthorizationPolicy, Decision, DenyReason};
pub use registry::{OperationPolicy, OperationRegistry, PermissionRequirement};
pub use template::{TemplateField, TemplateValues, render as render_template};
pub use token::{Hs256Signer, TokenCodec, TokenError, TokenSigner};
