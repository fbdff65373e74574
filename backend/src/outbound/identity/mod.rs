//! Auth provider adapter verifying bearer tokens.

mod http_provider;

pub use http_provider::AuthHttpIdentityProvider;
