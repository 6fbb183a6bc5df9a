pub mod authenticator;
pub mod context;
pub mod error;
pub mod factory;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod token_codec;
pub mod token_issuer;
pub mod token_service;
pub mod token_validator;

pub use context::SecurityContext;
pub use error::AuthError;
pub use factory::{AuthComponents, build_auth_components};
pub use principal::Principal;
pub use token_service::{IssuedTokenPair, TokenService};
pub use token_validator::{TokenValidator, ValidationOutcome};
