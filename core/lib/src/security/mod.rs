//! Cross-origin protection: the decision engine behind every remote call.

pub mod group;
pub mod guard;
pub mod mode;
pub mod request;
pub mod token_kind;
pub mod ua;

pub use group::{AllowedOrigins, SecurityGroupId, SecurityGroupOptions, SecurityGroupRegistry};
pub use guard::{decide, Decision, MethodFacts};
pub use mode::ProtectionMode;
pub use request::SecurityPropertiesOfHttpRequest;
