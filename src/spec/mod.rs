//! # Specification Model
//!
//! The canonical in-memory description of an API: endpoints, the target
//! framework / database / authentication choice, and the validation rules
//! every specification must satisfy before it is synthesized.
//!
//! The serde representation is the persisted format shared with stored
//! example specifications:
//!
//! ```json
//! {
//!   "name": "User Management API",
//!   "description": "Registration, login and profiles",
//!   "version": "1.0.0",
//!   "framework": "fastapi",
//!   "database": "postgresql",
//!   "auth_method": "jwt",
//!   "endpoints": [
//!     {
//!       "path": "/api/users/{user_id}",
//!       "method": "GET",
//!       "description": "Fetch one user",
//!       "parameters": [{ "name": "user_id", "location": "path", "required": true }],
//!       "response_example": { "id": 1, "username": "testuser" }
//!     }
//!   ]
//! }
//! ```

mod load;
mod types;
mod validate;

pub use load::{load_spec, parse_spec, to_spec_string, SpecFormat};
pub use types::{
    ApiSpec, AuthMethod, Database, Endpoint, Framework, HttpMethod, Parameter, ParameterLocation,
};
pub use validate::{is_semver, path_placeholders, validate, SpecError};
