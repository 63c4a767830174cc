pub mod api_key;
pub mod jwt;
pub mod password;
pub mod service;

pub use jwt::{Claims, JwtService, TokenType};
pub use service::{AuthService, DefaultAuthService, IssuedApiKeyResult, LoginResult};
