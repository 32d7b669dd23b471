pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::*;
pub use middleware::*;
pub use password::*;
