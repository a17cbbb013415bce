pub mod password;
pub mod secret;

pub use password::{hash_password, verify_password, Password};
pub use secret::{digest, digest_eq, generate_secret};
