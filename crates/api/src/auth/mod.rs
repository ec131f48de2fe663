//! Token handling. Login (finding a journalist by course and display name)
//! lives in another service that signs tokens with the same secret.

pub mod jwt;
