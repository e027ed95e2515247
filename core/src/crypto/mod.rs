pub mod aad;
pub mod aead;
pub mod digest;
pub mod envelope;
pub mod kdf;
pub mod nonce;
pub mod types;

pub use aad::*;
pub use aead::*;
pub use digest::*;
pub use envelope::*;
pub use kdf::*;
pub use nonce::*;
pub use types::*;
