pub mod asym;
pub mod error;
pub mod hash;
pub mod keygen;
pub mod sym;

pub use asym::{asym_decrypt, asym_encrypt};
pub use error::CryptoError;
pub use hash::{hash, sym_key_from_seed};
pub use keygen::{
    generate_asymmetric_key, generate_symmetric_key, symmetric_key_from_seed, unwrap, wrap,
};
pub use sym::{sym_decrypt, sym_encrypt};
