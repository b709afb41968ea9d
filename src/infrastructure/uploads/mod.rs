mod imagekit;
mod signer;

pub use imagekit::*;
pub use signer::*;
