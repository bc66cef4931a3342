mod optimize;
mod sprite;

pub use optimize::*;
pub use sprite::*;
