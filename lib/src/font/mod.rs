mod sfnt;
mod woff;
mod woff2;

pub mod face;

pub use sfnt::*;
pub use woff::*;
pub use woff2::*;
