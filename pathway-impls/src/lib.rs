mod liveblocks;
mod openai;
mod stripe;

pub use liveblocks::*;
pub use openai::*;
pub use stripe::*;
