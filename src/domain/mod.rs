pub mod candidate;
pub mod position;
pub mod state;

pub use candidate::*;
pub use position::*;
pub use state::*;
