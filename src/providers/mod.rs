pub mod nbp;
pub mod util;

pub use nbp::NbpProvider;
