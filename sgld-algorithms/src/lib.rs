pub mod sgld;
pub use sgld::Sgld;
