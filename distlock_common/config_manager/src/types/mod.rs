pub mod context;

pub use context::CONFIG;
