// Adapters layer: storage backends beyond the local directory in config::cli.

pub mod memory;

pub use memory::MemoryStorage;
