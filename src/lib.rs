// Library for tests to access modules

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod reporter;
pub mod sample_store;
pub mod sampler;
pub mod spc;
pub mod version;
pub mod worker;
