pub mod discovery;
pub mod registry;
pub mod webhook;
