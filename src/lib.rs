// Library exports shared by the binaries and integration tests
pub mod artifact;
pub mod build_phase;
pub mod config;
pub mod constants;
pub mod edit;
pub mod error;
pub mod icon;
pub mod lexer;
pub mod logging;
pub mod object_id;
pub mod parser;
pub mod patch;
pub mod project;
pub mod removal;
pub mod settings;
pub mod store;
pub mod verify;
