#![forbid(unsafe_code)]

pub mod app;
pub mod audio;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod document;
pub mod generator;
pub mod logging;
pub mod mindmap;
pub mod profile;
pub mod schema;
pub mod settings;
pub mod verify;
