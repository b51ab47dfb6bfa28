#![deny(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![deny(clippy::style)]
#![deny(clippy::print_stdout)]
#![deny(clippy::cast_lossless)]

pub mod config;
pub mod devices;
pub mod effect;
pub mod event_loop;
pub mod frame;
pub mod led;
pub mod pixel_buffer;
pub mod simulation;
pub mod state;
pub mod strip;
pub mod watcher;
pub mod world;
