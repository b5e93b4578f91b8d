#![doc = include_str!("../README.md")]

pub mod app;
pub mod controllers;
mod handlers;
pub mod tracing;
