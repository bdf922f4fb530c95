//! CLI Commands

pub mod pages;
pub mod render;
pub mod run;
