#![cfg_attr(not(test), no_std)]
pub mod boot;
pub mod bus;
pub mod card;
pub mod config;
pub mod console;
pub mod fs;
pub mod logger;
pub mod soc;
#[cfg(test)]
mod testing;
