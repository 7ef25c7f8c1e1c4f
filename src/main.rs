#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware;
#[cfg(target_os = "none")]
mod hardware;

// Host builds only exercise the library.
#[cfg(not(target_os = "none"))]
fn main() {}
