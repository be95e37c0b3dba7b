//! Built-in vendor platforms.

pub mod cisco_ios;
pub mod cisco_nxos;
pub mod cisco_xr;
pub mod linux;
