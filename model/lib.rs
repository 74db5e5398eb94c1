#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod assess;
pub mod calculator;
pub mod coefficients;
pub mod config;
pub mod draws;
pub mod economics;
pub mod mrs;
pub mod scenario;
pub mod simulate;

pub use calculator::Calculator;
