pub mod charts;
pub mod derived;
