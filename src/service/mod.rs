pub mod editor;
pub mod export;
#[cfg(test)]
pub mod memory;
pub mod report;
pub mod store;
