pub mod rhna;
pub mod sources;
