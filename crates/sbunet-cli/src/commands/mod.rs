pub mod decompose;
