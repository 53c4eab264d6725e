pub mod chirp;
pub mod multiply;
