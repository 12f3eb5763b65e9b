pub mod listen;
pub mod refresh;
