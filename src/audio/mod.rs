pub mod chunk;
pub mod wav;

pub use chunk::{ ChunkError, ChunkReassembler };
pub use wav::{ AudioBuffer, AudioError };
