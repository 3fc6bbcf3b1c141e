pub mod codec;
pub mod registry;
pub mod container;
pub mod block;
pub mod pool;
pub mod parallel;
pub mod api;

pub use codec::{AlgorithmId, Codec, CodecError, Result};
pub use container::{pack, unpack, Container};
pub use parallel::{parallel_compress, parallel_decompress, ParallelCompressor, ParallelOptions};
pub use pool::{TaskHandle, ThreadPool};
pub use registry::{AlgorithmCategory, AlgorithmInfo};
