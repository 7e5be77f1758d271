//! Runtime - 공유 실행 자원

mod pool;

pub use pool::WorkerPool;
