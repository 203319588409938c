mod postgres_wire;
mod tokio_postgres;

pub use self::in_memory_test::{
    InMemoryNativeClient, InMemoryResponse, InMemoryResponseBuilder, NativeCall,
};
pub use self::tokio_postgres::TokioPostgresClient;
