mod native;

pub use native::{
    ConnectTarget, ConnectionInfo, NativeClient, NativeConnection, NativeCursor, PreparedId,
    QueryOutcome,
};
