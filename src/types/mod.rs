mod connection_parameters;
mod parameters;
mod row;
mod sql_value;

pub use connection_parameters::ConnectionParameters;
pub use parameters::{BoundParameter, NativeType, ParameterContainer, ParameterType, Parameters};
pub use row::Row;
pub use sql_value::SqlValue;
