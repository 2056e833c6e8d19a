pub mod client;
pub mod graphson;

pub use client::{
    connect,
    release,
    Account,
    Credentials,
    HttpTraversalConnection,
    HttpTraversalConnector,
    TraversalConnection,
    TraversalConnector,
};
