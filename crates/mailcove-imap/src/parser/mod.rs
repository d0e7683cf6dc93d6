//! Sans-I/O response parser.
//!
//! A byte cursor drives recursive-descent parsing of complete responses;
//! nothing here touches the network, so everything is testable against
//! byte fixtures.

mod cursor;
mod data;
mod fetch;
mod response;

pub use data::{
    Address, BodyStructure, Envelope, FetchField, ListSource, QuotaResource, StatusItem,
    UntaggedResponse,
};
pub use response::{Response, ResponseParser};
