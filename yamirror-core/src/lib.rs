mod client;

pub use client::{
    ApiErrorClass, ClientTimeouts, Resource, ResourceList, ResourceType, TransferLink,
    YadiskClient, YadiskError, is_transport_error,
};
