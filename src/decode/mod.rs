//! Payload decoding module
//!
//! Turns the self-describing K2 JSON payload into an explicit tagged tree.
//!
//! # Overview
//!
//! Every field value is classified exactly once, while decoding, by the
//! `__type` discriminator the API attaches to wrappers:
//!
//! - `DataObjectWrapper:K2.Data` - an embedded single object
//! - `ChildDataObjectWrapper:K2.Data` - a collection of child records
//! - anything else - a scalar (including plain JSON objects)

mod decoders;
mod types;

pub use decoders::{decode_data_object, K2JsonDecoder, PageDecoder};
pub use types::{
    DataObject, FieldNode, FieldValue, Page, CHILD_COLLECTION_TYPE, NESTED_OBJECT_TYPE,
};
