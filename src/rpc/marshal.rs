//! Argument marshalling.
//!
//! Converts the untyped JSON argument list of an inbound call into
//! [`CallArgument`]s. The wire format is self-describing: a JSON object whose
//! only key is a registered struct type name is a typed struct literal,
//!
//! ```text
//! [{"ncTGetInfoParam": {"docid": "gns://a", "attrs": [{"ncTAttr": {"k": 1}}, 2]}}, "opaque"]
//! ```
//!
//! and everything else travels as an opaque value.
//!
//! # Rules
//! - Top level: only single-key objects naming a registered type become
//!   structs. Other objects, plain arrays and scalars pass through untouched.
//! - Inside a struct's field map: nested struct literals recurse, arrays are
//!   converted element-wise, everything else passes through.
//! - Argument order and field order are kept exactly as received.

use serde_json::Value;
use std::sync::Arc;

use crate::rpc::error::MarshalError;
use crate::rpc::registry::{StructDescriptor, StructRegistry};

/// Ordered field map of a struct argument.
pub type Fields = Vec<(String, CallArgument)>;

/// A typed call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgument {
    /// Any JSON value passed through without registry resolution.
    Scalar(Value),
    /// An ordered list found inside a struct's field map.
    Sequence(Vec<CallArgument>),
    /// A struct of a registered type.
    Struct { type_name: String, fields: Fields },
}

impl CallArgument {
    pub fn is_struct(&self) -> bool {
        matches!(self, CallArgument::Struct { .. })
    }

    /// Look up a field of a struct argument.
    pub fn field(&self, name: &str) -> Option<&CallArgument> {
        match self {
            CallArgument::Struct { fields, .. } => {
                fields.iter().find(|(f, _)| f == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

/// Turns JSON argument lists into call arguments using a struct registry.
#[derive(Debug, Clone)]
pub struct Marshaller {
    registry: Arc<StructRegistry>,
}

impl Marshaller {
    pub fn new(registry: Arc<StructRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StructRegistry {
        &self.registry
    }

    /// Marshal a raw request body. An empty body means no arguments.
    pub fn marshal_body(&self, body: &[u8]) -> Result<Vec<CallArgument>, MarshalError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Value>(body)? {
            Value::Array(args) => self.marshal(&args),
            _ => Err(MarshalError::InvalidBody),
        }
    }

    /// Marshal a top-level argument list.
    pub fn marshal(&self, args: &[Value]) -> Result<Vec<CallArgument>, MarshalError> {
        args.iter()
            .map(|arg| match self.struct_literal(arg) {
                Some((descriptor, fields)) => self.build_struct(descriptor, fields),
                None => Ok(CallArgument::Scalar(arg.clone())),
            })
            .collect()
    }

    /// Match `{"<RegisteredType>": <fields>}`.
    fn struct_literal<'s, 'v>(&'s self, value: &'v Value) -> Option<(&'s StructDescriptor, &'v Value)> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let (type_name, fields) = object.iter().next()?;
        let descriptor = self.registry.resolve(type_name)?;
        Some((descriptor, fields))
    }

    fn build_struct(
        &self,
        descriptor: &StructDescriptor,
        fields: &Value,
    ) -> Result<CallArgument, MarshalError> {
        let object = fields
            .as_object()
            .ok_or_else(|| MarshalError::InvalidFields(descriptor.type_name().to_string()))?;

        let fields = object
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.marshal_field(value)?)))
            .collect::<Result<Fields, MarshalError>>()?;

        descriptor.build(fields)
    }

    fn marshal_field(&self, value: &Value) -> Result<CallArgument, MarshalError> {
        if let Some((descriptor, fields)) = self.struct_literal(value) {
            return self.build_struct(descriptor, fields);
        }
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.marshal_field(item))
                .collect::<Result<Vec<_>, _>>()
                .map(CallArgument::Sequence),
            other => Ok(CallArgument::Scalar(other.clone())),
        }
    }
}
