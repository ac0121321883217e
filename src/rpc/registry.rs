//! Struct registry.
//!
//! Maps an RPC struct type name to the constructor for its field set. The
//! registry is filled at startup and shared read-only (behind an `Arc`) with
//! the marshaller afterwards.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::StructConfig;
use crate::rpc::error::MarshalError;
use crate::rpc::marshal::{CallArgument, Fields};

/// Builds a validated field set for one struct type.
pub type StructConstructor = Arc<dyn Fn(Fields) -> Result<Fields, MarshalError> + Send + Sync>;

/// A registered struct type.
#[derive(Clone)]
pub struct StructDescriptor {
    type_name: String,
    constructor: StructConstructor,
}

impl StructDescriptor {
    /// Create a descriptor with a custom constructor.
    pub fn new<F>(type_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Fields) -> Result<Fields, MarshalError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            constructor: Arc::new(constructor),
        }
    }

    /// A struct type that accepts any field set.
    pub fn open(type_name: impl Into<String>) -> Self {
        Self::new(type_name, |fields| Ok(fields))
    }

    /// A struct type with a fixed set of field names.
    ///
    /// Unknown fields are rejected; missing fields stay absent.
    pub fn declared<I, S>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_name = type_name.into();
        let allowed: HashSet<String> = fields.into_iter().map(Into::into).collect();
        let name = type_name.clone();
        Self::new(type_name, move |fields: Fields| {
            if let Some((field, _)) = fields.iter().find(|(f, _)| !allowed.contains(f)) {
                return Err(MarshalError::UnknownField {
                    type_name: name.clone(),
                    field: field.clone(),
                });
            }
            Ok(fields)
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Run the constructor and wrap the result as a struct argument.
    pub fn build(&self, fields: Fields) -> Result<CallArgument, MarshalError> {
        let fields = (self.constructor)(fields)?;
        Ok(CallArgument::Struct {
            type_name: self.type_name.clone(),
            fields,
        })
    }
}

impl fmt::Debug for StructDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Lookup table of recognised struct types.
#[derive(Debug, Default)]
pub struct StructRegistry {
    types: HashMap<String, StructDescriptor>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[[rpc.structs]]` declarations.
    pub fn from_config(structs: &[StructConfig]) -> Result<Self, MarshalError> {
        let mut registry = Self::new();
        for decl in structs {
            let descriptor = if decl.fields.is_empty() {
                StructDescriptor::open(&decl.name)
            } else {
                StructDescriptor::declared(&decl.name, decl.fields.iter().cloned())
            };
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a struct type. Names must be unique.
    pub fn register(&mut self, descriptor: StructDescriptor) -> Result<(), MarshalError> {
        if self.types.contains_key(descriptor.type_name()) {
            return Err(MarshalError::DuplicateStructType(descriptor.type_name.clone()));
        }
        self.types.insert(descriptor.type_name.clone(), descriptor);
        Ok(())
    }

    pub fn resolve(&self, type_name: &str) -> Option<&StructDescriptor> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Construct a struct argument by type name.
    pub fn construct(&self, type_name: &str, fields: Fields) -> Result<CallArgument, MarshalError> {
        self.resolve(type_name)
            .ok_or_else(|| MarshalError::UnknownStructType(type_name.to_string()))?
            .build(fields)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
