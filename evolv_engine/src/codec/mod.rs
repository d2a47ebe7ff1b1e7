//! Schema-driven encode and decode of whole messages.
//!
//! A message is the body of a declared struct or choice: no header and no length prefix.
//! Its extent is the buffer it is read from.

use crate::atlas::{self, PlanningError, SizePlan};
use crate::config::DecodeLimits;
use anyhow::{anyhow, Result};
use evolv_types::schema::{Schema, TypeDecl, TypeId};
use evolv_types::serde::DecodeError;
use evolv_types::value::Value;

mod array_codec;
mod choice_codec;
mod reader;
mod struct_codec;
mod writer;


use reader::Decoder;
use writer::Writer;

/// Encodes and decodes messages of one declared type, under one schema version.
///
/// Holds no state between calls; share it freely across threads.
#[derive(Clone, Copy, Debug)]
pub struct Codec<'s> {
    schema: &'s Schema,
    type_id: TypeId,
    limits: DecodeLimits,
}

impl<'s> Codec<'s> {
    pub fn new(schema: &'s Schema, type_id: TypeId) -> Result<Self> {
        schema
            .decl(type_id)
            .ok_or(anyhow!("No declaration for {type_id:?}"))?;
        Ok(Self {
            schema,
            type_id,
            limits: DecodeLimits::default(),
        })
    }

    pub fn by_name(schema: &'s Schema, name: &str) -> Result<Self> {
        let (type_id, _) = schema
            .type_by_name(name)
            .ok_or(anyhow!("No declaration named {name}"))?;
        Self::new(schema, type_id)
    }

    pub fn with_limits(self, limits: DecodeLimits) -> Self {
        Self { limits, ..self }
    }

    pub fn type_decl(&self) -> &'s TypeDecl {
        self.schema.resolve(self.type_id)
    }

    pub fn plan(&self, value: &Value) -> Result<SizePlan, PlanningError> {
        atlas::plan(self.schema, self.type_id, value, &self.limits)
    }

    /// Writes `value` at `offset` following `plan`, and returns the offset just past it.
    pub fn write(
        &self,
        buf: &mut [u8],
        offset: usize,
        value: &Value,
        plan: &SizePlan,
    ) -> Result<usize, PlanningError> {
        let end = Writer::new(plan.cursor(), buf, offset)?.write_message(value)?;
        Ok(*end)
    }

    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, PlanningError> {
        let plan = self.plan(value)?;
        let mut buf = vec![0u8; plan.total_size()];
        self.write(&mut buf, 0, value, &plan)?;
        Ok(buf)
    }

    pub fn deserialize(&self, buf: &[u8]) -> Result<Value, DecodeError> {
        let decoder = Decoder {
            schema: self.schema,
            limits: self.limits,
        };
        decoder.decode_message(self.type_id, buf)
    }
}
