use crate::config::DecodeLimits;
use evolv_types::schema::{FieldType, Schema, TypeId, TypeKind};
use evolv_types::serde::{
    deser_prefixed, deser_utf8, BytesReader, DecodeError, ScalarPayload, SizeIndicator,
};
use evolv_types::value::Value;
use tracing::debug;

/// Reads bytes under the reader's own schema. Whatever the writer's schema was is
/// known only through what is on the wire.
pub(super) struct Decoder<'s> {
    pub(super) schema: &'s Schema,
    pub(super) limits: DecodeLimits,
}

impl<'s> Decoder<'s> {
    pub fn decode_message(&self, type_id: TypeId, buf: &[u8]) -> Result<Value, DecodeError> {
        self.decode_custom(type_id, BytesReader::new(buf), 0)
    }

    pub(super) fn descend(&self, depth: usize) -> Result<usize, DecodeError> {
        if depth >= self.limits.max_depth {
            debug!(max_depth = self.limits.max_depth, "decode nesting limit reached");
            return Err(DecodeError::NestingTooDeep {
                max: self.limits.max_depth,
            });
        }
        Ok(depth + 1)
    }

    /// Decodes the body of a struct or choice. `body` spans exactly that body.
    pub(super) fn decode_custom(
        &self,
        type_id: TypeId,
        body: BytesReader,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let decl = self.schema.resolve(type_id);
        let depth = self.descend(depth)?;
        match decl.kind {
            TypeKind::Struct => self.decode_struct(decl, body, depth).map(Value::Struct),
            TypeKind::Choice => self.decode_choice(decl, body, depth).map(Value::Choice),
        }
    }

    /// Decodes a field or variant payload framed by `indicator`.
    pub(super) fn decode_field(
        &self,
        ty: &FieldType,
        indicator: SizeIndicator,
        r: &mut BytesReader,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let value = match ty {
            FieldType::Unit => match indicator {
                SizeIndicator::Empty => Value::Unit,
                _ => {
                    return Err(DecodeError::WireTypeMismatch {
                        indicator,
                        expected: "Unit",
                    })
                }
            },
            FieldType::Bool => Value::Bool(ScalarPayload::deser_bool(indicator, r)?),
            FieldType::U64 => Value::U64(ScalarPayload::deser_u64(indicator, r)?),
            FieldType::S64 => Value::S64(ScalarPayload::deser_s64(indicator, r)?),
            FieldType::F64 => Value::F64(ScalarPayload::deser_f64(indicator, r)?),
            FieldType::Bytes => {
                let mut span = deser_prefixed(indicator, r, "Bytes")?;
                Value::Bytes(span.read_bytes(span.remaining())?.to_vec())
            }
            FieldType::String => {
                let mut span = deser_prefixed(indicator, r, "String")?;
                Value::Str(deser_utf8(span.read_bytes(span.remaining())?)?)
            }
            FieldType::Custom(id) => {
                let body = match self.schema.resolve(*id).kind {
                    TypeKind::Struct => deser_prefixed(indicator, r, "Struct")?,
                    // A choice body always holds at least one variant.
                    TypeKind::Choice => match indicator {
                        SizeIndicator::Prefixed => r.read_prefixed()?,
                        _ => {
                            return Err(DecodeError::WireTypeMismatch {
                                indicator,
                                expected: "Choice",
                            })
                        }
                    },
                };
                self.decode_custom(*id, body, depth)?
            }
            FieldType::Array(elem_ty) => self.decode_array_field(elem_ty, indicator, r, depth)?,
        };
        Ok(value)
    }
}
