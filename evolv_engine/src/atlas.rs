//! The layout planner.
//!
//! Fixed-size payloads can be sized from their type alone. Bodies of structs, choices and
//! arrays, and the contents of strings and byte spans, cannot be sized without recursing.
//! The planner walks the value tree once, records the length of every such node, and
//! hands the writer a [`SizePlan`] so that serialization is one linear pass into one
//! buffer, with every length prefix known before its body is written.
//!
//! #### Plan layout
//!
//! The plan is an arena with one slot per variable-length node, in pre-order. A slot is
//! reserved when the planner enters a node and filled after its children are sized,
//! which is exactly the order in which the writer consumes them.

use crate::config::DecodeLimits;
use evolv_types::schema::{FieldType, Schema, TypeDecl, TypeId, TypeKind};
use evolv_types::serde::{varint, FieldHeader, ScalarPayload, SizeIndicator, WriteOverflow};
use evolv_types::value::{ChoiceValue, StructValue, Value};
use thiserror::Error;


/// A value tree that does not conform to its declared type, or a plan handed to the
/// wrong value. These are defects of the caller, not wire errors.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum PlanningError {
    #[error("no declaration for {0:?}")]
    UnknownType(TypeId),

    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },

    #[error("`{type_name}` has no field with index {index}")]
    UnknownField { type_name: String, index: u64 },

    #[error("field `{field}` of `{type_name}` must always be written")]
    MissingField { type_name: String, field: String },

    #[error("`{type_name}` has no variant with index {index}")]
    UnknownVariant { type_name: String, index: u64 },

    #[error("variant `{variant}` of `{type_name}` needs a fallback")]
    MissingFallback { type_name: String, variant: String },

    #[error("variant `{variant}` of `{type_name}` is required and cannot carry a fallback")]
    UnexpectedFallback { type_name: String, variant: String },

    #[error("choice `{type_name}` has no variants and cannot be instantiated")]
    EmptyChoice { type_name: String },

    #[error("unit array of {len} elements exceeds the limit of {max}")]
    ArrayTooLong { len: usize, max: usize },

    #[error("value nesting exceeds the limit of {max}")]
    NestingTooDeep { max: usize },

    #[error("buffer too small: needed {needed} bytes, {remaining} remain")]
    BufferTooSmall { needed: usize, remaining: usize },

    #[error("size plan does not describe this value: {detail}")]
    PlanMismatch { detail: &'static str },
}

impl From<WriteOverflow> for PlanningError {
    fn from(e: WriteOverflow) -> Self {
        Self::BufferTooSmall {
            needed: e.needed,
            remaining: e.remaining,
        }
    }
}

/// Exact body lengths of every variable-length node of one value tree.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SizePlan {
    body_lens: Vec<usize>,
}

impl SizePlan {
    /// The size of the serialized message, which is the root body.
    pub fn total_size(&self) -> usize {
        self.body_lens.first().copied().unwrap_or(0)
    }

    /// Count of planned nodes.
    pub fn node_count(&self) -> usize {
        self.body_lens.len()
    }

    pub fn cursor(&self) -> PlanCursor {
        PlanCursor {
            body_lens: &self.body_lens,
            next: 0,
        }
    }
}

/// Hands out the plan's slots in the order they were reserved.
pub struct PlanCursor<'p> {
    body_lens: &'p [usize],
    next: usize,
}

impl PlanCursor<'_> {
    pub fn take(&mut self) -> Result<usize, PlanningError> {
        let len = *self
            .body_lens
            .get(self.next)
            .ok_or(PlanningError::PlanMismatch {
                detail: "more variable-length nodes than planned",
            })?;
        self.next += 1;
        Ok(len)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next == self.body_lens.len()
    }
}

/// Sizes a message of the declared struct or choice type `type_id`.
pub fn plan(
    schema: &Schema,
    type_id: TypeId,
    value: &Value,
    limits: &DecodeLimits,
) -> Result<SizePlan, PlanningError> {
    let mut planner = Planner {
        schema,
        max_depth: limits.max_depth,
        max_unit_array_len: limits.max_unit_array_len,
        body_lens: vec![],
    };
    planner.plan_custom(type_id, value, 0)?;
    Ok(SizePlan {
        body_lens: planner.body_lens,
    })
}

/// Size of one field or variant in its parent's body.
struct FieldSize {
    indicator: SizeIndicator,
    /// Excludes the header; includes the length prefix if any.
    payload_len: usize,
}

impl FieldSize {
    fn of_body(indicator_if_nonempty: SizeIndicator, body_len: usize) -> Self {
        match (body_len, indicator_if_nonempty) {
            (0, _) => Self {
                indicator: SizeIndicator::Empty,
                payload_len: 0,
            },
            (_, SizeIndicator::Prefixed) => Self {
                indicator: SizeIndicator::Prefixed,
                payload_len: prefixed_len(body_len),
            },
            (_, indicator) => Self {
                indicator,
                payload_len: body_len,
            },
        }
    }
}

pub(crate) fn prefixed_len(body_len: usize) -> usize {
    varint::size_u64(body_len as u64) + body_len
}

struct Planner<'s> {
    schema: &'s Schema,
    max_depth: usize,
    max_unit_array_len: usize,
    body_lens: Vec<usize>,
}

impl<'s> Planner<'s> {
    fn reserve(&mut self) -> usize {
        self.body_lens.push(0);
        self.body_lens.len() - 1
    }

    fn fill(&mut self, slot: usize, body_len: usize) -> usize {
        self.body_lens[slot] = body_len;
        body_len
    }

    fn descend(&self, depth: usize) -> Result<usize, PlanningError> {
        if depth >= self.max_depth {
            return Err(PlanningError::NestingTooDeep {
                max: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn decl(&self, type_id: TypeId) -> Result<&'s TypeDecl, PlanningError> {
        self.schema
            .decl(type_id)
            .ok_or(PlanningError::UnknownType(type_id))
    }

    fn mismatch(&self, ty: &FieldType, found: &Value) -> PlanningError {
        PlanningError::TypeMismatch {
            expected: self.schema.display_type(ty).to_string(),
            found: found.kind_label(),
        }
    }

    /// Returns the body length of a struct or choice.
    fn plan_custom(
        &mut self,
        type_id: TypeId,
        value: &Value,
        depth: usize,
    ) -> Result<usize, PlanningError> {
        let decl = self.decl(type_id)?;
        let depth = self.descend(depth)?;
        match (decl.kind, value) {
            (TypeKind::Struct, Value::Struct(sv)) => self.plan_struct(decl, sv, depth),
            (TypeKind::Choice, Value::Choice(cv)) => self.plan_choice(decl, cv, depth),
            _ => Err(self.mismatch(&FieldType::Custom(type_id), value)),
        }
    }

    fn plan_struct(
        &mut self,
        decl: &TypeDecl,
        sv: &StructValue,
        depth: usize,
    ) -> Result<usize, PlanningError> {
        let slot = self.reserve();

        for field in decl.fields.iter() {
            if field.modifier.always_written() && !sv.fields.contains_key(&field.index) {
                return Err(PlanningError::MissingField {
                    type_name: decl.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let mut body_len = 0;
        for (&index, value) in sv.fields.iter() {
            let field = decl
                .field_by_index(index)
                .ok_or_else(|| PlanningError::UnknownField {
                    type_name: decl.name.clone(),
                    index,
                })?;
            let size = self.plan_field(&field.ty, value, depth)?;
            body_len += FieldHeader::new(index, size.indicator).size() + size.payload_len;
        }

        Ok(self.fill(slot, body_len))
    }

    fn plan_choice(
        &mut self,
        decl: &TypeDecl,
        cv: &ChoiceValue,
        depth: usize,
    ) -> Result<usize, PlanningError> {
        if decl.fields.is_empty() {
            return Err(PlanningError::EmptyChoice {
                type_name: decl.name.clone(),
            });
        }

        let slot = self.reserve();

        let mut body_len = 0;
        for hop in cv.chain() {
            let variant =
                decl.field_by_index(hop.index)
                    .ok_or_else(|| PlanningError::UnknownVariant {
                        type_name: decl.name.clone(),
                        index: hop.index,
                    })?;
            match (variant.modifier.needs_fallback(), hop.fallback.is_some()) {
                (true, false) => {
                    return Err(PlanningError::MissingFallback {
                        type_name: decl.name.clone(),
                        variant: variant.name.clone(),
                    })
                }
                (false, true) => {
                    return Err(PlanningError::UnexpectedFallback {
                        type_name: decl.name.clone(),
                        variant: variant.name.clone(),
                    })
                }
                _ => {}
            }
            let size = self.plan_field(&variant.ty, &hop.payload, depth)?;
            body_len += FieldHeader::new(hop.index, size.indicator).size() + size.payload_len;
        }

        Ok(self.fill(slot, body_len))
    }

    fn plan_field(
        &mut self,
        ty: &FieldType,
        value: &Value,
        depth: usize,
    ) -> Result<FieldSize, PlanningError> {
        let scalar = |payload: ScalarPayload| FieldSize {
            indicator: payload.indicator(),
            payload_len: payload.size(),
        };
        let size = match (ty, value) {
            (FieldType::Unit, Value::Unit) => scalar(ScalarPayload::Empty),
            (FieldType::Bool, Value::Bool(b)) => scalar(ScalarPayload::from_bool(*b)),
            (FieldType::U64, Value::U64(u)) => scalar(ScalarPayload::from_u64(*u)),
            (FieldType::S64, Value::S64(i)) => scalar(ScalarPayload::from_s64(*i)),
            (FieldType::F64, Value::F64(f)) => scalar(ScalarPayload::from_f64(*f)),
            (FieldType::Bytes, Value::Bytes(_)) | (FieldType::String, Value::Str(_)) => {
                let len = self.plan_span(value);
                FieldSize::of_body(SizeIndicator::Prefixed, len)
            }
            (FieldType::Custom(id), _) => {
                let body_len = self.plan_custom(*id, value, depth)?;
                FieldSize::of_body(SizeIndicator::Prefixed, body_len)
            }
            (FieldType::Array(elem_ty), Value::Array(elems)) => {
                let body_len = self.plan_array(elem_ty, elems, depth)?;
                let indicator = if **elem_ty == FieldType::Unit {
                    SizeIndicator::Varint
                } else {
                    SizeIndicator::Prefixed
                };
                FieldSize::of_body(indicator, body_len)
            }
            _ => return Err(self.mismatch(ty, value)),
        };
        Ok(size)
    }

    fn plan_span(&mut self, value: &Value) -> usize {
        let len = match value {
            Value::Bytes(b) => b.len(),
            Value::Str(s) => s.len(),
            _ => 0,
        };
        let slot = self.reserve();
        self.fill(slot, len)
    }

    fn plan_array(
        &mut self,
        elem_ty: &FieldType,
        elems: &[Value],
        depth: usize,
    ) -> Result<usize, PlanningError> {
        let depth = self.descend(depth)?;
        let slot = self.reserve();

        let body_len = if *elem_ty == FieldType::Unit {
            if let Some(other) = elems.iter().find(|e| **e != Value::Unit) {
                return Err(self.mismatch(elem_ty, other));
            }
            match elems.len() {
                0 => 0,
                count if count > self.max_unit_array_len => {
                    return Err(PlanningError::ArrayTooLong {
                        len: count,
                        max: self.max_unit_array_len,
                    })
                }
                count => varint::size_u64(count as u64),
            }
        } else {
            let mut body_len = 0;
            for elem in elems {
                body_len += self.plan_element(elem_ty, elem, depth)?;
            }
            body_len
        };

        Ok(self.fill(slot, body_len))
    }

    /// Returns the bytes one element occupies in its array's body.
    fn plan_element(
        &mut self,
        elem_ty: &FieldType,
        value: &Value,
        depth: usize,
    ) -> Result<usize, PlanningError> {
        let len = match (elem_ty, value) {
            (FieldType::Bool, Value::Bool(_)) => 1,
            (FieldType::U64, Value::U64(u)) => varint::size_u64(*u),
            (FieldType::S64, Value::S64(i)) => varint::size_s64(*i),
            (FieldType::F64, Value::F64(_)) => 8,
            (FieldType::Bytes, Value::Bytes(_)) | (FieldType::String, Value::Str(_)) => {
                prefixed_len(self.plan_span(value))
            }
            (FieldType::Custom(id), _) => prefixed_len(self.plan_custom(*id, value, depth)?),
            (FieldType::Array(inner), Value::Array(elems)) => {
                prefixed_len(self.plan_array(inner, elems, depth)?)
            }
            _ => return Err(self.mismatch(elem_ty, value)),
        };
        Ok(len)
    }
}
