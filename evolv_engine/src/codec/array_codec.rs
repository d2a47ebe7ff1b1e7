//! Arrays. The body layout depends only on the element type:
//!
//! ```text
//! [Unit]                 varint(count)               (in field position: indicator Varint)
//! [Bool] [U64] [S64]     varint(e) for each e
//! [F64]                  8 bytes LE for each e
//! anything else          varint(len(e)) ++ e for each e
//! ```
//!
//! An empty array of any element type is an `Empty` field. Elements have no headers, so
//! zero-like elements are written in full.

use crate::atlas::PlanningError;
use crate::codec::reader::Decoder;
use crate::codec::writer::Writer;
use evolv_types::schema::FieldType;
use evolv_types::serde::{
    deser_prefixed, deser_utf8, varint, BytesReader, DecodeError, FieldHeader, SizeIndicator,
};
use evolv_types::value::Value;

impl Writer<'_, '_> {
    pub(super) fn write_array_field(
        &mut self,
        index: u64,
        elems: &[Value],
    ) -> Result<(), PlanningError> {
        let body_len = self.plan.take()?;
        if body_len == 0 {
            self.w
                .put_header(FieldHeader::new(index, SizeIndicator::Empty))?;
            return Ok(());
        }
        if is_unit_array(elems) {
            self.w
                .put_header(FieldHeader::new(index, SizeIndicator::Varint))?;
        } else {
            self.w
                .put_header(FieldHeader::new(index, SizeIndicator::Prefixed))?;
            self.w.put_varint(body_len as u64)?;
        }
        self.write_array_body(elems, body_len)
    }

    fn write_array_body(&mut self, elems: &[Value], body_len: usize) -> Result<(), PlanningError> {
        let start = self.w.offset();
        if is_unit_array(elems) {
            if !elems.is_empty() {
                self.w.put_varint(elems.len() as u64)?;
            }
        } else {
            for elem in elems {
                self.write_element(elem)?;
            }
        }
        self.expect_body(start, body_len)
    }

    fn write_element(&mut self, elem: &Value) -> Result<(), PlanningError> {
        match elem {
            Value::Bool(b) => self.w.put_varint(u64::from(*b))?,
            Value::U64(u) => self.w.put_varint(*u)?,
            Value::S64(i) => self.w.put_varint(varint::zigzag(*i))?,
            Value::F64(f) => self.w.put_fixed8(f.to_le_bytes())?,
            Value::Bytes(b) => self.write_element_span(b)?,
            Value::Str(s) => self.write_element_span(s.as_bytes())?,
            Value::Struct(sv) => {
                let body_len = self.plan.take()?;
                self.w.put_varint(body_len as u64)?;
                self.write_struct_body(sv, body_len)?;
            }
            Value::Choice(cv) => {
                let body_len = self.plan.take()?;
                self.w.put_varint(body_len as u64)?;
                self.write_choice_body(cv, body_len)?;
            }
            Value::Array(inner) => {
                let body_len = self.plan.take()?;
                self.w.put_varint(body_len as u64)?;
                self.write_array_body(inner, body_len)?;
            }
            Value::Unit => {
                return Err(PlanningError::PlanMismatch {
                    detail: "unit elements are counted, not written",
                })
            }
        }
        Ok(())
    }

    fn write_element_span(&mut self, bytes: &[u8]) -> Result<(), PlanningError> {
        let len = self.take_span(bytes)?;
        self.w.put_varint(len as u64)?;
        self.w.put_bytes(bytes)?;
        Ok(())
    }
}

/// The planner has already checked that an array is homogeneous, so its first element
/// speaks for all of them. An empty array has no body either way.
fn is_unit_array(elems: &[Value]) -> bool {
    matches!(elems.first(), Some(Value::Unit))
}

impl Decoder<'_> {
    pub(super) fn decode_array_field(
        &self,
        elem_ty: &FieldType,
        indicator: SizeIndicator,
        r: &mut BytesReader,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let depth = self.descend(depth)?;
        if *elem_ty == FieldType::Unit {
            return match indicator {
                SizeIndicator::Empty => Ok(Value::Array(vec![])),
                SizeIndicator::Varint => self.unit_array(r.read_varint()?),
                _ => Err(DecodeError::WireTypeMismatch {
                    indicator,
                    expected: "[Unit]",
                }),
            };
        }
        let body = deser_prefixed(indicator, r, "Array")?;
        self.decode_array_body(elem_ty, body, depth)
    }

    fn decode_array_body(
        &self,
        elem_ty: &FieldType,
        mut body: BytesReader,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        if *elem_ty == FieldType::Unit {
            if body.is_empty() {
                return Ok(Value::Array(vec![]));
            }
            let count = body.read_varint()?;
            if !body.is_empty() {
                return Err(DecodeError::non_canonical(
                    "trailing bytes after a unit array count",
                ));
            }
            return self.unit_array(count);
        }

        let mut elems = vec![];
        while !body.is_empty() {
            elems.push(self.decode_element(elem_ty, &mut body, depth)?);
        }
        Ok(Value::Array(elems))
    }

    fn unit_array(&self, count: u64) -> Result<Value, DecodeError> {
        if count == 0 {
            return Err(DecodeError::non_canonical(
                "empty unit array must have an empty payload",
            ));
        }
        let max = self.limits.max_unit_array_len;
        match usize::try_from(count) {
            Ok(len) if len <= max => Ok(Value::Array(vec![Value::Unit; len])),
            _ => Err(DecodeError::ArrayTooLong { len: count, max }),
        }
    }

    fn decode_element(
        &self,
        elem_ty: &FieldType,
        r: &mut BytesReader,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let value = match elem_ty {
            FieldType::Bool => match r.read_varint()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(DecodeError::non_canonical(format!(
                        "Bool element must be 0 or 1, got {other}"
                    )))
                }
            },
            FieldType::U64 => Value::U64(r.read_varint()?),
            FieldType::S64 => Value::S64(varint::unzigzag(r.read_varint()?)),
            FieldType::F64 => Value::F64(f64::from_le_bytes(r.read_fixed8()?)),
            FieldType::Bytes => {
                let mut span = r.read_prefixed()?;
                Value::Bytes(span.read_bytes(span.remaining())?.to_vec())
            }
            FieldType::String => {
                let mut span = r.read_prefixed()?;
                Value::Str(deser_utf8(span.read_bytes(span.remaining())?)?)
            }
            FieldType::Custom(id) => {
                let body = r.read_prefixed()?;
                self.decode_custom(*id, body, depth)?
            }
            FieldType::Array(inner) => {
                let depth = self.descend(depth)?;
                let body = r.read_prefixed()?;
                self.decode_array_body(inner, body, depth)?
            }
            // Unit elements are counted by the array body and never reach here.
            FieldType::Unit => Value::Unit,
        };
        Ok(value)
    }
}
