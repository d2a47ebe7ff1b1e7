use crate::atlas::{PlanCursor, PlanningError};
use evolv_types::serde::{BytesWriter, FieldHeader, ScalarPayload, SizeIndicator, WriteLen};
use evolv_types::value::Value;

/// One pass over a value tree, consuming the plan's slots in the order they were reserved.
///
/// The writer needs no schema: the planner has already checked the value against it, and
/// every framing decision follows from the value's shape and its planned lengths.
pub(super) struct Writer<'p, 'b> {
    pub(super) plan: PlanCursor<'p>,
    pub(super) w: BytesWriter<'b>,
}

impl<'p, 'b> Writer<'p, 'b> {
    pub fn new(
        plan: PlanCursor<'p>,
        buf: &'b mut [u8],
        offset: usize,
    ) -> Result<Self, PlanningError> {
        if offset > buf.len() {
            return Err(PlanningError::BufferTooSmall {
                needed: offset,
                remaining: buf.len(),
            });
        }
        Ok(Self {
            plan,
            w: BytesWriter::new(buf, offset),
        })
    }

    pub fn write_message(mut self, value: &Value) -> Result<WriteLen, PlanningError> {
        let body_len = self.plan.take()?;
        let remaining = self.w.remaining();
        if body_len > remaining {
            return Err(PlanningError::BufferTooSmall {
                needed: body_len,
                remaining,
            });
        }

        match value {
            Value::Struct(sv) => self.write_struct_body(sv, body_len)?,
            Value::Choice(cv) => self.write_choice_body(cv, body_len)?,
            _ => {
                return Err(PlanningError::PlanMismatch {
                    detail: "a message must be a struct or a choice",
                })
            }
        }

        if !self.plan.is_exhausted() {
            return Err(PlanningError::PlanMismatch {
                detail: "fewer variable-length nodes than planned",
            });
        }
        Ok(self.w.offset())
    }

    /// Writes one struct field or choice variant: header, then payload.
    pub(super) fn write_field(&mut self, index: u64, value: &Value) -> Result<(), PlanningError> {
        match value {
            Value::Unit => self.write_scalar(index, ScalarPayload::Empty),
            Value::Bool(b) => self.write_scalar(index, ScalarPayload::from_bool(*b)),
            Value::U64(u) => self.write_scalar(index, ScalarPayload::from_u64(*u)),
            Value::S64(i) => self.write_scalar(index, ScalarPayload::from_s64(*i)),
            Value::F64(f) => self.write_scalar(index, ScalarPayload::from_f64(*f)),
            Value::Bytes(b) => self.write_span_field(index, b),
            Value::Str(s) => self.write_span_field(index, s.as_bytes()),
            Value::Struct(sv) => {
                let body_len = self.plan.take()?;
                self.write_prefix(index, body_len)?;
                self.write_struct_body(sv, body_len)
            }
            Value::Choice(cv) => {
                let body_len = self.plan.take()?;
                self.write_prefix(index, body_len)?;
                self.write_choice_body(cv, body_len)
            }
            Value::Array(elems) => self.write_array_field(index, elems),
        }
    }

    fn write_scalar(&mut self, index: u64, payload: ScalarPayload) -> Result<(), PlanningError> {
        self.w
            .put_header(FieldHeader::new(index, payload.indicator()))?;
        payload.ser(&mut self.w)?;
        Ok(())
    }

    fn write_span_field(&mut self, index: u64, bytes: &[u8]) -> Result<(), PlanningError> {
        let len = self.take_span(bytes)?;
        self.write_prefix(index, len)?;
        self.w.put_bytes(bytes)?;
        Ok(())
    }

    /// Takes the slot of a string or byte span, checking it against the actual length.
    pub(super) fn take_span(&mut self, bytes: &[u8]) -> Result<usize, PlanningError> {
        let len = self.plan.take()?;
        if len != bytes.len() {
            return Err(PlanningError::PlanMismatch {
                detail: "planned span length differs from the value",
            });
        }
        Ok(len)
    }

    /// Header for a body that is empty (`Empty`) or length-prefixed (`Prefixed`), plus the
    /// length prefix.
    fn write_prefix(&mut self, index: u64, body_len: usize) -> Result<(), PlanningError> {
        if body_len == 0 {
            self.w
                .put_header(FieldHeader::new(index, SizeIndicator::Empty))?;
        } else {
            self.w
                .put_header(FieldHeader::new(index, SizeIndicator::Prefixed))?;
            self.w.put_varint(body_len as u64)?;
        }
        Ok(())
    }

    /// Checks that the body begun at `start` ended exactly where the plan said it would.
    pub(super) fn expect_body(&self, start: WriteLen, body_len: usize) -> Result<(), PlanningError> {
        if *self.w.offset() - *start != body_len {
            return Err(PlanningError::PlanMismatch {
                detail: "written body length differs from the plan",
            });
        }
        Ok(())
    }
}
