//! Choice bodies: the selected variant as `header + payload`, followed, for asymmetric and
//! optional variants, by the complete encoding of the fallback choice.
//!
//! ```text
//! choice_body(v) = entry(v)                           if v is required
//!                | entry(v) ++ choice_body(fallback)  otherwise
//! ```
//!
//! A reader takes the first entry it recognizes and discards the rest of the body.

use crate::atlas::PlanningError;
use crate::codec::reader::Decoder;
use crate::codec::writer::Writer;
use evolv_types::schema::TypeDecl;
use evolv_types::serde::{skip_payload, BytesReader, DecodeError};
use evolv_types::value::ChoiceValue;
use tracing::debug;

impl Writer<'_, '_> {
    pub(super) fn write_choice_body(
        &mut self,
        cv: &ChoiceValue,
        body_len: usize,
    ) -> Result<(), PlanningError> {
        let start = self.w.offset();
        for hop in cv.chain() {
            self.write_field(hop.index, &hop.payload)?;
        }
        self.expect_body(start, body_len)
    }
}

impl Decoder<'_> {
    pub(super) fn decode_choice(
        &self,
        decl: &TypeDecl,
        mut body: BytesReader,
        depth: usize,
    ) -> Result<ChoiceValue, DecodeError> {
        if body.is_empty() {
            return Err(DecodeError::TruncatedInput {
                needed: 1,
                remaining: 0,
            });
        }

        loop {
            let header = body.read_header()?;

            if let Some(variant) = decl.field_by_index(header.index) {
                let payload =
                    self.decode_field(&variant.ty, header.indicator, &mut body, depth)?;
                return Ok(ChoiceValue::new(header.index, payload));
            }

            skip_payload(header.indicator, &mut body)?;
            if body.is_empty() {
                return Err(DecodeError::UnrecognizedVariantWithoutFallback {
                    type_name: decl.name.clone(),
                    index: header.index,
                });
            }
            debug!(
                type_name = %decl.name,
                index = header.index,
                "unrecognized variant, taking its fallback"
            );
        }
    }
}
