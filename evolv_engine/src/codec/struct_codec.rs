//! Struct bodies: present fields in ascending index order, each `header + payload`.
//!
//! Optional fields that are absent are not written; the header of a present field is its
//! presence tag. Fields the reader does not know are skipped by their size indicator.

use crate::atlas::PlanningError;
use crate::codec::reader::Decoder;
use crate::codec::writer::Writer;
use evolv_types::schema::{Modifier, TypeDecl};
use evolv_types::serde::{skip_payload, BytesReader, DecodeError};
use evolv_types::value::StructValue;
use tracing::trace;

impl Writer<'_, '_> {
    pub(super) fn write_struct_body(
        &mut self,
        sv: &StructValue,
        body_len: usize,
    ) -> Result<(), PlanningError> {
        let start = self.w.offset();
        for (&index, value) in sv.fields.iter() {
            self.write_field(index, value)?;
        }
        self.expect_body(start, body_len)
    }
}

impl Decoder<'_> {
    pub(super) fn decode_struct(
        &self,
        decl: &TypeDecl,
        mut body: BytesReader,
        depth: usize,
    ) -> Result<StructValue, DecodeError> {
        let mut sv = StructValue::new();
        let mut prev_index = None;

        while !body.is_empty() {
            let header = body.read_header()?;
            if let Some(prev) = prev_index.filter(|prev| header.index <= *prev) {
                return Err(DecodeError::non_canonical(format!(
                    "field {} of `{}` follows field {prev}",
                    header.index, decl.name,
                )));
            }
            prev_index = Some(header.index);

            match decl.field_by_index(header.index) {
                Some(field) => {
                    let value = self.decode_field(&field.ty, header.indicator, &mut body, depth)?;
                    sv.fields.insert(header.index, value);
                }
                None => {
                    trace!(
                        type_name = %decl.name,
                        index = header.index,
                        indicator = ?header.indicator,
                        "skipping unknown field"
                    );
                    skip_payload(header.indicator, &mut body)?;
                }
            }
        }

        let missing = decl
            .fields
            .iter()
            .find(|f| f.modifier == Modifier::Required && !sv.fields.contains_key(&f.index));
        if let Some(field) = missing {
            return Err(DecodeError::MissingRequiredField {
                type_name: decl.name.clone(),
                field: field.name.clone(),
            });
        }

        Ok(sv)
    }
}
