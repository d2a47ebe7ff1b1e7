use crate::schema::{FieldDecl, FieldType, Modifier, Schema, TypeDecl, TypeId, TypeKind};
use crate::serde::MAX_FIELD_INDEX;
use anyhow::{anyhow, Result};
use itertools::Itertools;


/// Accumulates declarations, then validates them as a whole in [`SchemaBuilder::finish`].
///
/// Types are declared first and defined afterwards, so declarations may refer to one another
/// in any order, including circularly.
#[derive(Default, Debug)]
pub struct SchemaBuilder {
    decls: Vec<TypeDecl>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_struct<S: Into<String>>(&mut self, name: S) -> TypeId {
        self.declare(name.into(), TypeKind::Struct)
    }

    pub fn declare_choice<S: Into<String>>(&mut self, name: S) -> TypeId {
        self.declare(name.into(), TypeKind::Choice)
    }

    fn declare(&mut self, name: String, kind: TypeKind) -> TypeId {
        self.decls.push(TypeDecl {
            name,
            kind,
            fields: vec![],
        });
        TypeId(self.decls.len() - 1)
    }

    /// Adds a struct field or a choice variant to a declared type.
    pub fn field<S: Into<String>>(
        &mut self,
        owner: TypeId,
        name: S,
        index: u64,
        modifier: Modifier,
        ty: FieldType,
    ) -> Result<&mut Self> {
        let decl = self
            .decls
            .get_mut(*owner)
            .ok_or(anyhow!("No declaration for {owner:?}"))?;
        decl.fields.push(FieldDecl {
            name: name.into(),
            index,
            modifier,
            ty,
        });
        Ok(self)
    }

    pub fn finish(mut self) -> Result<Schema> {
        let type_count = self.decls.len();

        if let Some((name, _)) = self
            .decls
            .iter()
            .map(|decl| &decl.name)
            .sorted()
            .tuple_windows()
            .find(|(a, b)| a == b)
        {
            return Err(anyhow!("Type {name} is declared more than once"));
        }

        for decl in self.decls.iter_mut() {
            decl.fields.sort_by_key(|field| field.index);

            if let Some((a, _)) = decl
                .fields
                .iter()
                .tuple_windows()
                .find(|(a, b)| a.index == b.index)
            {
                return Err(anyhow!(
                    "Index {} is used more than once in {}",
                    a.index,
                    decl.name
                ));
            }

            if let Some((name, _)) = decl
                .fields
                .iter()
                .map(|field| &field.name)
                .sorted()
                .tuple_windows()
                .find(|(a, b)| a == b)
            {
                return Err(anyhow!(
                    "Field {name} is declared more than once in {}",
                    decl.name
                ));
            }

            for field in decl.fields.iter() {
                if field.index > MAX_FIELD_INDEX {
                    return Err(anyhow!(
                        "Index {} of {}.{} exceeds {MAX_FIELD_INDEX}",
                        field.index,
                        decl.name,
                        field.name
                    ));
                }
                if let Some(id) = dangling_ref(&field.ty, type_count) {
                    return Err(anyhow!(
                        "{}.{} refers to undeclared {id:?}",
                        decl.name,
                        field.name
                    ));
                }
            }

            // Every fallback chain has to end at a variant all readers understand.
            if decl.kind == TypeKind::Choice {
                let needs_terminal = decl.fields.iter().any(|f| f.modifier.needs_fallback());
                let has_terminal = decl
                    .fields
                    .iter()
                    .any(|f| f.modifier == Modifier::Required);
                if needs_terminal && !has_terminal {
                    return Err(anyhow!(
                        "Choice {} has non-required variants but no required variant to fall back to",
                        decl.name
                    ));
                }
            }
        }

        Ok(Schema { decls: self.decls })
    }
}

fn dangling_ref(ty: &FieldType, type_count: usize) -> Option<TypeId> {
    match ty {
        FieldType::Custom(id) if **id >= type_count => Some(*id),
        FieldType::Array(elem) => dangling_ref(elem, type_count),
        _ => None,
    }
}
