//! Schema declarations, held in an arena.
//!
//! Declarations refer to one another only through [`TypeId`] handles, so a struct may
//! (indirectly) contain itself without the Rust types becoming infinitely sized.
//! Values built against such a schema are still finite trees.

use derive_more::{Deref, Display, From};
use std::fmt::{self, Formatter};

mod builder;

pub use builder::*;

/// Handle of a declaration within one [`Schema`].
#[derive(From, Deref, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct TypeId(usize);

/// Compatibility class of a struct field or a choice variant.
///
/// - `Required`: every writer writes it and every reader understands it.
/// - `Asymmetric`: every writer writes it (with a fallback, for choices),
///   but readers may not know it yet.
/// - `Optional`: neither side is obligated.
#[derive(Display, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub enum Modifier {
    #[display(fmt = "required")]
    Required,
    #[display(fmt = "asymmetric")]
    Asymmetric,
    #[display(fmt = "optional")]
    Optional,
}

impl Modifier {
    /// Whether a choice variant with this modifier must carry a fallback.
    pub fn needs_fallback(self) -> bool {
        self != Self::Required
    }

    /// Whether every writer is obligated to write a struct field with this modifier.
    pub fn always_written(self) -> bool {
        self != Self::Optional
    }
}

#[derive(Display, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum TypeKind {
    #[display(fmt = "struct")]
    Struct,
    #[display(fmt = "choice")]
    Choice,
}

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum FieldType {
    Unit,
    Bool,
    F64,
    U64,
    S64,
    Bytes,
    String,
    Custom(TypeId),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn array_of(elem: FieldType) -> Self {
        Self::Array(Box::new(elem))
    }

    /// Short name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unit => "Unit",
            Self::Bool => "Bool",
            Self::F64 => "F64",
            Self::U64 => "U64",
            Self::S64 => "S64",
            Self::Bytes => "Bytes",
            Self::String => "String",
            Self::Custom(_) => "Custom",
            Self::Array(_) => "Array",
        }
    }

    fn fmt_in(&self, schema: &Schema, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Custom(id) => match schema.decl(*id) {
                Some(decl) => write!(f, "{}", decl.name),
                None => write!(f, "<unknown type {}>", **id),
            },
            Self::Array(elem) => {
                write!(f, "[")?;
                elem.fmt_in(schema, f)?;
                write!(f, "]")
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FieldDecl {
    pub name: String,
    pub index: u64,
    pub modifier: Modifier,
    pub ty: FieldType,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// Sorted by `index` once the schema is finished.
    pub fields: Vec<FieldDecl>,
}

impl TypeDecl {
    pub fn field_by_index(&self, index: u64) -> Option<&FieldDecl> {
        self.fields
            .binary_search_by_key(&index, |field| field.index)
            .ok()
            .map(|i| &self.fields[i])
    }
}

/// A validated, immutable set of declarations. Build one with [`SchemaBuilder`].
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Schema {
    decls: Vec<TypeDecl>,
}

impl Schema {
    pub fn decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.decls.get(*id)
    }

    /// Like [`Schema::decl`], for ids known to come from this schema: every `Custom`
    /// reference of a finished schema resolves.
    ///
    /// Panics if `id` was issued by a different schema.
    pub fn resolve(&self, id: TypeId) -> &TypeDecl {
        &self.decls[*id]
    }

    pub fn type_by_name(&self, name: &str) -> Option<(TypeId, &TypeDecl)> {
        self.iter().find(|(_, decl)| decl.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDecl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (TypeId(i), decl))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Renders a field type using this schema's declaration names.
    pub fn display_type<'a>(&'a self, ty: &'a FieldType) -> impl fmt::Display + 'a {
        DisplayType { schema: self, ty }
    }
}

struct DisplayType<'a> {
    schema: &'a Schema,
    ty: &'a FieldType,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.ty.fmt_in(self.schema, f)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (i, decl) in self.decls.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{} {} {{", decl.kind, decl.name)?;
            for field in &decl.fields {
                write!(f, "    ")?;
                if field.modifier != Modifier::Required {
                    write!(f, "{} ", field.modifier)?;
                }
                write!(f, "{}", field.name)?;
                if field.ty != FieldType::Unit {
                    write!(f, ": ")?;
                    field.ty.fmt_in(self, f)?;
                }
                writeln!(f, " = {}", field.index)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
