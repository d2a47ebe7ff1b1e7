//! Which schema changes readers and writers can survive.
//!
//! Every pair of schema versions is judged one declared field (or variant) at a time, from
//! the point of view of a message written under one version and read under another.
//!
//! #### Struct fields
//!
//! A reader fails only when it requires a field the writer was not obligated to write.
//!
//! | writer \ reader | required | asymmetric | optional | absent |
//! |-----------------|----------|------------|----------|--------|
//! | required        | ok       | ok         | ok       | ok     |
//! | asymmetric      | ok       | ok         | ok       | ok     |
//! | optional        | FAIL     | ok         | ok       | ok     |
//! | absent          | FAIL     | ok         | ok       | ok     |
//!
//! #### Choice variants
//!
//! A reader fails only when it meets a variant it does not know that carries no fallback.
//!
//! | writer \ reader | required | asymmetric | optional | absent |
//! |-----------------|----------|------------|----------|--------|
//! | required        | ok       | ok         | ok       | FAIL   |
//! | asymmetric      | ok       | ok         | ok       | ok     |
//! | optional        | ok       | ok         | ok       | ok     |
//! | absent          | ok       | ok         | ok       | ok     |

use derive_more::Deref;
use evolv_types::schema::{FieldDecl, Modifier, Schema, TypeDecl, TypeKind};
use itertools::{EitherOrBoth, Itertools};
use std::fmt::{self, Formatter};
use tracing::debug;


/// How a field or variant is declared in one schema version. `None` means not declared.
pub type Presence = Option<Modifier>;

fn presence_label(presence: Presence) -> &'static str {
    match presence {
        Some(Modifier::Required) => "required",
        Some(Modifier::Asymmetric) => "asymmetric",
        Some(Modifier::Optional) => "optional",
        None => "nonexistent",
    }
}

pub fn struct_field_compatible(writer: Presence, reader: Presence) -> bool {
    let reader_requires = reader == Some(Modifier::Required);
    let writer_writes = writer.is_some_and(Modifier::always_written);
    !reader_requires || writer_writes
}

pub fn choice_variant_compatible(writer: Presence, reader: Presence) -> bool {
    !(writer == Some(Modifier::Required) && reader.is_none())
}

pub fn compatible(kind: TypeKind, writer: Presence, reader: Presence) -> bool {
    match kind {
        TypeKind::Struct => struct_field_compatible(writer, reader),
        TypeKind::Choice => choice_variant_compatible(writer, reader),
    }
}

/// A change to one field or variant between an older and a newer schema version.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Transition {
    pub kind: TypeKind,
    pub from: Presence,
    pub to: Presence,
}

macro_rules! transitions {
    ($($name:ident: $from:expr => $to:expr,)*) => {
        impl Transition {
            $(
                pub const fn $name(kind: TypeKind) -> Self {
                    Self { kind, from: $from, to: $to }
                }
            )*

            /// Every transition with a declaration on at least one side.
            pub fn all(kind: TypeKind) -> Vec<Self> {
                vec![$(Self::$name(kind)),*]
            }
        }
    };
}

const REQUIRED: Presence = Some(Modifier::Required);
const ASYMMETRIC: Presence = Some(Modifier::Asymmetric);
const OPTIONAL: Presence = Some(Modifier::Optional);
const NONEXISTENT: Presence = None;

transitions! {
    required_to_required: REQUIRED => REQUIRED,
    required_to_asymmetric: REQUIRED => ASYMMETRIC,
    required_to_optional: REQUIRED => OPTIONAL,
    required_to_nonexistent: REQUIRED => NONEXISTENT,
    asymmetric_to_required: ASYMMETRIC => REQUIRED,
    asymmetric_to_asymmetric: ASYMMETRIC => ASYMMETRIC,
    asymmetric_to_optional: ASYMMETRIC => OPTIONAL,
    asymmetric_to_nonexistent: ASYMMETRIC => NONEXISTENT,
    optional_to_required: OPTIONAL => REQUIRED,
    optional_to_asymmetric: OPTIONAL => ASYMMETRIC,
    optional_to_optional: OPTIONAL => OPTIONAL,
    optional_to_nonexistent: OPTIONAL => NONEXISTENT,
    nonexistent_to_required: NONEXISTENT => REQUIRED,
    nonexistent_to_asymmetric: NONEXISTENT => ASYMMETRIC,
    nonexistent_to_optional: NONEXISTENT => OPTIONAL,
}

impl Transition {
    pub fn new(kind: TypeKind, from: Presence, to: Presence) -> Self {
        Self { kind, from, to }
    }

    /// Messages written under the old version can be read under the new one.
    pub fn is_backward_compatible(&self) -> bool {
        compatible(self.kind, self.from, self.to)
    }

    /// Messages written under the new version can be read under the old one.
    pub fn is_forward_compatible(&self) -> bool {
        compatible(self.kind, self.to, self.from)
    }

    /// Safe to deploy while both versions are live, in any order.
    pub fn is_safe(&self) -> bool {
        self.is_backward_compatible() && self.is_forward_compatible()
    }

    /// `required_to_asymmetric` and so on.
    pub fn label(&self) -> String {
        format!(
            "{}_to_{}",
            presence_label(self.from),
            presence_label(self.to)
        )
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.label())
    }
}

/// One reason a message written under one schema may fail to decode under another.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Incompatibility {
    KindChanged {
        type_name: String,
        writer: TypeKind,
        reader: TypeKind,
    },
    Presence {
        type_name: String,
        index: u64,
        writer: Presence,
        reader: Presence,
    },
    FieldType {
        type_name: String,
        index: u64,
        writer: String,
        reader: String,
    },
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::KindChanged {
                type_name,
                writer,
                reader,
            } => write!(
                f,
                "`{type_name}` is a {writer} for the writer but a {reader} for the reader"
            ),
            Self::Presence {
                type_name,
                index,
                writer,
                reader,
            } => write!(
                f,
                "index {index} of `{type_name}` is {} for the writer but {} for the reader",
                presence_label(*writer),
                presence_label(*reader)
            ),
            Self::FieldType {
                type_name,
                index,
                writer,
                reader,
            } => write!(
                f,
                "index {index} of `{type_name}` is {writer} for the writer but {reader} for the reader"
            ),
        }
    }
}

/// Everything that can go wrong reading `writer`-schema messages with the `reader` schema.
#[derive(Deref, PartialEq, Eq, Clone, Default, Debug)]
pub struct CompatibilityReport(Vec<Incompatibility>);

impl CompatibilityReport {
    pub fn is_compatible(&self) -> bool {
        self.0.is_empty()
    }
}

/// Declarations are matched by name, fields and variants by index. Declarations present in
/// only one schema are never exchanged between the two and are not reported.
pub fn check_compatibility(writer: &Schema, reader: &Schema) -> CompatibilityReport {
    let mut report = CompatibilityReport::default();

    for (_, w_decl) in writer.iter() {
        let Some((_, r_decl)) = reader.type_by_name(&w_decl.name) else {
            continue;
        };
        if w_decl.kind != r_decl.kind {
            report.0.push(Incompatibility::KindChanged {
                type_name: w_decl.name.clone(),
                writer: w_decl.kind,
                reader: r_decl.kind,
            });
            continue;
        }
        check_decl(writer, w_decl, reader, r_decl, &mut report);
    }

    for incompatibility in report.iter() {
        debug!(%incompatibility, "schemas are incompatible");
    }
    report
}

fn check_decl(
    writer: &Schema,
    w_decl: &TypeDecl,
    reader: &Schema,
    r_decl: &TypeDecl,
    report: &mut CompatibilityReport,
) {
    let pairs = w_decl
        .fields
        .iter()
        .merge_join_by(r_decl.fields.iter(), |w, r| w.index.cmp(&r.index));

    for pair in pairs {
        let (index, w_field, r_field): (u64, Option<&FieldDecl>, Option<&FieldDecl>) =
            match pair {
                EitherOrBoth::Both(w, r) => (w.index, Some(w), Some(r)),
                EitherOrBoth::Left(w) => (w.index, Some(w), None),
                EitherOrBoth::Right(r) => (r.index, None, Some(r)),
            };

        let w_presence = w_field.map(|f| f.modifier);
        let r_presence = r_field.map(|f| f.modifier);
        if !compatible(w_decl.kind, w_presence, r_presence) {
            report.0.push(Incompatibility::Presence {
                type_name: w_decl.name.clone(),
                index,
                writer: w_presence,
                reader: r_presence,
            });
        }

        if let (Some(w), Some(r)) = (w_field, r_field) {
            // Custom types are compared by name; their ids differ between schemas.
            let w_ty = writer.display_type(&w.ty).to_string();
            let r_ty = reader.display_type(&r.ty).to_string();
            if w_ty != r_ty {
                report.0.push(Incompatibility::FieldType {
                    type_name: w_decl.name.clone(),
                    index,
                    writer: w_ty,
                    reader: r_ty,
                });
            }
        }
    }
}
