use super::helpers::transcode;
use anyhow::Result;
use evolv_engine::evolution::{check_compatibility, Incompatibility, Transition};
use evolv_engine::{Codec, DecodeError};
use evolv_types::schema::{FieldType, Modifier, Schema, SchemaBuilder, TypeKind};
use evolv_types::value::{ChoiceValue, StructValue, Value};
use itertools::Itertools;

/// Picks one side of a transition: the older or the newer declaration.
type Version = fn(&Transition) -> Option<Modifier>;

/// Builds the older and newer versions of `Example`, whose field (or variant) `i` changes
/// as `transitions[i]` says. Every payload is a string.
fn example_schemas(kind: TypeKind, transitions: &[Transition]) -> Result<(Schema, Schema)> {
    let build = |version: Version| -> Result<Schema> {
        let mut b = SchemaBuilder::new();
        let example = match kind {
            TypeKind::Struct => b.declare_struct("Example"),
            TypeKind::Choice => b.declare_choice("Example"),
        };
        for (index, t) in transitions.iter().enumerate() {
            if let Some(modifier) = version(t) {
                b.field(example, t.label(), index as u64, modifier, FieldType::String)?;
            }
        }
        b.finish()
    };
    Ok((build(|t| t.from)?, build(|t| t.to)?))
}

fn example_codec(schema: &Schema) -> Result<Codec> {
    Codec::by_name(schema, "Example")
}

/// A struct value holding, for each index `version` declares, its label, unless the field
/// is optional and not in `optional_present`.
fn struct_value(transitions: &[Transition], version: Version, optional_present: &[usize]) -> Value {
    let mut sv = StructValue::new();
    for (index, t) in transitions.iter().enumerate() {
        let include = match version(t) {
            None => false,
            Some(Modifier::Optional) => optional_present.contains(&index),
            Some(_) => true,
        };
        if include {
            sv = sv.with(index as u64, t.label());
        }
    }
    Value::Struct(sv)
}

/// `value` as seen by a reader that only knows the fields `reader_version` declares.
fn project(value: &Value, transitions: &[Transition], reader_version: Version) -> Value {
    match value {
        Value::Struct(sv) => {
            let mut projected = sv.clone();
            projected
                .fields
                .retain(|index, _| reader_version(&transitions[*index as usize]).is_some());
            Value::Struct(projected)
        }
        other => other.clone(),
    }
}

fn older(t: &Transition) -> Option<Modifier> {
    t.from
}

fn newer(t: &Transition) -> Option<Modifier> {
    t.to
}

/// Every struct transition but `nonexistent_to_required`, which no old message can satisfy.
/// Old messages are read by the new version.
pub fn run_struct() -> Result<()> {
    let transitions = Transition::all(TypeKind::Struct)
        .into_iter()
        .filter(|t| *t != Transition::nonexistent_to_required(TypeKind::Struct))
        .collect::<Vec<_>>();
    let (before, after) = example_schemas(TypeKind::Struct, &transitions)?;
    let (before_codec, after_codec) = (example_codec(&before)?, example_codec(&after)?);

    let optional_indices = transitions
        .iter()
        .positions(|t| t.from == Some(Modifier::Optional))
        .collect::<Vec<_>>();
    let optional_to_required = transitions
        .iter()
        .position(|t| *t == Transition::optional_to_required(TypeKind::Struct))
        .unwrap_or_default();

    /* With every optional field written, every transition reads. */
    let full = struct_value(&transitions, older, &optional_indices);
    let decoded = transcode(&before_codec, &after_codec, &full)??;
    assert_eq!(decoded, project(&full, &transitions, newer));

    /* optional_to_required holds only as long as writers happen to write the field. */
    let none = struct_value(&transitions, older, &[]);
    assert_eq!(
        transcode(&before_codec, &after_codec, &none)?,
        Err(DecodeError::MissingRequiredField {
            type_name: "Example".into(),
            field: "optional_to_required".into()
        })
    );

    let only_promoted = struct_value(&transitions, older, &[optional_to_required]);
    let decoded = transcode(&before_codec, &after_codec, &only_promoted)??;
    assert_eq!(decoded, project(&only_promoted, &transitions, newer));

    assert_eq!(
        *check_compatibility(&before, &after),
        vec![Incompatibility::Presence {
            type_name: "Example".into(),
            index: optional_to_required as u64,
            writer: Some(Modifier::Optional),
            reader: Some(Modifier::Required),
        }]
    );

    Ok(())
}

/// Safe transitions read in both directions, whichever optional fields are written.
pub fn run_struct_safe_transitions() -> Result<()> {
    let transitions = Transition::all(TypeKind::Struct)
        .into_iter()
        .filter(Transition::is_safe)
        .collect::<Vec<_>>();
    let (before, after) = example_schemas(TypeKind::Struct, &transitions)?;
    let (before_codec, after_codec) = (example_codec(&before)?, example_codec(&after)?);

    assert!(check_compatibility(&before, &after).is_compatible());
    assert!(check_compatibility(&after, &before).is_compatible());

    let directions: [(&Codec, &Codec, Version, Version); 2] = [
        (&before_codec, &after_codec, older, newer),
        (&after_codec, &before_codec, newer, older),
    ];
    for (writer, reader, writer_version, reader_version) in directions {
        let optional_indices = transitions
            .iter()
            .positions(|t| writer_version(t) == Some(Modifier::Optional))
            .collect::<Vec<_>>();
        for present in optional_indices.into_iter().powerset() {
            let value = struct_value(&transitions, writer_version, &present);
            let decoded = transcode(writer, reader, &value)??;
            assert_eq!(decoded, project(&value, &transitions, reader_version));
        }
    }

    Ok(())
}

/// Old messages of each variant are read by the new version.
pub fn run_choice() -> Result<()> {
    let transitions = Transition::all(TypeKind::Choice)
        .into_iter()
        .filter(|t| t.from.is_some())
        .collect::<Vec<_>>();
    let (before, after) = example_schemas(TypeKind::Choice, &transitions)?;
    let (before_codec, after_codec) = (example_codec(&before)?, example_codec(&after)?);

    let terminal = Transition::required_to_required(TypeKind::Choice);
    let terminal_index = transitions
        .iter()
        .position(|t| *t == terminal)
        .unwrap_or_default() as u64;
    let fallback = ChoiceValue::new(terminal_index, terminal.label());

    for (index, t) in transitions.iter().enumerate() {
        let index = index as u64;
        let needs_fallback = t.from.is_some_and(Modifier::needs_fallback);

        let mut value = ChoiceValue::new(index, t.label());
        if needs_fallback {
            value = value.with_fallback(fallback.clone());
        }

        let expected = match t.to {
            Some(_) => Ok(Value::Choice(ChoiceValue::new(index, t.label()))),
            None if needs_fallback => Ok(Value::Choice(fallback.clone())),
            None => Err(DecodeError::UnrecognizedVariantWithoutFallback {
                type_name: "Example".into(),
                index,
            }),
        };
        assert_eq!(
            transcode(&before_codec, &after_codec, &Value::Choice(value))?,
            expected,
            "{t}"
        );
    }

    let required_to_nonexistent = Transition::required_to_nonexistent(TypeKind::Choice);
    let report = check_compatibility(&before, &after);
    assert_eq!(report.len(), 1);
    assert!(matches!(
        &report[0],
        Incompatibility::Presence { index, .. }
            if transitions[*index as usize] == required_to_nonexistent
    ));

    Ok(())
}

/// `{a: true, b: "hi"}` read by a version that has dropped `b`.
pub fn run_dropped_field() -> Result<()> {
    let mut b = SchemaBuilder::new();
    let pair = b.declare_struct("Pair");
    b.field(pair, "a", 0, Modifier::Required, FieldType::Bool)?
        .field(pair, "b", 1, Modifier::Optional, FieldType::String)?;
    let v1 = b.finish()?;

    let mut b = SchemaBuilder::new();
    let pair = b.declare_struct("Pair");
    b.field(pair, "a", 0, Modifier::Required, FieldType::Bool)?;
    let v2 = b.finish()?;

    let value = Value::Struct(StructValue::new().with(0, true).with(1, "hi"));
    let (writer, reader) = (Codec::by_name(&v1, "Pair")?, Codec::by_name(&v2, "Pair")?);
    let decoded = transcode(&writer, &reader, &value)??;
    assert_eq!(decoded, Value::Struct(StructValue::new().with(0, true)));

    Ok(())
}
