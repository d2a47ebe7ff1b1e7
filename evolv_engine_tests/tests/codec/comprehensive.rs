use super::helpers::{assert_round_trip, transcode};
use anyhow::Result;
use evolv_engine::Codec;
use evolv_types::schema::{FieldType, Modifier, Schema, SchemaBuilder, TypeId};
use evolv_types::value::{ChoiceValue, StructValue, Value};
use std::f64::consts::{E, PI};

const FOO_FIELD_COUNT: usize = 11;

/// One field of each shape, repeated in each modifier group.
fn foo_fields() -> [(&'static str, FieldType); FOO_FIELD_COUNT] {
    [
        ("p", FieldType::array_of(FieldType::Unit)),
        ("q", FieldType::array_of(FieldType::F64)),
        ("r", FieldType::array_of(FieldType::S64)),
        (
            "s",
            FieldType::array_of(FieldType::array_of(FieldType::String)),
        ),
        ("t", FieldType::Bool),
        ("u", FieldType::Bytes),
        ("v", FieldType::F64),
        ("w", FieldType::S64),
        ("x", FieldType::String),
        ("y", FieldType::U64),
        ("z", FieldType::Unit),
    ]
}

const GROUPS: [(&str, Modifier); 3] = [
    ("required", Modifier::Required),
    ("asymmetric", Modifier::Asymmetric),
    ("optional", Modifier::Optional),
];

fn schema() -> Result<(Schema, TypeId)> {
    let mut b = SchemaBuilder::new();
    let foo = b.declare_struct("Foo");
    let bar = b.declare_struct("Bar");
    let foo_and_bar = b.declare_struct("FooAndBar");
    let foo_or_bar = b.declare_choice("FooOrBar");

    for (group, (group_name, modifier)) in GROUPS.into_iter().enumerate() {
        for (i, (name, ty)) in foo_fields().into_iter().enumerate() {
            let index = (group * FOO_FIELD_COUNT + i) as u64;
            b.field(foo, format!("{name}_{group_name}"), index, modifier, ty)?;
        }
    }
    b.field(bar, "q", 0, Modifier::Required, FieldType::F64)?
        .field(bar, "x", 1, Modifier::Optional, FieldType::String)?;
    b.field(foo_and_bar, "foo", 0, Modifier::Required, FieldType::Custom(foo))?
        .field(foo_and_bar, "bar", 1, Modifier::Required, FieldType::Custom(bar))?;
    b.field(foo_or_bar, "foo", 0, Modifier::Required, FieldType::Custom(foo))?
        .field(foo_or_bar, "bar", 1, Modifier::Asymmetric, FieldType::Custom(bar))?;

    Ok((b.finish()?, foo))
}

fn foo_group_values() -> Vec<Value> {
    let strings = |words: [&str; 2]| Value::Array(words.map(Value::from).to_vec());
    vec![
        Value::Array(vec![Value::Unit; 3]),
        Value::Array(vec![
            f64::NEG_INFINITY.into(),
            f64::INFINITY.into(),
            (-0.0f64).into(),
        ]),
        Value::Array(vec![i64::MIN.into(), 0i64.into(), i64::MAX.into()]),
        Value::Array(vec![
            strings(["Hello", "World"]),
            strings(["Hello", "Earth"]),
            strings(["Hello", "Planet"]),
        ]),
        true.into(),
        vec![0u8, 42, 255].into(),
        PI.into(),
        i64::MAX.into(),
        "Hello, World!".into(),
        u64::MAX.into(),
        Value::Unit,
    ]
}

/// Fields of the required and asymmetric groups, and of the optional group if asked.
fn foo(with_optional: bool) -> StructValue {
    let groups = if with_optional { 3 } else { 2 };
    let mut sv = StructValue::new();
    for group in 0..groups {
        for (i, value) in foo_group_values().into_iter().enumerate() {
            sv = sv.with((group * FOO_FIELD_COUNT + i) as u64, value);
        }
    }
    sv
}

fn bar() -> StructValue {
    StructValue::new().with(0, E).with(1, "Hello, World!")
}

pub fn run() -> Result<()> {
    let (schema, foo_id) = schema()?;

    let foo_codec = Codec::new(&schema, foo_id)?;
    assert_round_trip(&foo_codec, &Value::Struct(foo(false)))?;
    assert_round_trip(&foo_codec, &Value::Struct(foo(true)))?;

    let bar_codec = Codec::by_name(&schema, "Bar")?;
    assert_round_trip(&bar_codec, &Value::Struct(bar()))?;
    assert_round_trip(&bar_codec, &Value::Struct(StructValue::new().with(0, 0.0f64)))?;

    let both = Codec::by_name(&schema, "FooAndBar")?;
    assert_round_trip(
        &both,
        &Value::Struct(StructValue::new().with(0, foo(true)).with(1, bar())),
    )?;

    let either = Codec::by_name(&schema, "FooOrBar")?;
    assert_round_trip(&either, &Value::Choice(ChoiceValue::new(0, foo(false))))?;
    let bar_with_fallback =
        Value::Choice(ChoiceValue::new(1, bar()).with_fallback(ChoiceValue::new(0, foo(true))));
    assert_round_trip(&either, &bar_with_fallback)?;

    /* A struct read as its own first version: only the required group. */
    let mut b = SchemaBuilder::new();
    let foo_v0 = b.declare_struct("Foo");
    for (i, (name, ty)) in foo_fields().into_iter().enumerate() {
        b.field(foo_v0, format!("{name}_required"), i as u64, Modifier::Required, ty)?;
    }
    let v0 = b.finish()?;
    let v0_codec = Codec::new(&v0, foo_v0)?;

    let decoded = transcode(&foo_codec, &v0_codec, &Value::Struct(foo(true)))??;
    let mut required_only = foo(false);
    required_only
        .fields
        .retain(|index, _| *index < FOO_FIELD_COUNT as u64);
    assert_eq!(decoded, Value::Struct(required_only));

    Ok(())
}
