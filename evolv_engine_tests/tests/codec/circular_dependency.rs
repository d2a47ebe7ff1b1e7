use super::helpers::assert_round_trip;
use anyhow::Result;
use evolv_engine::Codec;
use evolv_types::schema::{FieldType, Modifier, Schema, SchemaBuilder};
use evolv_types::value::{ChoiceValue, StructValue, Value};

/// `StructFromAbove` and `StructFromBelow` refer to each other, and their field names
/// collide with common keywords of generated code.
fn mutual_schema() -> Result<Schema> {
    let mut b = SchemaBuilder::new();
    let above = b.declare_struct("StructFromAbove");
    let below = b.declare_struct("StructFromBelow");
    b.field(above, "field", 0, Modifier::Required, FieldType::String)?
        .field(above, "size", 1, Modifier::Required, FieldType::String)?
        .field(above, "elements", 2, Modifier::Required, FieldType::String)?
        .field(above, "fallback", 3, Modifier::Required, FieldType::String)?
        .field(
            above,
            "below",
            4,
            Modifier::Optional,
            FieldType::Custom(below),
        )?;
    b.field(below, "x", 0, Modifier::Required, FieldType::Custom(above))?;
    b.finish()
}

fn above(below: Option<StructValue>) -> StructValue {
    let sv = StructValue::new()
        .with(0, "field")
        .with(1, "size")
        .with(2, "elements")
        .with(3, "fallback");
    match below {
        Some(below) => sv.with(4, below),
        None => sv,
    }
}

/// A rose tree: `Tree` is a leaf or a `Node`, and a `Node` holds more trees.
fn tree_schema() -> Result<Schema> {
    let mut b = SchemaBuilder::new();
    let tree = b.declare_choice("Tree");
    let node = b.declare_struct("Node");
    b.field(tree, "leaf", 0, Modifier::Required, FieldType::Unit)?
        .field(tree, "node", 1, Modifier::Required, FieldType::Custom(node))?;
    b.field(node, "label", 0, Modifier::Required, FieldType::U64)?
        .field(
            node,
            "children",
            1,
            Modifier::Optional,
            FieldType::array_of(FieldType::Custom(tree)),
        )?;
    b.finish()
}

fn tree(depth: u64) -> ChoiceValue {
    if depth == 0 {
        return ChoiceValue::new(0, ());
    }
    let children = (0..depth).map(|d| tree(d).into()).collect::<Vec<Value>>();
    let node = StructValue::new()
        .with(0, depth)
        .with(1, Value::Array(children));
    ChoiceValue::new(1, node)
}

pub fn run() -> Result<()> {
    let schema = mutual_schema()?;

    let codec = Codec::by_name(&schema, "StructFromAbove")?;
    assert_round_trip(&codec, &Value::Struct(above(None)))?;

    let codec = Codec::by_name(&schema, "StructFromBelow")?;
    let nested = StructValue::new().with(0, above(None));
    let twice = StructValue::new().with(0, above(Some(nested.clone())));
    assert_round_trip(&codec, &Value::Struct(nested))?;
    assert_round_trip(&codec, &Value::Struct(twice))?;

    let schema = tree_schema()?;
    let codec = Codec::by_name(&schema, "Tree")?;
    for depth in 0..5 {
        assert_round_trip(&codec, &Value::Choice(tree(depth)))?;
    }

    Ok(())
}
