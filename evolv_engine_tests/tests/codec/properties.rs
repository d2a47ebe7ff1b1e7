use evolv_engine::Codec;
use evolv_types::schema::{FieldType, Modifier, Schema, SchemaBuilder};
use evolv_types::value::{ChoiceValue, StructValue, Value};
use proptest::prelude::*;

fn sample_schema() -> Schema {
    let mut b = SchemaBuilder::new();
    let sample = b.declare_struct("Sample");
    let shape = b.declare_choice("Shape");
    b.field(shape, "circle", 0, Modifier::Required, FieldType::F64)
        .unwrap()
        .field(shape, "label", 1, Modifier::Asymmetric, FieldType::String)
        .unwrap()
        .field(
            shape,
            "points",
            2,
            Modifier::Optional,
            FieldType::array_of(FieldType::S64),
        )
        .unwrap();
    let fields = [
        ("id", Modifier::Required, FieldType::U64),
        ("name", Modifier::Asymmetric, FieldType::String),
        ("score", Modifier::Optional, FieldType::F64),
        ("deltas", Modifier::Optional, FieldType::array_of(FieldType::S64)),
        ("blob", Modifier::Optional, FieldType::Bytes),
        ("shape", Modifier::Optional, FieldType::Custom(shape)),
        ("flags", Modifier::Optional, FieldType::array_of(FieldType::Unit)),
        (
            "children",
            Modifier::Optional,
            FieldType::array_of(FieldType::Custom(sample)),
        ),
    ];
    for (index, (name, modifier, ty)) in fields.into_iter().enumerate() {
        b.field(sample, name, index as u64, modifier, ty).unwrap();
    }
    b.finish().unwrap()
}

/// The version of `Sample` before anything but `id` was added.
fn sample_schema_v0() -> Schema {
    let mut b = SchemaBuilder::new();
    let sample = b.declare_struct("Sample");
    b.field(sample, "id", 0, Modifier::Required, FieldType::U64)
        .unwrap();
    b.finish().unwrap()
}

fn arb_f64() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(-0.0), -1e12f64..1e12f64]
}

fn arb_shape() -> impl Strategy<Value = ChoiceValue> {
    let circle = arb_f64().prop_map(|r| ChoiceValue::new(0, r));
    let label = (".{0,12}", arb_f64()).prop_map(|(s, r)| {
        ChoiceValue::new(1, s).with_fallback(ChoiceValue::new(0, r))
    });
    let points = (prop::collection::vec(any::<i64>(), 0..6), arb_f64()).prop_map(|(ps, r)| {
        let ps = ps.into_iter().map(Value::from).collect::<Vec<_>>();
        ChoiceValue::new(2, Value::Array(ps)).with_fallback(ChoiceValue::new(0, r))
    });
    prop_oneof![circle, label, points]
}

fn arb_sample(children: BoxedStrategy<Vec<Value>>) -> impl Strategy<Value = StructValue> {
    (
        any::<u64>(),
        ".{0,16}",
        prop::option::of(arb_f64()),
        prop::option::of(prop::collection::vec(any::<i64>(), 0..8)),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
        prop::option::of(arb_shape()),
        prop::option::of(0usize..300),
        prop::option::of(children),
    )
        .prop_map(|(id, name, score, deltas, blob, shape, flags, children)| {
            let mut sv = StructValue::new().with(0, id).with(1, name);
            if let Some(score) = score {
                sv = sv.with(2, score);
            }
            if let Some(deltas) = deltas {
                let deltas = deltas.into_iter().map(Value::from).collect::<Vec<_>>();
                sv = sv.with(3, Value::Array(deltas));
            }
            if let Some(blob) = blob {
                sv = sv.with(4, blob);
            }
            if let Some(shape) = shape {
                sv = sv.with(5, shape);
            }
            if let Some(flags) = flags {
                sv = sv.with(6, Value::Array(vec![Value::Unit; flags]));
            }
            if let Some(children) = children {
                sv = sv.with(7, Value::Array(children));
            }
            sv
        })
}

fn arb_tree() -> impl Strategy<Value = Value> {
    let leaves = prop::collection::vec(
        arb_sample(Just(vec![]).boxed()).prop_map(Value::Struct),
        0..3,
    )
    .boxed();
    arb_sample(leaves).prop_map(Value::Struct)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_round_trip_drops_only_fallbacks(value in arb_tree()) {
        let schema = sample_schema();
        let codec = Codec::by_name(&schema, "Sample").unwrap();

        let bytes = codec.serialize(&value).unwrap();
        prop_assert_eq!(codec.deserialize(&bytes), Ok(value.without_fallbacks()));
    }

    #[test]
    fn prop_plan_matches_output(value in arb_tree(), offset in 0usize..8) {
        let schema = sample_schema();
        let codec = Codec::by_name(&schema, "Sample").unwrap();

        let plan = codec.plan(&value).unwrap();
        prop_assert_eq!(&codec.plan(&value).unwrap(), &plan);

        let bytes = codec.serialize(&value).unwrap();
        prop_assert_eq!(bytes.len(), plan.total_size());

        let mut buf = vec![0u8; offset + plan.total_size()];
        let end = codec.write(&mut buf, offset, &value, &plan).unwrap();
        prop_assert_eq!(end, buf.len());
        prop_assert_eq!(&buf[offset..], &bytes[..]);
    }

    #[test]
    fn prop_old_reader_sees_its_own_fields(value in arb_tree()) {
        let schema = sample_schema();
        let old_schema = sample_schema_v0();
        let codec = Codec::by_name(&schema, "Sample").unwrap();
        let old_codec = Codec::by_name(&old_schema, "Sample").unwrap();

        let id = match &value {
            Value::Struct(sv) => sv.get(0).cloned(),
            _ => None,
        };
        let bytes = codec.serialize(&value).unwrap();
        let decoded = old_codec.deserialize(&bytes).unwrap();
        prop_assert_eq!(
            decoded,
            Value::Struct(StructValue::new().with(0, id.unwrap_or(Value::U64(0))))
        );
    }
}
