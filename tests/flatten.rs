use anyhow::Result;
use zcluster::{ElementType, FlattenedReservoir, Reservoir, Value};

fn filled(element_type: ElementType, values: Vec<Value>, partition_num: usize) -> Result<Reservoir> {
    let mut r = Reservoir::new(element_type, 60, partition_num, 3)?;
    for v in values {
        r.insert(v)?;
    }
    Ok(r)
}

fn sorted_debug(elements: &[Value]) -> Vec<String> {
    let mut out: Vec<String> = elements.iter().map(|v| format!("{v:?}")).collect();
    out.sort();
    out
}

fn assert_round_trip(r: Reservoir) -> Result<()> {
    let capacity = r.capacity();
    let partition_num = r.partition_num();
    let count_seen = r.count_seen();
    let elements = sorted_debug(r.elements());

    let flat = r.flatten()?;
    let back = flat.unflatten()?;

    assert_eq!(back.capacity(), capacity);
    assert_eq!(back.partition_num(), partition_num);
    assert_eq!(back.count_seen(), count_seen);
    assert_eq!(sorted_debug(back.elements()), elements);
    Ok(())
}

#[test]
fn round_trips_pass_by_value_types() -> Result<()> {
    assert_round_trip(filled(
        ElementType::Int64,
        (-500..500).map(Value::Int64).collect(),
        4,
    )?)?;
    assert_round_trip(filled(
        ElementType::Float64,
        vec![
            Value::Float64(-1e300),
            Value::Float64(-0.0),
            Value::Float64(0.0),
            Value::Float64(2.5),
        ],
        2,
    )?)?;
    assert_round_trip(filled(
        ElementType::Int32,
        vec![Value::Int32(i32::MIN), Value::Int32(-1), Value::Int32(i32::MAX)],
        1,
    )?)
}

#[test]
fn round_trips_pass_by_reference_types() -> Result<()> {
    assert_round_trip(filled(
        ElementType::Text,
        vec![
            Value::Text(String::new()),
            Value::Text("short".into()),
            Value::Text("a considerably longer string value".into()),
        ],
        2,
    )?)?;
    assert_round_trip(filled(
        ElementType::Bytes,
        vec![
            Value::Bytes(Vec::new()),
            Value::Bytes(vec![0xFF; 300]),
            Value::Bytes(vec![1, 2, 3]),
        ],
        3,
    )?)
}

#[test]
fn round_trips_coordinate_records() -> Result<()> {
    let rows = (0..50)
        .map(|i| Value::Record(vec![Value::Int64(i), Value::Float64(f64::from(i as i32) * 0.5)]))
        .collect();
    assert_round_trip(filled(ElementType::Record, rows, 4)?)
}

#[test]
fn round_trips_the_empty_reservoir() -> Result<()> {
    assert_round_trip(Reservoir::new(ElementType::Text, 10, 2, 1)?)
}

#[test]
fn round_trips_at_full_capacity() -> Result<()> {
    let mut r = Reservoir::new(ElementType::Int64, 25, 4, 7)?;
    for i in 0..100_000 {
        r.insert(Value::Int64(i))?;
    }
    assert_eq!(r.len(), r.capacity());
    assert_round_trip(r)
}

#[test]
fn flattened_block_survives_a_byte_copy() -> Result<()> {
    let r = filled(
        ElementType::Text,
        (0..20).map(|i| Value::Text(format!("value-{i}"))).collect(),
        2,
    )?;
    let flat = r.flatten()?;

    // Simulate a transport hop: only the bytes cross.
    let wire: Vec<u8> = flat.as_bytes().to_vec();
    let received = FlattenedReservoir::from_bytes(wire)?;

    assert_eq!(received.element_count(), flat.element_count());
    assert_eq!(received.input_size(), flat.input_size());
    for i in 0..flat.element_count() {
        assert_eq!(received.element(i)?, flat.element(i)?);
    }
    Ok(())
}

#[test]
fn elements_readable_without_unflattening() -> Result<()> {
    // Consumers must handle the offset form directly.
    let r = filled(
        ElementType::Bytes,
        vec![Value::Bytes(vec![9, 9]), Value::Bytes(vec![1])],
        1,
    )?;
    let flat = r.flatten()?;
    assert_eq!(flat.element(0)?, Value::Bytes(vec![9, 9]));
    assert_eq!(flat.element(1)?, Value::Bytes(vec![1]));
    assert!(flat.element(2).is_err());
    Ok(())
}

#[test]
fn rejects_truncated_blocks() -> Result<()> {
    let flat = filled(ElementType::Int64, (0..10).map(Value::Int64).collect(), 1)?.flatten()?;
    let bytes = flat.into_bytes();
    for cut in [0, 8, 31, bytes.len() - 1] {
        let mut truncated = bytes.clone();
        truncated.truncate(cut);
        assert!(
            FlattenedReservoir::from_bytes(truncated).is_err(),
            "block truncated to {cut} bytes was accepted"
        );
    }
    Ok(())
}

#[test]
fn rejects_inflated_size_declaration() -> Result<()> {
    let flat = filled(ElementType::Int64, (0..4).map(Value::Int64).collect(), 1)?.flatten()?;
    let mut bytes = flat.into_bytes();
    let declared = (bytes.len() as u32 + 64).to_le_bytes();
    bytes[0..4].copy_from_slice(&declared);
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());
    Ok(())
}

#[test]
fn rejects_corrupt_headers() -> Result<()> {
    let flat = filled(ElementType::Text, vec![Value::Text("x".into())], 1)?.flatten()?;
    let pristine = flat.into_bytes();

    // Unknown element type tag.
    let mut bytes = pristine.clone();
    bytes[24] = 0xAB;
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());

    // Width disagrees with the element type.
    let mut bytes = pristine.clone();
    bytes[25..27].copy_from_slice(&8i16.to_le_bytes());
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());

    // By-value flag disagrees with the element type.
    let mut bytes = pristine.clone();
    bytes[27] = 1;
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());

    // Flattened tag cleared.
    let mut bytes = pristine;
    bytes[28] = 0;
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());
    Ok(())
}

#[test]
fn rejects_offsets_outside_the_data_region() -> Result<()> {
    let flat = filled(
        ElementType::Bytes,
        vec![Value::Bytes(vec![1, 2, 3]), Value::Bytes(vec![4])],
        1,
    )?
    .flatten()?;
    let mut bytes = flat.into_bytes();
    // First slot starts right after the 32-byte header.
    bytes[32..40].copy_from_slice(&(1u64 << 40).to_le_bytes());
    assert!(FlattenedReservoir::from_bytes(bytes).is_err());
    Ok(())
}

#[test]
fn merge_works_across_a_flatten_hop() -> Result<()> {
    let a = filled(ElementType::Int64, (0..500).map(Value::Int64).collect(), 2)?;
    let b = filled(ElementType::Int64, (500..900).map(Value::Int64).collect(), 2)?;

    let wire_a = a.flatten()?.into_bytes();
    let wire_b = b.flatten()?.into_bytes();

    let mut merged = FlattenedReservoir::from_bytes(wire_a)?.unflatten()?;
    merged.combine(FlattenedReservoir::from_bytes(wire_b)?.unflatten()?)?;
    assert_eq!(merged.count_seen(), 900);
    assert_eq!(merged.capacity(), 240);
    // a kept whole (120), b thinned to a's lower rate: ~216 expected.
    assert!(
        (190..=240).contains(&merged.len()),
        "merged length {} far from the expected ~216",
        merged.len()
    );
    Ok(())
}
