use anyhow::Result;
use zcluster::{InterleavedKey, Interleaver, Value};

fn key2(z: &Interleaver, x: i64, y: i64) -> Result<InterleavedKey> {
    z.interleave(&[Value::Int64(x), Value::Int64(y)])
}

#[test]
fn deterministic_for_identical_input() -> Result<()> {
    let z = Interleaver::new(3)?;
    let coords = [Value::Int64(-12), Value::Float64(3.25), Value::Int64(99)];
    assert_eq!(z.interleave(&coords)?, z.interleave(&coords)?);
    Ok(())
}

#[test]
fn monotone_in_each_dimension() -> Result<()> {
    let z = Interleaver::new(2)?;
    // Hold y fixed, sweep x upward: keys must never decrease. Mapped Int64
    // values differ in their top bits at this magnitude, so no bucketing.
    let step = 1i64 << 40;
    for d in 0..2 {
        let mut prev = None;
        for i in -100..100 {
            let coord = i * step;
            let key = if d == 0 {
                key2(&z, coord, 12_345)?
            } else {
                key2(&z, 12_345, coord)?
            };
            if let Some(p) = prev {
                assert!(key >= p, "dimension {d} broke monotonicity at {coord}");
            }
            prev = Some(key);
        }
    }
    Ok(())
}

#[test]
fn negative_coordinates_precede_positive() -> Result<()> {
    let z = Interleaver::new(2)?;
    assert!(key2(&z, i64::MIN, 0)? < key2(&z, 0, 0)?);
    assert!(key2(&z, 0, -1 << 40)? < key2(&z, 0, 1 << 40)?);
    Ok(())
}

#[test]
fn float_dimensions_order_correctly() -> Result<()> {
    let z = Interleaver::new(2)?;
    let k = |x: f64, y: f64| z.interleave(&[Value::Float64(x), Value::Float64(y)]);
    assert!(k(-100.0, 0.0)? < k(100.0, 0.0)?);
    assert!(k(0.0, 1.0)? <= k(0.0, 2.0)?);
    assert!(k(f64::NAN, 0.0).is_err());
    Ok(())
}

#[test]
fn truncation_at_the_bit_budget_buckets_values() -> Result<()> {
    // 8 dimensions leave an 8-bit budget: only the top byte of each mapped
    // coordinate survives.
    let z = Interleaver::new(8)?;
    assert_eq!(z.per_dim_bits(), 8);
    let coords = |lead: u64| -> Vec<Value> {
        (0..8)
            .map(|d| Value::UInt64((lead << 56) | d))
            .collect()
    };
    let a = z.interleave(&coords(0x12))?;
    let b = z.interleave(&coords(0x12))?;
    assert_eq!(a, b);
    let c = z.interleave(&coords(0x13))?;
    assert!(c > a);
    Ok(())
}

#[test]
fn locality_nearby_points_get_nearby_keys() -> Result<()> {
    let z = Interleaver::new(2)?;
    let base = key2(&z, 500 << 32, 500 << 32)?;
    let near = key2(&z, 501 << 32, 500 << 32)?;
    let far = key2(&z, (500 << 32) * 2, (500 << 32) * 2)?;
    assert!(near.raw().abs_diff(base.raw()) < far.raw().abs_diff(base.raw()));
    Ok(())
}

#[test]
fn mixed_dimension_types_interleave() -> Result<()> {
    let z = Interleaver::new(3)?;
    let key = z.interleave(&[
        Value::Int32(-5),
        Value::Text("abc".into()),
        Value::Float64(1.5),
    ])?;
    let again = z.interleave(&[
        Value::Int32(-5),
        Value::Text("abc".into()),
        Value::Float64(1.5),
    ])?;
    assert_eq!(key, again);
    Ok(())
}
