use anyhow::Result;
use zcluster::{BoundaryList, ElementType, InterleavedKey, Interleaver, Reservoir, Value};

fn k(raw: u64) -> InterleavedKey {
    InterleavedKey::from_raw(raw)
}

#[test]
fn assignment_table_from_fixed_boundaries() -> Result<()> {
    let bounds = BoundaryList::from_boundaries(vec![k(10), k(20), k(30)])?;
    assert_eq!(bounds.partition_num(), 4);

    // below-first, exact-first, between, exact-last, above-last
    assert_eq!(bounds.assign(k(5)), 0);
    assert_eq!(bounds.assign(k(10)), 0);
    assert_eq!(bounds.assign(k(15)), 1);
    assert_eq!(bounds.assign(k(20)), 1);
    assert_eq!(bounds.assign(k(30)), 2);
    assert_eq!(bounds.assign(k(99)), 3);
    Ok(())
}

#[test]
fn extremes_assign_to_the_outer_partitions() -> Result<()> {
    let bounds = BoundaryList::from_boundaries(vec![k(100), k(200)])?;
    assert_eq!(bounds.assign(InterleavedKey::MIN), 0);
    assert_eq!(bounds.assign(InterleavedKey::MAX), 2);
    Ok(())
}

#[test]
fn every_key_lands_in_range() -> Result<()> {
    let keys: Vec<_> = (0..1_000).map(|i| k(i * 7919)).collect();
    let bounds = BoundaryList::from_keys(keys, 8)?;
    assert_eq!(bounds.as_slice().len(), 7);
    assert!(bounds.as_slice().windows(2).all(|w| w[0] <= w[1]));
    for i in 0..10_000 {
        assert!(bounds.assign(k(i * 997)) < 8);
    }
    Ok(())
}

#[test]
fn boundaries_from_a_reservoir_sample() -> Result<()> {
    let interleaver = Interleaver::new(1)?;
    let mut r = Reservoir::new(ElementType::UInt64, 60, 4, 21)?;
    for i in 0..50_000u64 {
        r.insert(Value::UInt64(i << 32))?;
    }
    let bounds = r.extract_boundaries(&interleaver)?;
    assert_eq!(bounds.partition_num(), 4);
    assert!(bounds.as_slice().windows(2).all(|w| w[0] <= w[1]));

    // Quantile cut points of a uniform stream should sit near the quartiles.
    for (i, b) in bounds.as_slice().iter().enumerate() {
        let approx_value = b.raw() >> 32;
        let expected = (i as u64 + 1) * 50_000 / 4;
        assert!(
            approx_value.abs_diff(expected) < 8_000,
            "boundary {i} at {approx_value}, expected near {expected}"
        );
    }
    Ok(())
}

#[test]
fn duplicate_heavy_samples_still_assign_totally() -> Result<()> {
    // A constant stream collapses every boundary onto one key.
    let keys = vec![k(42); 500];
    let bounds = BoundaryList::from_keys(keys, 4)?;
    assert_eq!(bounds.as_slice(), &[k(42), k(42), k(42)]);
    assert_eq!(bounds.assign(k(41)), 0);
    assert_eq!(bounds.assign(k(42)), 0);
    assert_eq!(bounds.assign(k(43)), 3);
    Ok(())
}
