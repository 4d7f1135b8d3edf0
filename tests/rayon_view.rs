#![cfg(feature = "rayon")]

use field_mirror::prelude::*;
use rayon::prelude::*;

mod util;
use util::{scalar_field, simulated};

#[test]
fn parallel_consumers_share_one_view() -> Result<(), MirrorError> {
    let field = scalar_field(1000);
    let arr = ArrayInterface::<i32>::new(&field, simulated())?;
    let view = arr.accessor(MemorySpace::Device, "")?;

    let sum: i64 = view.par_iter().map(i64::from).sum();
    assert_eq!(sum, (0..1000i64).sum::<i64>());

    let doubled: Vec<i32> = (0..view.len())
        .into_par_iter()
        .map(|i| view[i] * 2)
        .collect();
    assert_eq!(doubled[999], 1998);
    Ok(())
}
