//! Deterministic shuffling and stratified train/test splitting.

/// Shuffles indices in place with a seeded Fisher-Yates pass.
///
/// Uses a splitmix64 step as the random source so the shuffle is fully
/// deterministic for a given seed, with no RNG state outside this call.
pub fn shuffle_indices(indices: &mut [usize], seed: u64) {
    let mut state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);

    for i in (1..indices.len()).rev() {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;

        let j = (z as usize) % (i + 1);
        indices.swap(i, j);
    }
}

/// Splits sample indices into (train, test) stratified by label.
///
/// Each class contributes `test_fraction` of its members (rounded, at
/// least one once the class has two members) to the test split, so label
/// skew in the dataset is mirrored in the held-out set. The same seed
/// always produces the same split.
#[must_use]
pub fn stratified_split(
    labels: &[bool],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == class)
            .map(|(index, _)| index)
            .collect();

        shuffle_indices(&mut members, seed.wrapping_add(u64::from(class)));

        let held_out = if members.len() < 2 {
            0
        } else {
            let proportional = (members.len() as f64 * test_fraction).round() as usize;
            proportional.clamp(1, members.len() - 1)
        };

        test.extend(members.drain(..held_out));
        train.extend(members);
    }

    train.sort_unstable();
    test.sort_unstable();

    (train, test)
}
