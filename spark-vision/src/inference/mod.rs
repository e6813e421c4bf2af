pub mod sam;
pub mod yolo;

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Index and value of the largest element, keeping the first on ties.
pub(crate) fn argmax(values: impl IntoIterator<Item = f32>) -> Option<(usize, f32)> {
    values
        .into_iter()
        .enumerate()
        .fold(None, |best, (index, value)| match best {
            _ if value.is_nan() => best,
            Some((_, max)) if value <= max => best,
            _ => Some((index, value)),
        })
}
