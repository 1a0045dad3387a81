/// Evenly spaced values over `[start, end]`, both ends included.
pub fn linspace(start: f32, end: f32, num: usize) -> Vec<f32> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end as f64 - start as f64) / (num - 1) as f64;
            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        end
                    } else {
                        (start as f64 + step * i as f64) as f32
                    }
                })
                .collect()
        }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some((values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64) as f32)
    }
}
