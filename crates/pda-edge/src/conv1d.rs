use pda_core::{BorderMode, map_index};

/// Correlates `signal` with a symmetric `kernel` of length `2 * radius + 1`.
pub fn convolve_f32(
    signal: &[f32],
    kernel: &[f32],
    radius: usize,
    border: BorderMode,
    out: &mut [f32],
) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");
    assert_eq!(
        kernel.len(),
        2 * radius + 1,
        "kernel len must be 2*radius+1"
    );

    let n = signal.len();
    if n == 0 {
        return;
    }

    // Interior samples never touch the border.
    let interior = radius..n.saturating_sub(radius);
    for (i, out_i) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        if interior.contains(&i) {
            let base = i - radius;
            for (k, &kv) in kernel.iter().enumerate() {
                acc += signal[base + k] * kv;
            }
        } else {
            for (k, &kv) in kernel.iter().enumerate() {
                let idx = i as isize - radius as isize + k as isize;
                let v = map_index(idx, n, border).map_or(0.0, |j| signal[j]);
                acc += v * kv;
            }
        }
        *out_i = acc;
    }
}
