#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    Replicate,
    Reflect101,
}

/// Maps a possibly out-of-range index into `0..len`.
///
/// Returns `None` only for empty signals.
pub fn map_index(i: isize, len: usize, mode: BorderMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if (0..len as isize).contains(&i) {
        return Some(i as usize);
    }

    match mode {
        BorderMode::Replicate => Some(if i < 0 { 0 } else { len - 1 }),
        BorderMode::Reflect101 => {
            if len == 1 {
                return Some(0);
            }
            let period = (2 * len - 2) as isize;
            let r = i.rem_euclid(period) as usize;
            Some(if r < len { r } else { period as usize - r })
        }
    }
}
