use std::collections::VecDeque;

use pda_core::{Image, ImageView};

// Neighbour offsets, counter-clockwise on screen starting east.
const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
const WEST: usize = 4;

/// Closed outer border of one component, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(usize, usize)>,
}

struct Mask<'a> {
    w: usize,
    h: usize,
    fg: &'a [bool],
}

impl Mask<'_> {
    fn is_fg(&self, x: isize, y: isize) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.w
            && (y as usize) < self.h
            && self.fg[y as usize * self.w + x as usize]
    }

    fn step(p: (usize, usize), dir: usize) -> (isize, isize) {
        (p.0 as isize + DX[dir], p.1 as isize + DY[dir])
    }

    fn fg_at(&self, p: (usize, usize), dir: usize) -> Option<(usize, usize)> {
        let (x, y) = Self::step(p, dir);
        self.is_fg(x, y).then_some((x as usize, y as usize))
    }
}

fn direction(from: (usize, usize), to: (usize, usize)) -> usize {
    let dx = to.0 as isize - from.0 as isize;
    let dy = to.1 as isize - from.1 as isize;
    (0..8)
        .find(|&d| DX[d] == dx && DY[d] == dy)
        .unwrap_or(WEST)
}

/// Outer borders of all top-level components, in raster order of their
/// first pixel.
pub fn find_external_contours(mask: &ImageView<'_, u8>) -> Vec<Contour> {
    let (w, h) = (mask.width(), mask.height());
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let mut fg = Vec::with_capacity(w * h);
    for row in mask.rows() {
        fg.extend(row.iter().map(|&v| v != 0));
    }
    let outside = outside_background(&fg, w, h);
    let m = Mask { w, h, fg: &fg };

    let mut labelled = vec![false; w * h];
    let mut queue = Vec::new();
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !fg[idx] || labelled[idx] {
                continue;
            }

            // First pixel of a new component in raster order: its west
            // neighbour is background, and that background reaches the image
            // border unless the component sits inside a hole.
            let top_level = x == 0 || outside[idx - 1];
            flood_component(&m, (x, y), &mut labelled, &mut queue);
            if top_level {
                contours.push(trace_outer(&m, (x, y)));
            }
        }
    }

    contours
}

fn outside_background(fg: &[bool], w: usize, h: usize) -> Vec<bool> {
    let mut outside = vec![false; w * h];
    let mut queue = VecDeque::new();

    let seed = |x: usize, y: usize, outside: &mut Vec<bool>, q: &mut VecDeque<usize>| {
        let idx = y * w + x;
        if !fg[idx] && !outside[idx] {
            outside[idx] = true;
            q.push_back(idx);
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, h - 1, &mut outside, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        seed(w - 1, y, &mut outside, &mut queue);
    }

    while let Some(idx) = queue.pop_front() {
        let (x, y) = (idx % w, idx / w);
        for dir in [0usize, 2, 4, 6] {
            let nx = x as isize + DX[dir];
            let ny = y as isize + DY[dir];
            if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if !fg[nidx] && !outside[nidx] {
                outside[nidx] = true;
                queue.push_back(nidx);
            }
        }
    }

    outside
}

fn flood_component(
    m: &Mask<'_>,
    start: (usize, usize),
    labelled: &mut [bool],
    stack: &mut Vec<(usize, usize)>,
) {
    stack.clear();
    labelled[start.1 * m.w + start.0] = true;
    stack.push(start);

    while let Some(p) = stack.pop() {
        for dir in 0..8 {
            if let Some(q) = m.fg_at(p, dir) {
                let qidx = q.1 * m.w + q.0;
                if !labelled[qidx] {
                    labelled[qidx] = true;
                    stack.push(q);
                }
            }
        }
    }
}

/// Border following from the raster-first pixel of a component.
///
/// The first neighbour is searched clockwise from west, every later one
/// counter-clockwise starting just past the pixel we came from. The walk
/// ends when it is about to repeat its first move.
fn trace_outer(m: &Mask<'_>, start: (usize, usize)) -> Contour {
    let first = (0..8)
        .map(|k| (WEST + 8 - k) % 8)
        .find_map(|dir| m.fg_at(start, dir));
    let Some(second) = first else {
        return Contour {
            points: vec![start],
        };
    };

    let mut points = Vec::new();
    let (mut prev, mut cur) = (second, start);
    loop {
        let back = direction(cur, prev);
        let next = (1..=8)
            .map(|k| (back + k) % 8)
            .find_map(|dir| m.fg_at(cur, dir))
            .unwrap_or(prev);

        points.push(cur);
        if next == start && cur == second {
            break;
        }
        prev = cur;
        cur = next;
    }

    Contour { points }
}

/// Stamps every contour pixel with a `thickness`-wide square of `value`.
pub fn draw_contours(canvas: &mut Image<u8>, contours: &[Contour], thickness: usize, value: u8) {
    let (w, h) = (canvas.width(), canvas.height());
    let r = thickness / 2;

    for contour in contours {
        for &(x, y) in &contour.points {
            for yy in y.saturating_sub(r)..=(y + r).min(h.saturating_sub(1)) {
                for xx in x.saturating_sub(r)..=(x + r).min(w.saturating_sub(1)) {
                    if let Some(px) = canvas.get_mut(xx, yy) {
                        *px = value;
                    }
                }
            }
        }
    }
}

/// Copies `mask` (binarized to 0/255) and redraws its external contours on
/// top with the given thickness.
pub fn thicken_external_contours(mask: &ImageView<'_, u8>, thickness: usize) -> Image<u8> {
    let mut out = mask.map(|&v| if v != 0 { 255u8 } else { 0 });
    let contours = find_external_contours(mask);
    draw_contours(&mut out, &contours, thickness, 255);
    out
}
