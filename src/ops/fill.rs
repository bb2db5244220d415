// ============================================================================
// FLOOD FILL — exact-colour region fill with 4- or 8-connectivity
// ============================================================================

use image::Rgba;

use crate::canvas::{PixelPos, PixelRect, RasterBuffer};

/// Neighbour rule used when growing a fill region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// Axis-aligned neighbours only.
    #[default]
    Four,
    /// Axis-aligned plus diagonal neighbours.
    Eight,
}

const NEIGHBORS_4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

impl Connectivity {
    /// `4` or `8`; anything else is rejected.
    pub fn from_count(n: u8) -> Option<Self> {
        match n {
            4 => Some(Connectivity::Four),
            8 => Some(Connectivity::Eight),
            _ => None,
        }
    }

    pub fn count(self) -> u8 {
        match self {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }

    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Connectivity::Four => &NEIGHBORS_4,
            Connectivity::Eight => &NEIGHBORS_8,
        }
    }
}

/// Whether filling at `start` with `fill_color` would change anything.
pub fn fill_applies(buffer: &RasterBuffer, start: PixelPos, fill_color: Rgba<u8>) -> bool {
    matches!(buffer.pixel_at(start), Some(target) if target != fill_color)
}

/// Replace the connected region of `start`'s colour with `fill_color`.
///
/// Uses an explicit DFS stack of flat indices plus a visited array sized to
/// the buffer, so depth never depends on region size.  Returns the bounding
/// box of the filled pixels, or `None` when the fill was a no-op (start out
/// of bounds, or target colour already equal to the fill colour).
pub fn flood_fill(
    buffer: &mut RasterBuffer,
    start: PixelPos,
    fill_color: Rgba<u8>,
    connectivity: Connectivity,
) -> Option<PixelRect> {
    let target_color = buffer.pixel_at(start)?;
    if target_color == fill_color {
        return None;
    }

    let w = buffer.width() as i32;
    let h = buffer.height() as i32;
    let wu = w as usize;
    let mut visited = vec![false; wu * h as usize];

    let mut min_x = start.x;
    let mut min_y = start.y;
    let mut max_x = start.x;
    let mut max_y = start.y;

    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    stack.push((start.y as usize * wu + start.x as usize) as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        if visited[idx] {
            continue;
        }
        let x = (idx % wu) as i32;
        let y = (idx / wu) as i32;
        if buffer.get_pixel(x as u32, y as u32) != target_color {
            continue;
        }
        buffer.put_pixel(x as u32, y as u32, fill_color);
        visited[idx] = true;

        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        for &(dx, dy) in connectivity.offsets() {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                continue;
            }
            let ni = ny as usize * wu + nx as usize;
            if !visited[ni] {
                stack.push(ni as u32);
            }
        }
    }

    Some(PixelRect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    /// 5×5 white grid with a black anti-diagonal from (0,4) to (4,0).
    fn diagonal_wall() -> RasterBuffer {
        let mut buf = RasterBuffer::new_filled(5, 5, WHITE);
        for i in 0..5 {
            buf.put_pixel(i, 4 - i, BLACK);
        }
        buf
    }

    #[test]
    fn four_connectivity_stops_at_diagonal_wall() {
        let mut buf = diagonal_wall();
        let bbox = flood_fill(&mut buf, PixelPos::new(0, 0), RED, Connectivity::Four);
        assert_eq!(bbox, Some(PixelRect::new(0, 0, 4, 4)));
        assert_eq!(buf.get_pixel(0, 0), RED);
        assert_eq!(buf.get_pixel(3, 0), RED);
        assert_eq!(buf.get_pixel(4, 4), WHITE);
        assert_eq!(buf.get_pixel(2, 2), BLACK);
    }

    #[test]
    fn eight_connectivity_leaks_through_diagonal_gaps() {
        let mut buf = diagonal_wall();
        flood_fill(&mut buf, PixelPos::new(0, 0), RED, Connectivity::Eight);
        assert_eq!(buf.get_pixel(4, 4), RED);
        assert_eq!(buf.get_pixel(2, 2), BLACK);
    }

    #[test]
    fn same_color_is_noop() {
        let mut buf = diagonal_wall();
        let before = buf.clone();
        assert!(flood_fill(&mut buf, PixelPos::new(0, 0), WHITE, Connectivity::Four).is_none());
        assert_eq!(buf, before);
        assert!(!fill_applies(&buf, PixelPos::new(0, 0), WHITE));
    }

    #[test]
    fn out_of_bounds_is_noop() {
        let mut buf = diagonal_wall();
        let before = buf.clone();
        for p in [PixelPos::new(-1, 0), PixelPos::new(0, 5), PixelPos::new(9, 9)] {
            assert!(flood_fill(&mut buf, p, RED, Connectivity::Eight).is_none());
        }
        assert_eq!(buf, before);
    }

    #[test]
    fn large_fill_does_not_recurse() {
        let mut buf = RasterBuffer::new_filled(1024, 1024, WHITE);
        flood_fill(&mut buf, PixelPos::new(512, 512), RED, Connectivity::Four);
        assert!(buf.as_rgba_image().pixels().all(|p| *p == RED));
    }

    #[test]
    fn connectivity_counts_round_trip() {
        assert_eq!(Connectivity::from_count(4), Some(Connectivity::Four));
        assert_eq!(Connectivity::from_count(8).map(Connectivity::count), Some(8));
        assert_eq!(Connectivity::from_count(6), None);
    }
}
