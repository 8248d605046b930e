use nalgebra::Point2;

use crate::mask::Mask;

/// One connected foreground region.
#[derive(Clone, Copy, Debug)]
pub struct Blob {
    /// Pixel count.
    pub area: f32,
    /// Area-weighted centroid (mean of member pixel centers).
    pub centroid: Point2<f32>,
    /// Inclusive bounding box: (min_x, min_y, max_x, max_y).
    pub bbox: (usize, usize, usize, usize),
    /// Count of member pixels with at least one 4-neighbor outside the
    /// region (or outside the frame).
    pub perimeter: f32,
}

impl Blob {
    /// Isoperimetric compactness `4*pi*A / P^2`, clamped to [0, 1].
    ///
    /// A round dot scores near 1; elongated glare streaks score low.
    pub fn compactness(&self) -> f32 {
        if self.perimeter <= 0.0 {
            return 1.0;
        }
        (4.0 * std::f32::consts::PI * self.area / (self.perimeter * self.perimeter)).min(1.0)
    }
}

/// Label 4-connected foreground regions, scan order top-left first.
pub fn find_blobs(mask: &Mask) -> Vec<Blob> {
    let (w, h) = (mask.width, mask.height);
    let mut visited = vec![false; w * h];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for start_y in 0..h {
        for start_x in 0..w {
            let idx = start_y * w + start_x;
            if visited[idx] || !mask.is_set(start_x, start_y) {
                continue;
            }

            let mut area = 0usize;
            let mut perimeter = 0usize;
            let mut sum_x = 0.0f64;
            let mut sum_y = 0.0f64;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (start_x, start_y, start_x, start_y);

            visited[idx] = true;
            stack.push((start_x, start_y));
            while let Some((x, y)) = stack.pop() {
                area += 1;
                sum_x += x as f64;
                sum_y += y as f64;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let mut on_boundary = false;
                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= w || ny >= h {
                        on_boundary = true;
                        continue;
                    }
                    if !mask.is_set(nx, ny) {
                        on_boundary = true;
                        continue;
                    }
                    let nidx = ny * w + nx;
                    if !visited[nidx] {
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
                if on_boundary {
                    perimeter += 1;
                }
            }

            blobs.push(Blob {
                area: area as f32,
                centroid: Point2::new(
                    (sum_x / area as f64) as f32,
                    (sum_y / area as f64) as f32,
                ),
                bbox: (min_x, min_y, max_x, max_y),
                perimeter: perimeter as f32,
            });
        }
    }

    blobs
}
