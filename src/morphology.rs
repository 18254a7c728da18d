use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;
use std::collections::BTreeMap;

use crate::image_utils::{is_foreground, Mask, BACKGROUND, FOREGROUND};

/// Label image produced by connected-component labelling (0 = background)
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Iterations of a 3x3 square structuring element collapse into one pass at
/// chessboard distance `iterations`
#[inline]
fn square_radius(iterations: u32) -> u8 {
    iterations.min(u8::MAX as u32) as u8
}

/// Apply morphological opening (erosion followed by dilation) with a 3x3 square
/// element, repeated `iterations` times. Removes isolated noise pixels.
pub fn apply_opening(mask: &Mask, iterations: u32) -> Mask {
    if iterations == 0 {
        return mask.clone();
    }

    let k = square_radius(iterations);
    dilate(&erode(mask, Norm::LInf, k), Norm::LInf, k)
}

/// Apply morphological closing (dilation followed by erosion) with a 3x3 square
/// element, repeated `iterations` times. Bridges small gaps inside a stain.
pub fn apply_closing(mask: &Mask, iterations: u32) -> Mask {
    if iterations == 0 {
        return mask.clone();
    }

    let k = square_radius(iterations);
    erode(&dilate(mask, Norm::LInf, k), Norm::LInf, k)
}

/// Fill enclosed background holes of at most `max_hole_area` pixels.
///
/// Large stains come out of adaptive thresholding as rings, because their
/// interior is as dark as its own neighbourhood. Holes touching the image
/// border are never filled.
pub fn fill_small_holes(mask: &Mask, max_hole_area: u32) -> Mask {
    if max_hole_area == 0 {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        if is_foreground(mask.get_pixel(x, y)) {
            Luma([BACKGROUND])
        } else {
            Luma([FOREGROUND])
        }
    });

    // Holes are 4-connected so they cannot leak through diagonal gaps of an 8-connected stain
    let holes = connected_components(&inverted, Connectivity::Four, Luma([BACKGROUND]));
    let max_label = holes.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

    let mut areas = vec![0u32; max_label + 1];
    let mut touches_border = vec![false; max_label + 1];
    for (x, y, label) in holes.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        areas[label] += 1;
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            touches_border[label] = true;
        }
    }

    let mut filled = mask.clone();
    let mut filled_count = 0u32;
    for (x, y, label) in holes.enumerate_pixels() {
        let label = label[0] as usize;
        if label != 0 && !touches_border[label] && areas[label] <= max_hole_area {
            filled.put_pixel(x, y, Luma([FOREGROUND]));
            filled_count += 1;
        }
    }

    if filled_count > 0 {
        debug!("Filled {} enclosed hole pixels", filled_count);
    }

    filled
}

/// Label 8-connected foreground components of a mask
pub fn label_components(mask: &Mask) -> LabelImage {
    connected_components(mask, Connectivity::Eight, Luma([BACKGROUND]))
}

/// Outer border of every labelled component, keyed by label.
///
/// Points run along the component's outermost pixels; enclosed holes are not
/// part of the border and pixels on one-pixel-wide spurs appear twice, once
/// per side.
pub fn outer_boundaries(mask: &Mask, labels: &LabelImage) -> BTreeMap<u32, Vec<(u32, u32)>> {
    let (width, height) = mask.dimensions();

    // One pixel of background on every side so components on the image edge get an outer border too
    let padded = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([BACKGROUND])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    });

    let mut boundaries = BTreeMap::new();
    for contour in find_contours::<u32>(&padded) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let Some(first) = contour.points.first() else {
            continue;
        };

        let label = labels.get_pixel(first.x - 1, first.y - 1)[0];
        if label == 0 {
            continue;
        }

        let points = contour.points.iter().map(|p| (p.x - 1, p.y - 1)).collect();
        boundaries.entry(label).or_insert(points);
    }

    debug!("Traced {} outer borders", boundaries.len());
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::count_foreground;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| {
            if rows[y as usize].as_bytes()[x as usize] == b'#' {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }

    #[test]
    fn opening_removes_speckle() {
        let mask = mask_from_rows(&[
            ".......",
            ".#.....",
            "...###.",
            "...###.",
            "...###.",
            ".......",
        ]);
        let opened = apply_opening(&mask, 1);
        assert_eq!(opened.get_pixel(1, 1)[0], BACKGROUND);
        assert_eq!(opened.get_pixel(4, 3)[0], FOREGROUND);
        assert_eq!(count_foreground(&opened), 9);
    }

    #[test]
    fn closing_bridges_a_one_pixel_gap() {
        let mask = mask_from_rows(&[
            ".........",
            ".###.###.",
            ".###.###.",
            ".###.###.",
            ".........",
        ]);
        let closed = apply_closing(&mask, 1);
        assert_eq!(closed.get_pixel(4, 2)[0], FOREGROUND);
    }

    #[test]
    fn zero_iterations_is_identity() {
        let mask = mask_from_rows(&["#..", ".#.", "..#"]);
        assert_eq!(apply_opening(&mask, 0), mask);
        assert_eq!(apply_closing(&mask, 0), mask);
    }

    #[test]
    fn fills_enclosed_hole_but_not_open_background() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let filled = fill_small_holes(&mask, 100);
        assert_eq!(filled.get_pixel(3, 3)[0], FOREGROUND);
        assert_eq!(filled.get_pixel(0, 0)[0], BACKGROUND);
        assert_eq!(count_foreground(&filled), 20);
    }

    #[test]
    fn large_holes_are_kept() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let filled = fill_small_holes(&mask, 5);
        assert_eq!(filled.get_pixel(3, 3)[0], BACKGROUND);
        assert_eq!(fill_small_holes(&mask, 0), mask);
    }

    fn boundary_of(rows: &[&str], x: u32, y: u32) -> Vec<(u32, u32)> {
        let mask = mask_from_rows(rows);
        let labels = label_components(&mask);
        let label = labels.get_pixel(x, y)[0];
        outer_boundaries(&mask, &labels).remove(&label).unwrap()
    }

    #[test]
    fn traces_square_boundary() {
        let boundary = boundary_of(
            &[
                ".....",
                ".###.",
                ".###.",
                ".###.",
                ".....",
            ],
            1,
            1,
        );

        assert_eq!(boundary.len(), 8);
        assert_eq!(boundary[0], (1, 1));
        assert!(!boundary.contains(&(2, 2)));
    }

    #[test]
    fn traces_single_pixel() {
        assert_eq!(boundary_of(&["...", ".#.", "..."], 1, 1), vec![(1, 1)]);
    }

    #[test]
    fn traces_both_sides_of_a_line_on_the_image_edge() {
        let boundary = boundary_of(&["#####"], 0, 0);
        // Out along one side and back along the other
        assert_eq!(boundary.len(), 8);
        assert_eq!(boundary[0], (0, 0));
    }

    #[test]
    fn ring_has_one_outer_border() {
        let rows = [
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ];
        let mask = mask_from_rows(&rows);
        let labels = label_components(&mask);
        let boundaries = outer_boundaries(&mask, &labels);

        assert_eq!(boundaries.len(), 1);
        let boundary = &boundaries[&labels.get_pixel(1, 1)[0]];
        assert_eq!(boundary.len(), 14);
        assert!(boundary.contains(&(5, 4)));
    }

    #[test]
    fn separate_components_get_separate_borders() {
        let mask = mask_from_rows(&["##..##", "##..##"]);
        let labels = label_components(&mask);
        let boundaries = outer_boundaries(&mask, &labels);

        assert_eq!(boundaries.len(), 2);
        for (label, boundary) in &boundaries {
            assert!(boundary.iter().all(|&(x, y)| labels.get_pixel(x, y)[0] == *label));
        }
    }
}
