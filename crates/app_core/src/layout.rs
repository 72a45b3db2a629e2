//! Grid and fit-to-viewport geometry

use crate::settings::GridLayout;
use crate::AppError;
use std::ops::Range;

/// Axis-aligned rectangle in pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point test, left/top edges inclusive
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Is `other` inside this rect, allowing `eps` of float slack?
    pub fn contains_rect(&self, other: &Rect, eps: f32) -> bool {
        other.x >= self.x - eps
            && other.y >= self.y - eps
            && other.right() <= self.right() + eps
            && other.bottom() <= self.bottom() + eps
    }

    /// Do the interiors overlap? Shared edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink by `amount` on every side
    pub fn inset(&self, amount: f32) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }
}

/// Compute grid cells for `item_count` items, row-major.
///
/// At most `columns * rows` cells are returned; callers page through larger
/// catalogs with [`GridPager`].
pub fn grid_geometry(
    viewport_w: f32,
    viewport_h: f32,
    grid: GridLayout,
    margin: f32,
    item_count: usize,
) -> Result<Vec<Rect>, AppError> {
    if grid.columns == 0 || grid.rows == 0 {
        return Err(AppError::InvalidGeometry(format!(
            "grid {}x{} has no cells",
            grid.columns, grid.rows
        )));
    }

    let cols = grid.columns as f32;
    let rows = grid.rows as f32;
    let cell_w = ((viewport_w - (cols + 1.0) * margin) / cols).floor();
    let cell_h = ((viewport_h - (rows + 1.0) * margin) / rows).floor();

    if !(cell_w > 0.0 && cell_h > 0.0) {
        return Err(AppError::InvalidGeometry(format!(
            "viewport {}x{} too small for a {}x{} grid",
            viewport_w, viewport_h, grid.columns, grid.rows
        )));
    }

    let count = item_count.min(grid.cells());
    let columns = grid.columns as usize;

    Ok((0..count)
        .map(|i| {
            let col = (i % columns) as f32;
            let row = (i / columns) as f32;
            Rect::new(
                margin + col * (cell_w + margin),
                margin + row * (cell_h + margin),
                cell_w,
                cell_h,
            )
        })
        .collect())
}

/// Scale an image uniformly to fit the viewport, centered
pub fn fit_rect(image_w: u32, image_h: u32, viewport_w: f32, viewport_h: f32) -> Result<Rect, AppError> {
    fit_rect_within(image_w, image_h, Rect::from_size(viewport_w, viewport_h))
}

/// Scale an image uniformly to fit `bounds`, centered inside it.
///
/// The result always spans the full width or the full height of `bounds`.
pub fn fit_rect_within(image_w: u32, image_h: u32, bounds: Rect) -> Result<Rect, AppError> {
    if image_w == 0 || image_h == 0 {
        return Err(AppError::InvalidGeometry(format!(
            "image size {}x{}",
            image_w, image_h
        )));
    }
    if !(bounds.width > 0.0 && bounds.height > 0.0) {
        return Err(AppError::InvalidGeometry(format!(
            "bounds {}x{}",
            bounds.width, bounds.height
        )));
    }

    let iw = image_w as f32;
    let ih = image_h as f32;
    let scale_x = bounds.width / iw;
    let scale_y = bounds.height / ih;

    let (width, height) = if scale_x <= scale_y {
        (bounds.width, (ih * scale_x).min(bounds.height))
    } else {
        ((iw * scale_y).min(bounds.width), bounds.height)
    };

    Ok(Rect::new(
        bounds.x + (bounds.width - width) / 2.0,
        bounds.y + (bounds.height - height) / 2.0,
        width,
        height,
    ))
}

/// Index of the first rect containing the point
pub fn hit_test(rects: &[Rect], x: f32, y: f32) -> Option<usize> {
    rects.iter().position(|r| r.contains(x, y))
}

/// Splits a catalog into grid pages of `columns * rows` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPager {
    per_page: usize,
    item_count: usize,
}

impl GridPager {
    pub fn new(grid: GridLayout, item_count: usize) -> Self {
        Self {
            per_page: grid.cells().max(1),
            item_count,
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn page_count(&self) -> usize {
        self.item_count.div_ceil(self.per_page).max(1)
    }

    pub fn page_of(&self, index: usize) -> usize {
        index / self.per_page
    }

    /// Catalog indices shown on `page`
    pub fn page_range(&self, page: usize) -> Range<usize> {
        let start = (page * self.per_page).min(self.item_count);
        let end = (start + self.per_page).min(self.item_count);
        start..end
    }

    pub fn next_page(&self, page: usize) -> usize {
        (page + 1) % self.page_count()
    }

    pub fn previous_page(&self, page: usize) -> usize {
        let count = self.page_count();
        (page + count - 1) % count
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridKey {
    viewport: (u32, u32),
    grid: GridLayout,
    margin: u32,
    item_count: usize,
}

/// Memoized grid geometry; recomputed only when its inputs change
#[derive(Debug, Default)]
pub struct LayoutCache {
    grid: Option<(GridKey, Vec<Rect>)>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(
        &mut self,
        viewport_w: f32,
        viewport_h: f32,
        grid: GridLayout,
        margin: f32,
        item_count: usize,
    ) -> Result<&[Rect], AppError> {
        let key = GridKey {
            viewport: (viewport_w.to_bits(), viewport_h.to_bits()),
            grid,
            margin: margin.to_bits(),
            item_count,
        };

        let stale = !matches!(&self.grid, Some((cached, _)) if *cached == key);
        if stale {
            let rects = grid_geometry(viewport_w, viewport_h, grid, margin, item_count)?;
            tracing::debug!("Grid geometry recomputed: {} cells", rects.len());
            self.grid = Some((key, rects));
        }

        Ok(self.grid.as_ref().map(|(_, rects)| rects.as_slice()).unwrap_or(&[]))
    }

    pub fn invalidate(&mut self) {
        self.grid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn grid(columns: u32, rows: u32) -> GridLayout {
        GridLayout { columns, rows }
    }

    #[test]
    fn test_grid_count_is_min_of_items_and_cells() {
        for n in 1..=10 {
            let rects = grid_geometry(800.0, 600.0, grid(3, 2), 10.0, n).unwrap();
            assert_eq!(rects.len(), n.min(6));
        }
    }

    #[test]
    fn test_grid_cells_disjoint_and_inside_margin() {
        let shapes = [(1, 1), (3, 2), (4, 4), (7, 3)];
        let viewports = [(800.0, 600.0), (1920.0, 1080.0), (333.0, 217.0)];
        let margin = 10.0;

        for &(c, r) in &shapes {
            for &(vw, vh) in &viewports {
                let rects = grid_geometry(vw, vh, grid(c, r), margin, 100).unwrap();
                let inner = Rect::new(margin, margin, vw - 2.0 * margin, vh - 2.0 * margin);
                for (i, a) in rects.iter().enumerate() {
                    assert!(inner.contains_rect(a, EPS), "{:?} outside {:?}", a, inner);
                    for b in &rects[i + 1..] {
                        assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn test_grid_is_row_major() {
        let rects = grid_geometry(800.0, 600.0, grid(3, 2), 10.0, 6).unwrap();
        assert_eq!(rects[0].y, rects[2].y);
        assert!(rects[1].x > rects[0].x);
        assert!(rects[3].y > rects[0].y);
        assert_eq!(rects[3].x, rects[0].x);
    }

    #[test]
    fn test_grid_too_small_viewport() {
        let err = grid_geometry(20.0, 20.0, grid(3, 2), 10.0, 2).unwrap_err();
        assert!(matches!(err, AppError::InvalidGeometry(_)));
    }

    #[test]
    fn test_fit_rect_properties() {
        let images = [(1000, 1000), (4000, 2000), (300, 1200), (1, 1), (1920, 1080)];
        let viewports = [(1920.0, 1080.0), (800.0, 600.0), (100.0, 400.0)];

        for &(iw, ih) in &images {
            for &(vw, vh) in &viewports {
                let rect = fit_rect(iw, ih, vw, vh).unwrap();
                let viewport = Rect::from_size(vw, vh);
                assert!(viewport.contains_rect(&rect, EPS));

                let touches_x = (rect.x).abs() < EPS && (rect.right() - vw).abs() < EPS;
                let touches_y = (rect.y).abs() < EPS && (rect.bottom() - vh).abs() < EPS;
                assert!(touches_x || touches_y, "{:?} touches no boundary pair", rect);

                let source = iw as f32 / ih as f32;
                let fitted = rect.width / rect.height;
                assert!((source - fitted).abs() / source < 1e-4);
            }
        }
    }

    #[test]
    fn test_fit_rect_letterbox() {
        // scale = min(1920/1000, 1080/1000) = 1.08
        let rect = fit_rect(1000, 1000, 1920.0, 1080.0).unwrap();
        assert!((rect.x - 420.0).abs() < EPS);
        assert!((rect.y).abs() < EPS);
        assert!((rect.width - 1080.0).abs() < EPS);
    }

    #[test]
    fn test_fit_rect_rejects_zero_sizes() {
        assert!(matches!(fit_rect(0, 10, 800.0, 600.0), Err(AppError::InvalidGeometry(_))));
        assert!(matches!(fit_rect(10, 0, 800.0, 600.0), Err(AppError::InvalidGeometry(_))));
        assert!(matches!(fit_rect(10, 10, 0.0, 600.0), Err(AppError::InvalidGeometry(_))));
    }

    #[test]
    fn test_fit_within_offset_bounds() {
        let bounds = Rect::new(50.0, 70.0, 200.0, 100.0);
        let rect = fit_rect_within(400, 400, bounds).unwrap();
        assert!(bounds.contains_rect(&rect, EPS));
        assert!((rect.height - 100.0).abs() < EPS);
        assert!((rect.x - 100.0).abs() < EPS);
    }

    #[test]
    fn test_hit_test_first_match_and_miss() {
        let rects = grid_geometry(800.0, 600.0, grid(3, 2), 10.0, 2).unwrap();
        let (cx, cy) = rects[1].center();
        assert_eq!(hit_test(&rects, cx, cy), Some(1));
        assert_eq!(hit_test(&rects, 2.0, 2.0), None);
        assert_eq!(hit_test(&rects, 790.0, 590.0), None);
    }

    #[test]
    fn test_pager() {
        let pager = GridPager::new(grid(3, 2), 14);
        assert_eq!(pager.page_count(), 3);
        assert_eq!(pager.page_range(0), 0..6);
        assert_eq!(pager.page_range(2), 12..14);
        assert_eq!(pager.page_of(13), 2);
        assert_eq!(pager.next_page(2), 0);
        assert_eq!(pager.previous_page(0), 2);
    }

    #[test]
    fn test_layout_cache_recomputes_on_resize() {
        let mut cache = LayoutCache::new();
        let first = cache.grid(800.0, 600.0, grid(3, 2), 10.0, 6).unwrap().to_vec();
        let again = cache.grid(800.0, 600.0, grid(3, 2), 10.0, 6).unwrap().to_vec();
        assert_eq!(first, again);

        let resized = cache.grid(1600.0, 1200.0, grid(3, 2), 10.0, 6).unwrap();
        assert!(resized[0].width > first[0].width);
    }
}
