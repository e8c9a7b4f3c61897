use varflow_image::{Image, ImageError, ImageSize};

/// Create a pair of sampling maps by evaluating `f(x, y)` on every pixel.
///
/// # Arguments
///
/// * `cols` - The number of columns of the grid
/// * `rows` - The number of rows of the grid
/// * `f` - Returns the source coordinates `(u, v)` sampled by output pixel `(x, y)`
///
/// # Returns
///
/// The `map_x` and `map_y` images with shape (rows, cols).
pub fn meshgrid_from_fn(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> (f32, f32),
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    let mut map_x = Vec::with_capacity(rows * cols);
    let mut map_y = Vec::with_capacity(rows * cols);

    for r in 0..rows {
        for c in 0..cols {
            let (x, y) = f(c, r);
            map_x.push(x);
            map_y.push(y);
        }
    }

    let size = ImageSize {
        width: cols,
        height: rows,
    };

    Ok((Image::new(size, map_x)?, Image::new(size, map_y)?))
}
