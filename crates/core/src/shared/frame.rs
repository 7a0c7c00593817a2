use ndarray::ArrayView3;

/// One decoded video frame: contiguous RGB24 bytes in row-major order.
///
/// The aligner samples pixels from this buffer; it never mutates it.
/// Format conversion stays at the I/O boundary.
#[derive(Clone, Debug)]
pub struct SourceFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl SourceFrame {
    /// Returns `None` when the buffer length does not match the
    /// dimensions (width × height × 3).
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at integer coordinates, or `None` outside the frame.
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[offset], self.data[offset + 1], self.data[offset + 2]])
    }

    /// HWC view over the pixel buffer.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, 3),
            &self.data,
        )
        .expect("buffer length checked at construction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_accepts_matching_buffer() {
        let frame = SourceFrame::from_rgb(vec![0u8; 2 * 2 * 3], 2, 2).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_from_rgb_rejects_short_buffer() {
        assert!(SourceFrame::from_rgb(vec![0u8; 10], 2, 2).is_none());
    }

    #[test]
    fn test_pixel_access() {
        // 2x2 RGB, pixel (0, 1) set to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = SourceFrame::from_rgb(data, 2, 2).unwrap();
        assert_eq!(frame.pixel(0, 1), Some([255, 0, 0]));
        assert_eq!(frame.pixel(1, 0), Some([0, 0, 0]));
    }

    #[test]
    fn test_pixel_out_of_bounds_is_none() {
        let frame = SourceFrame::from_rgb(vec![0u8; 12], 2, 2).unwrap();
        assert_eq!(frame.pixel(-1, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_as_ndarray_shape_is_hwc() {
        let frame = SourceFrame::from_rgb(vec![0u8; 4 * 2 * 3], 4, 2).unwrap();
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }
}
