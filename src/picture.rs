use super::binary_reader::*;
use super::common::*;
use std::io;

/// 8-bit planar 4:2:0 picture.
pub struct Picture {
    pub width: usize,
    pub height: usize,
    /// Y, Cb, Cr, each stored row by row without padding.
    pub planes: [Vec<u8>; 3],
}

impl Picture {
    pub fn new(width: usize, height: usize) -> Picture {
        let chroma = (width / 2) * (height / 2);
        Picture {
            width,
            height,
            planes: [vec![0; width * height], vec![0; chroma], vec![0; chroma]],
        }
    }

    pub fn frame_size(width: usize, height: usize) -> usize {
        width * height + 2 * (width / 2) * (height / 2)
    }

    /// Reads the next picture; `Ok(None)` at the end of the input.
    pub fn read(reader: &mut BinaryReader, width: usize, height: usize) -> io::Result<Option<Picture>> {
        let mut frame = vec![0u8; Picture::frame_size(width, height)];
        if !reader.read_frame(&mut frame)? {
            return Ok(None);
        }
        let luma = width * height;
        let chroma = (width / 2) * (height / 2);
        Ok(Some(Picture {
            width,
            height,
            planes: [
                frame[..luma].to_vec(),
                frame[luma..luma + chroma].to_vec(),
                frame[luma + chroma..].to_vec(),
            ],
        }))
    }

    fn plane_size(&self, c: usize) -> (usize, usize) {
        if c == 0 {
            (self.width, self.height)
        } else {
            (self.width / 2, self.height / 2)
        }
    }

    /// Sample at (x, y) of plane `c`, replicating the right and bottom
    /// edges for macroblocks that stick out of the picture.
    pub fn sample(&self, c: usize, x: usize, y: usize) -> u8 {
        let (w, h) = self.plane_size(c);
        self.planes[c][y.min(h - 1) * w + x.min(w - 1)]
    }

    /// pcm_sample_luma followed by pcm_sample_chroma (Cb then Cr) of one
    /// macroblock, in raster order.
    pub fn pcm_samples(&self, mb_x: usize, mb_y: usize, out: &mut [u8; PCM_MB_BYTES]) {
        let mut i = 0;
        for y in 0..MB_SIZE {
            for x in 0..MB_SIZE {
                out[i] = self.sample(0, mb_x * MB_SIZE + x, mb_y * MB_SIZE + y);
                i += 1;
            }
        }
        let half = MB_SIZE / 2;
        for c in 1..3 {
            for y in 0..half {
                for x in 0..half {
                    out[i] = self.sample(c, mb_x * half + x, mb_y * half + y);
                    i += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_works() {
        let data = (0..Picture::frame_size(4, 2) * 2)
            .map(|i| i as u8)
            .collect::<Vec<u8>>();
        let mut reader = BinaryReader::vec(&data);
        let picture = Picture::read(&mut reader, 4, 2).unwrap().unwrap();
        assert_eq!(picture.planes[0], vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(picture.planes[1], vec![8, 9]);
        assert_eq!(picture.planes[2], vec![10, 11]);
        let picture = Picture::read(&mut reader, 4, 2).unwrap().unwrap();
        assert_eq!(picture.planes[2], vec![22, 23]);
        assert!(Picture::read(&mut reader, 4, 2).unwrap().is_none());
    }

    #[test]
    fn pcm_samples_replicate_edges() {
        let mut picture = Picture::new(18, 2);
        for y in 0..2 {
            for x in 0..18 {
                picture.planes[0][y * 18 + x] = (10 * y + x) as u8;
            }
        }
        picture.planes[1] = (0..9).collect();
        picture.planes[2] = (100..109).collect();

        let mut out = [0u8; PCM_MB_BYTES];
        picture.pcm_samples(1, 0, &mut out);
        // columns 16 and 17 exist, the rest repeats column 17
        assert_eq!(&out[..4], &[16, 17, 17, 17]);
        assert_eq!(&out[16..18], &[26, 27]);
        // rows past the bottom repeat row 1
        assert_eq!(out[2 * 16], 26);
        assert_eq!(out[15 * 16 + 15], 27);
        assert_eq!(&out[256..259], &[8, 8, 8]);
        assert_eq!(out[256 + 64], 108);

        picture.pcm_samples(0, 0, &mut out);
        assert_eq!(&out[..3], &[0, 1, 2]);
        assert_eq!(&out[256..259], &[0, 1, 2]);
        assert_eq!(out[256 + 8], 0);
    }
}
