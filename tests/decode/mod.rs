use pngio::{
  decode, decode_with, ChunkLimits, CrcPolicy, DecodeError, DecodeOptions, PngError, RGBA8,
};

use super::{adam7_split, pack_samples, rand_bytes, PngBuilder};

const VERIFY: DecodeOptions =
  DecodeOptions { crc: CrcPolicy::Verify, chunk_limits: ChunkLimits::both(64 * 1024 * 1024) };

fn gray(y: u8, a: u8) -> RGBA8 {
  RGBA8 { r: y, g: y, b: y, a }
}

/// Adds a "no filter" byte in front of every line.
fn unfiltered(lines: &[&[u8]]) -> Vec<u8> {
  let mut out = Vec::new();
  for line in lines {
    out.push(0);
    out.extend_from_slice(line);
  }
  out
}

#[test]
fn test_decode_gray_low_depths() {
  for bit_depth in [1_u8, 2, 4] {
    let max = (1_u8 << bit_depth) - 1;
    for width in [1_u32, 3, 7, 10, 13] {
      let height = 3;
      let samples: Vec<u8> =
        rand_bytes((width * height) as usize).into_iter().map(|b| b & max).collect();
      let mut filtered = Vec::new();
      for row in samples.chunks(width as usize) {
        filtered.push(0);
        filtered.extend(pack_samples(bit_depth, row));
      }
      let png = PngBuilder::new().ihdr(width, height, bit_depth, 0, 0).idat(&filtered).iend();
      let raster = decode(&png).unwrap();
      assert_eq!(raster.pixels().len(), samples.len());
      for (px, s) in raster.pixels().iter().zip(&samples) {
        let y = (u32::from(*s) * 255 / u32::from(max)) as u8;
        assert_eq!(*px, gray(y, 255), "depth {bit_depth}, width {width}");
      }
    }
  }
}

#[test]
fn test_decode_gray8_trns_key() {
  let png = PngBuilder::new()
    .ihdr(4, 1, 8, 0, 0)
    .chunk(*b"tRNS", &[0, 7])
    .idat(&unfiltered(&[&[0, 7, 8, 255]]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(raster.pixels(), &[gray(0, 255), gray(7, 0), gray(8, 255), gray(255, 255)]);
}

#[test]
fn test_decode_gray16_keeps_high_byte_and_matches_full_key() {
  let png = PngBuilder::new()
    .ihdr(3, 1, 16, 0, 0)
    .chunk(*b"tRNS", &[0x12, 0x34])
    .idat(&unfiltered(&[&[0x12, 0x34, 0x12, 0x35, 0xFF, 0x00]]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(raster.pixels(), &[gray(0x12, 0), gray(0x12, 255), gray(0xFF, 255)]);
}

#[test]
fn test_decode_rgb8_trns_key() {
  let png = PngBuilder::new()
    .ihdr(2, 1, 8, 2, 0)
    .chunk(*b"tRNS", &[0, 1, 0, 2, 0, 3])
    .idat(&unfiltered(&[&[1, 2, 3, 1, 2, 4]]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(raster.as_bytes(), &[1, 2, 3, 0, 1, 2, 4, 255]);
}

#[test]
fn test_decode_rgb16() {
  let png = PngBuilder::new()
    .ihdr(1, 2, 16, 2, 0)
    .chunk(*b"tRNS", &[0xAB, 0x00, 0xCD, 0x00, 0xEF, 0x00])
    .idat(&unfiltered(&[
      &[0xAB, 0x01, 0xCD, 0x02, 0xEF, 0x03],
      &[0xAB, 0x00, 0xCD, 0x00, 0xEF, 0x00],
    ]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(raster.as_bytes(), &[0xAB, 0xCD, 0xEF, 255, 0xAB, 0xCD, 0xEF, 0]);
}

#[test]
fn test_decode_indexed_with_alphas() {
  let palette = [10, 20, 30, 40, 50, 60, 70, 80, 90];
  let line = pack_samples(2, &[0, 1, 2, 1, 0]);
  let png = PngBuilder::new()
    .ihdr(5, 1, 2, 3, 0)
    .chunk(*b"PLTE", &palette)
    .chunk(*b"tRNS", &[0, 128])
    .idat(&unfiltered(&[&line[..]]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(
    raster.pixels(),
    &[
      RGBA8 { r: 10, g: 20, b: 30, a: 0 },
      RGBA8 { r: 40, g: 50, b: 60, a: 128 },
      RGBA8 { r: 70, g: 80, b: 90, a: 255 },
      RGBA8 { r: 40, g: 50, b: 60, a: 128 },
      RGBA8 { r: 10, g: 20, b: 30, a: 0 },
    ]
  );
}

#[test]
fn test_decode_indexed8_without_trns_is_opaque() {
  let png = PngBuilder::new()
    .ihdr(2, 1, 8, 3, 0)
    .chunk(*b"PLTE", &[1, 2, 3, 4, 5, 6])
    .idat(&unfiltered(&[&[1, 0]]))
    .iend();
  let raster = decode(&png).unwrap();
  assert_eq!(raster.as_bytes(), &[4, 5, 6, 255, 1, 2, 3, 255]);
}

#[test]
fn test_decode_palette_index_out_of_range() {
  let line = pack_samples(2, &[0, 3]);
  let png = PngBuilder::new()
    .ihdr(2, 1, 2, 3, 0)
    .chunk(*b"PLTE", &[10, 20, 30, 40, 50, 60, 70, 80, 90])
    .idat(&unfiltered(&[&line[..]]))
    .iend();
  assert_eq!(decode(&png).unwrap_err(), DecodeError::Decode(PngError::PaletteIndexOutOfRange));
}

#[test]
fn test_decode_missing_and_illegal_palette() {
  let missing = PngBuilder::new().ihdr(1, 1, 8, 3, 0).idat(&unfiltered(&[&[0]])).iend();
  assert_eq!(decode(&missing).unwrap_err(), DecodeError::Decode(PngError::MissingPalette));

  let illegal = PngBuilder::new()
    .ihdr(1, 1, 8, 3, 0)
    .chunk(*b"PLTE", &[1, 2, 3, 4])
    .idat(&unfiltered(&[&[0]]))
    .iend();
  assert_eq!(decode(&illegal).unwrap_err(), DecodeError::Decode(PngError::IllegalPalette));
}

#[test]
fn test_decode_gray_alpha_and_rgba16() {
  let ya8 = PngBuilder::new().ihdr(1, 1, 8, 4, 0).idat(&unfiltered(&[&[9, 100]])).iend();
  assert_eq!(decode(&ya8).unwrap().pixels(), &[gray(9, 100)]);

  let ya16 =
    PngBuilder::new().ihdr(1, 1, 16, 4, 0).idat(&unfiltered(&[&[0x10, 0x11, 0x80, 0x81]])).iend();
  assert_eq!(decode(&ya16).unwrap().pixels(), &[gray(0x10, 0x80)]);

  let rgba16 = PngBuilder::new()
    .ihdr(1, 1, 16, 6, 0)
    .idat(&unfiltered(&[&[1, 0xFF, 2, 0xFF, 3, 0xFF, 4, 0xFF]]))
    .iend();
  assert_eq!(decode(&rgba16).unwrap().as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn test_decode_adam7_rgba8() {
  let (width, height) = (13_usize, 9_usize);
  let bytes = rand_bytes(width * height * 4);
  let pixels: Vec<[u8; 4]> =
    bytes.chunks_exact(4).map(|c| <[u8; 4]>::try_from(c).unwrap()).collect();
  let mut filtered = Vec::new();
  for reduced in adam7_split(width, height, &pixels) {
    for row in reduced {
      filtered.push(0);
      filtered.extend(row.iter().flatten());
    }
  }
  let png =
    PngBuilder::new().ihdr(width as u32, height as u32, 8, 6, 1).idat(&filtered).iend();
  let raster = decode(&png).unwrap();
  assert_eq!((raster.width(), raster.height()), (13, 9));
  assert_eq!(raster.as_bytes(), &bytes[..]);
}

#[test]
fn test_decode_adam7_gray1() {
  let (width, height) = (11_usize, 7_usize);
  let samples: Vec<u8> = rand_bytes(width * height).into_iter().map(|b| b & 1).collect();
  let mut filtered = Vec::new();
  for reduced in adam7_split(width, height, &samples) {
    for row in reduced {
      filtered.push(0);
      filtered.extend(pack_samples(1, &row));
    }
  }
  let png = PngBuilder::new().ihdr(width as u32, height as u32, 1, 0, 1).idat(&filtered).iend();
  let raster = decode(&png).unwrap();
  for (px, s) in raster.pixels().iter().zip(&samples) {
    assert_eq!(*px, gray(if *s == 1 { 255 } else { 0 }, 255));
  }
}

#[test]
fn test_decode_idat_split_across_chunks() {
  let filtered = unfiltered(&[&[1, 2, 3, 4, 5, 6, 7, 8], &[9, 10, 11, 12, 13, 14, 15, 16]]);
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  let mut builder = PngBuilder::new().ihdr(2, 2, 8, 6, 0);
  for (i, piece) in zlib.chunks(1).enumerate() {
    if i == 3 {
      builder = builder.chunk(*b"IDAT", &[]);
    }
    builder = builder.chunk(*b"IDAT", piece);
  }
  let png = builder.iend();
  let raster = decode_with(&png, VERIFY).unwrap();
  assert_eq!(raster.as_bytes(), &(1..=16).collect::<Vec<u8>>()[..]);
}

#[test]
fn test_decode_idat_split_at_every_point() {
  let pixels = rand_bytes(16 * 16 * 4);
  let mut filtered = Vec::new();
  for row in pixels.chunks_exact(16 * 4) {
    filtered.push(0);
    filtered.extend_from_slice(row);
  }
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  for cut in 0..=zlib.len() {
    let (first, second) = zlib.split_at(cut);
    let png = PngBuilder::new()
      .ihdr(16, 16, 8, 6, 0)
      .chunk(*b"IDAT", first)
      .chunk(*b"IDAT", second)
      .iend();
    match decode_with(&png, VERIFY) {
      Ok(raster) => assert_eq!(raster.as_bytes(), &pixels[..], "cut at {cut}"),
      Err(e) => panic!("cut at {cut} of {}: {e:?}", zlib.len()),
    }
  }
}

#[test]
fn test_decode_end_of_stream_alone_in_last_idat() {
  // the final 5 bytes of the stream, the Adler-32 and the byte before it,
  // come in their own IDAT after the scanline data is complete.
  let filtered = unfiltered(&[&[10, 20, 30, 40], &[50, 60, 70, 80]]);
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
  let (first, second) = zlib.split_at(zlib.len() - 5);
  let png = PngBuilder::new()
    .ihdr(1, 2, 8, 6, 0)
    .chunk(*b"IDAT", first)
    .chunk(*b"IDAT", second)
    .iend();
  let raster = decode_with(&png, VERIFY).unwrap();
  assert_eq!(raster.as_bytes(), &[10, 20, 30, 40, 50, 60, 70, 80]);
}

#[test]
fn test_decode_skips_ancillary_chunks_and_trailing_data() {
  let filtered = unfiltered(&[&[1, 2, 3, 4]]);
  let png = PngBuilder::new()
    .ihdr(1, 1, 8, 6, 0)
    .chunk(*b"gAMA", &45455_u32.to_be_bytes())
    .chunk(*b"abCd", b"private data")
    .idat(&filtered)
    .chunk(*b"IDAT", &[1, 2, 3])
    .chunk(*b"tEXt", b"Comment\0after the image")
    .iend();
  let raster = decode_with(&png, VERIFY).unwrap();
  assert_eq!(raster.as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn test_decode_ignores_misshapen_trns() {
  let png = PngBuilder::new()
    .ihdr(1, 1, 8, 0, 0)
    .chunk(*b"tRNS", &[0, 7, 0])
    .idat(&unfiltered(&[&[7]]))
    .iend();
  assert_eq!(decode(&png).unwrap().pixels(), &[gray(7, 255)]);
}

#[test]
fn test_decode_header_errors() {
  assert_eq!(
    decode(b"definitely not a png").unwrap_err(),
    DecodeError::HeaderParse(PngError::BytesAreNotPng)
  );
  let no_ihdr = PngBuilder::new().idat(&[0, 0, 0, 0, 0]).iend();
  assert_eq!(decode(&no_ihdr).unwrap_err(), DecodeError::HeaderParse(PngError::MissingIhdr));
  assert_eq!(
    decode(&PNG_SIGNATURE_ONLY).unwrap_err(),
    DecodeError::HeaderParse(PngError::MissingIhdr)
  );
  let zero = PngBuilder::new().ihdr(0, 1, 8, 6, 0).iend();
  assert_eq!(decode(&zero).unwrap_err(), DecodeError::HeaderParse(PngError::ZeroDimension));
  let bad_depth = PngBuilder::new().ihdr(1, 1, 3, 0, 0).iend();
  assert_eq!(decode(&bad_depth).unwrap_err(), DecodeError::HeaderParse(PngError::IhdrIllegalData));
  let good = PngBuilder::new().ihdr(4, 4, 8, 6, 0).iend();
  assert_eq!(
    decode(&good[..20]).unwrap_err(),
    DecodeError::HeaderParse(PngError::ChunkTruncated)
  );
}

const PNG_SIGNATURE_ONLY: [u8; 8] = pngio::png::PNG_SIGNATURE;

#[test]
fn test_decode_body_errors() {
  let filtered = unfiltered(&[&[1, 2, 3, 4], &[5, 6, 7, 8]]);

  let no_iend = PngBuilder::new().ihdr(1, 2, 8, 6, 0).idat(&filtered).0;
  assert_eq!(decode(&no_iend).unwrap_err(), DecodeError::Decode(PngError::MissingIend));

  let no_idat = PngBuilder::new().ihdr(1, 2, 8, 6, 0).iend();
  assert_eq!(decode(&no_idat).unwrap_err(), DecodeError::Decode(PngError::IdatNotFound));

  let critical = PngBuilder::new().ihdr(1, 2, 8, 6, 0).chunk(*b"ABCD", &[]).idat(&filtered).iend();
  assert_eq!(
    decode(&critical).unwrap_err(),
    DecodeError::Decode(PngError::UnrecognizedCriticalChunk)
  );

  let short = PngBuilder::new().ihdr(1, 2, 8, 6, 0).idat(&filtered[..5]).iend();
  assert_eq!(decode(&short).unwrap_err(), DecodeError::Decode(PngError::ImageDataTruncated));

  let mut long_data = filtered.clone();
  long_data.extend_from_slice(&[0, 9, 9, 9, 9]);
  let long = PngBuilder::new().ihdr(1, 2, 8, 6, 0).idat(&long_data).iend();
  assert_eq!(decode(&long).unwrap_err(), DecodeError::Decode(PngError::ImageDataOverflow));

  let mut bad_filter = filtered.clone();
  bad_filter[5] = 5;
  let bad = PngBuilder::new().ihdr(1, 2, 8, 6, 0).idat(&bad_filter).iend();
  assert_eq!(decode(&bad).unwrap_err(), DecodeError::Decode(PngError::IllegalFilterType));

  let not_zlib = PngBuilder::new().ihdr(1, 2, 8, 6, 0).chunk(*b"IDAT", &[0xFF; 16]).iend();
  assert!(matches!(decode(&not_zlib).unwrap_err(), DecodeError::Decode(_)));
}

#[test]
fn test_decode_truncated_file() {
  let pixels = rand_bytes(8 * 8 * 4);
  let png = pngio::encode_to_vec(&pixels, 8, 8).unwrap();
  for cut in [34, png.len() / 2, png.len() - 13, png.len() - 1] {
    match decode(&png[..cut]) {
      Err(DecodeError::Decode(_)) => (),
      other => panic!("cut at {cut}: {other:?}"),
    }
  }
}

#[test]
fn test_decode_crc_policy() {
  let mut png = PngBuilder::new()
    .ihdr(1, 1, 8, 6, 0)
    .chunk(*b"abCd", b"some bytes")
    .idat(&unfiltered(&[&[1, 2, 3, 4]]))
    .iend();
  // signature (8) + IHDR (25) + length and type (8), then the data.
  png[8 + 25 + 8] ^= 0xFF;
  assert!(decode(&png).is_ok());
  assert_eq!(decode_with(&png, VERIFY).unwrap_err(), DecodeError::Decode(PngError::CrcMismatch));

  let mut bad_ihdr_crc = PngBuilder::new().ihdr(1, 1, 8, 6, 0).iend();
  bad_ihdr_crc[8 + 8 + 13] ^= 0xFF;
  assert_eq!(
    decode_with(&bad_ihdr_crc, VERIFY).unwrap_err(),
    DecodeError::HeaderParse(PngError::CrcMismatch)
  );
}

#[test]
fn test_decode_adler32_policy() {
  let mut zlib = miniz_oxide::deflate::compress_to_vec_zlib(&unfiltered(&[&[1, 2, 3, 4]]), 6);
  let last = zlib.len() - 1;
  zlib[last] ^= 0xFF;
  let png = PngBuilder::new().ihdr(1, 1, 8, 6, 0).chunk(*b"IDAT", &zlib).iend();
  assert_eq!(decode(&png).unwrap().as_bytes(), &[1, 2, 3, 4]);
  assert_eq!(
    decode_with(&png, VERIFY).unwrap_err(),
    DecodeError::Decode(PngError::Adler32Mismatch)
  );
}

#[test]
fn test_decode_chunk_limits() {
  let png = PngBuilder::new()
    .ihdr(1, 1, 8, 6, 0)
    .chunk(*b"abCd", &[0; 8])
    .idat(&unfiltered(&[&[1, 2, 3, 4]]))
    .iend();
  let tight = DecodeOptions {
    chunk_limits: ChunkLimits { standard: 1024, unknown: 4 },
    ..DecodeOptions::default()
  };
  assert_eq!(
    decode_with(&png, tight).unwrap_err(),
    DecodeError::Decode(PngError::ChunkLimitExceeded)
  );
  let roomy = DecodeOptions {
    chunk_limits: ChunkLimits { standard: 1024, unknown: 8 },
    ..DecodeOptions::default()
  };
  assert!(decode_with(&png, roomy).is_ok());

  let zero = DecodeOptions { chunk_limits: ChunkLimits::both(0), ..DecodeOptions::default() };
  assert_eq!(decode_with(&png, zero).unwrap_err(), DecodeError::Session);
}

#[test]
fn test_decode_size_errors() {
  // the filtered data of a 16-bit RGBA image this big can't be addressed.
  let huge = PngBuilder::new().ihdr(0x7FFF_FFFF, 0x7FFF_FFFF, 16, 6, 0).iend();
  assert_eq!(decode(&huge).unwrap_err(), DecodeError::SizeComputation);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_decode_allocation_error() {
  // the size fits in a usize, but no allocator can provide it.
  let huge = PngBuilder::new().ihdr(0x7FFF_FFFF, 0x7FFF_FFFF, 8, 6, 0).iend();
  let bytes = 0x7FFF_FFFF_usize * 0x7FFF_FFFF * 4;
  assert_eq!(decode(&huge).unwrap_err(), DecodeError::Allocation { bytes });
}
