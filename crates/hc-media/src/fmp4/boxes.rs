//! ISO BMFF box serialization primitives for a single H.264 video track.
//!
//! Each box follows the standard layout: 4-byte size (big-endian u32),
//! 4-byte type (ASCII), then box-specific content.

/// trun flags: data-offset, sample-duration, sample-size, sample-flags,
/// sample-composition-time-offset.
const TRUN_FLAGS: u32 = 0x000001 | 0x000100 | 0x000200 | 0x000400 | 0x000800;

/// Sample flags for a sync sample (depends on no other sample).
pub(crate) const SYNC_SAMPLE_FLAGS: u32 = 0x0200_0000;

/// Sample flags for a non-sync sample (depends on others, non-sync bit set).
pub(crate) const NON_SYNC_SAMPLE_FLAGS: u32 = 0x0101_0000;

const IDENTITY_MATRIX: [u32; 9] = [
    0x0001_0000, 0, 0, //
    0, 0x0001_0000, 0, //
    0, 0, 0x4000_0000,
];

// ---------------------------------------------------------------------------
// Low-level box writing helpers
// ---------------------------------------------------------------------------

/// Write a complete box: size (u32 BE) + type (4 ASCII bytes) + content.
pub(crate) fn write_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let size = (8 + content.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(content);
    out
}

/// Write a container box (size + type + children concatenated).
pub(crate) fn write_container_box(box_type: &[u8; 4], children: &[&[u8]]) -> Vec<u8> {
    let children_len: usize = children.iter().map(|c| c.len()).sum();
    let size = (8 + children_len) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// Full box header: version (u8) + flags (u24).
pub(crate) fn fullbox_header(version: u8, flags: u32) -> [u8; 4] {
    let val = ((version as u32) << 24) | (flags & 0x00FF_FFFF);
    val.to_be_bytes()
}

fn push_matrix(content: &mut Vec<u8>) {
    for v in IDENTITY_MATRIX {
        content.extend_from_slice(&v.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Init segment boxes
// ---------------------------------------------------------------------------

/// `ftyp` with major brand "iso5" (required for fragmented tfdt v1 +
/// trun v1) and compatible brands iso5, iso6, mp41.
pub(crate) fn write_ftyp() -> Vec<u8> {
    let mut content = Vec::with_capacity(20);
    content.extend_from_slice(b"iso5");
    content.extend_from_slice(&0x200u32.to_be_bytes());
    content.extend_from_slice(b"iso5");
    content.extend_from_slice(b"iso6");
    content.extend_from_slice(b"mp41");
    write_box(b"ftyp", &content)
}

/// `mvhd`, version 1 (64-bit times).
pub(crate) fn write_mvhd(timescale: u32, next_track_id: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(112);
    content.extend_from_slice(&fullbox_header(1, 0));
    content.extend_from_slice(&0u64.to_be_bytes()); // creation_time
    content.extend_from_slice(&0u64.to_be_bytes()); // modification_time
    content.extend_from_slice(&timescale.to_be_bytes());
    content.extend_from_slice(&0u64.to_be_bytes()); // duration unknown
    content.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    content.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    content.extend_from_slice(&[0u8; 10]);
    push_matrix(&mut content);
    content.extend_from_slice(&[0u8; 24]); // pre_defined
    content.extend_from_slice(&next_track_id.to_be_bytes());
    write_box(b"mvhd", &content)
}

/// `tkhd`, version 1, flags enabled | in_movie | in_preview.
pub(crate) fn write_tkhd(track_id: u32, width: u32, height: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(96);
    content.extend_from_slice(&fullbox_header(1, 7));
    content.extend_from_slice(&0u64.to_be_bytes()); // creation_time
    content.extend_from_slice(&0u64.to_be_bytes()); // modification_time
    content.extend_from_slice(&track_id.to_be_bytes());
    content.extend_from_slice(&0u32.to_be_bytes()); // reserved
    content.extend_from_slice(&0u64.to_be_bytes()); // duration
    content.extend_from_slice(&[0u8; 8]); // reserved
    content.extend_from_slice(&0u16.to_be_bytes()); // layer
    content.extend_from_slice(&0u16.to_be_bytes()); // alternate_group
    content.extend_from_slice(&0u16.to_be_bytes()); // volume (video)
    content.extend_from_slice(&0u16.to_be_bytes()); // reserved
    push_matrix(&mut content);
    content.extend_from_slice(&(width << 16).to_be_bytes());
    content.extend_from_slice(&(height << 16).to_be_bytes());
    write_box(b"tkhd", &content)
}

/// `mdhd`, version 1, language "und".
pub(crate) fn write_mdhd(timescale: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(36);
    content.extend_from_slice(&fullbox_header(1, 0));
    content.extend_from_slice(&0u64.to_be_bytes());
    content.extend_from_slice(&0u64.to_be_bytes());
    content.extend_from_slice(&timescale.to_be_bytes());
    content.extend_from_slice(&0u64.to_be_bytes());
    content.extend_from_slice(&0x55C4u16.to_be_bytes());
    content.extend_from_slice(&0u16.to_be_bytes());
    write_box(b"mdhd", &content)
}

pub(crate) fn write_hdlr() -> Vec<u8> {
    let name = b"VideoHandler";
    let mut content = Vec::with_capacity(24 + name.len() + 1);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
    content.extend_from_slice(b"vide");
    content.extend_from_slice(&[0u8; 12]);
    content.extend_from_slice(name);
    content.push(0);
    write_box(b"hdlr", &content)
}

fn write_vmhd() -> Vec<u8> {
    let mut content = Vec::with_capacity(12);
    content.extend_from_slice(&fullbox_header(0, 1));
    content.extend_from_slice(&[0u8; 8]); // graphicsmode + opcolor
    write_box(b"vmhd", &content)
}

fn write_dinf() -> Vec<u8> {
    // self-contained data reference
    let url = write_box(b"url ", &fullbox_header(0, 1));
    let mut dref = Vec::with_capacity(8 + url.len());
    dref.extend_from_slice(&fullbox_header(0, 0));
    dref.extend_from_slice(&1u32.to_be_bytes());
    dref.extend_from_slice(&url);
    let dref = write_box(b"dref", &dref);
    write_container_box(b"dinf", &[&dref])
}

/// Empty sample table entry boxes; fragments carry the real sample data.
fn write_empty_table(box_type: &[u8; 4], zero_fields: usize) -> Vec<u8> {
    let mut content = Vec::with_capacity(4 + zero_fields * 4);
    content.extend_from_slice(&fullbox_header(0, 0));
    for _ in 0..zero_fields {
        content.extend_from_slice(&0u32.to_be_bytes());
    }
    write_box(box_type, &content)
}

/// `stsd` with a single `avc1` sample entry carrying the `avcC` record.
pub(crate) fn write_avc1_stsd(width: u32, height: u32, avcc: &[u8]) -> Vec<u8> {
    let mut entry = Vec::with_capacity(78 + avcc.len() + 8);
    entry.extend_from_slice(&[0u8; 6]); // reserved
    entry.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
    entry.extend_from_slice(&[0u8; 16]); // pre_defined + reserved
    entry.extend_from_slice(&(width as u16).to_be_bytes());
    entry.extend_from_slice(&(height as u16).to_be_bytes());
    entry.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // 72 dpi
    entry.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    entry.extend_from_slice(&0u32.to_be_bytes());
    entry.extend_from_slice(&1u16.to_be_bytes()); // frame_count
    entry.extend_from_slice(&[0u8; 32]); // compressorname
    entry.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
    entry.extend_from_slice(&(-1i16).to_be_bytes());
    if !avcc.is_empty() {
        entry.extend_from_slice(&write_box(b"avcC", avcc));
    }
    let avc1 = write_box(b"avc1", &entry);

    let mut content = Vec::with_capacity(8 + avc1.len());
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&1u32.to_be_bytes());
    content.extend_from_slice(&avc1);
    write_box(b"stsd", &content)
}

pub(crate) fn write_video_trak(
    track_id: u32,
    timescale: u32,
    width: u32,
    height: u32,
    avcc: &[u8],
) -> Vec<u8> {
    let stbl = write_container_box(
        b"stbl",
        &[
            &write_avc1_stsd(width, height, avcc),
            &write_empty_table(b"stts", 1),
            &write_empty_table(b"stsc", 1),
            &write_empty_table(b"stsz", 2),
            &write_empty_table(b"stco", 1),
        ],
    );
    let minf = write_container_box(b"minf", &[&write_vmhd(), &write_dinf(), &stbl]);
    let mdia = write_container_box(b"mdia", &[&write_mdhd(timescale), &write_hdlr(), &minf]);
    write_container_box(b"trak", &[&write_tkhd(track_id, width, height), &mdia])
}

pub(crate) fn write_mvex(track_id: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(24);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&track_id.to_be_bytes());
    content.extend_from_slice(&1u32.to_be_bytes()); // default sample description index
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample duration
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample size
    content.extend_from_slice(&0u32.to_be_bytes()); // default sample flags
    let trex = write_box(b"trex", &content);
    write_container_box(b"mvex", &[&trex])
}

// ---------------------------------------------------------------------------
// Fragment boxes
// ---------------------------------------------------------------------------

pub(crate) fn write_mfhd(sequence_number: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0));
    content.extend_from_slice(&sequence_number.to_be_bytes());
    write_box(b"mfhd", &content)
}

/// `tfhd` with default-base-is-moof (0x020000).
pub(crate) fn write_tfhd(track_id: u32) -> Vec<u8> {
    let mut content = Vec::with_capacity(8);
    content.extend_from_slice(&fullbox_header(0, 0x020000));
    content.extend_from_slice(&track_id.to_be_bytes());
    write_box(b"tfhd", &content)
}

/// `tfdt`, version 1 (64-bit decode time).
pub(crate) fn write_tfdt(base_media_decode_time: u64) -> Vec<u8> {
    let mut content = Vec::with_capacity(12);
    content.extend_from_slice(&fullbox_header(1, 0));
    content.extend_from_slice(&base_media_decode_time.to_be_bytes());
    write_box(b"tfdt", &content)
}

/// A single sample's entry in `trun`.
pub(crate) struct TrunSample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    pub composition_time_offset: i32,
}

/// Bytes taken by one `trun` sample entry.
pub(crate) const TRUN_SAMPLE_SIZE: usize = 16;

/// `trun`, version 1 (signed composition offsets). `data_offset` is relative
/// to the start of the enclosing `moof`.
pub(crate) fn write_trun(samples: &[TrunSample], data_offset: i32) -> Vec<u8> {
    let mut content = Vec::with_capacity(12 + samples.len() * TRUN_SAMPLE_SIZE);
    content.extend_from_slice(&fullbox_header(1, TRUN_FLAGS));
    content.extend_from_slice(&(samples.len() as u32).to_be_bytes());
    content.extend_from_slice(&data_offset.to_be_bytes());
    for s in samples {
        content.extend_from_slice(&s.duration.to_be_bytes());
        content.extend_from_slice(&s.size.to_be_bytes());
        content.extend_from_slice(&s.flags.to_be_bytes());
        content.extend_from_slice(&s.composition_time_offset.to_be_bytes());
    }
    write_box(b"trun", &content)
}

/// `mdat` header only; the caller appends the payload.
pub(crate) fn write_mdat_header(data_size: u64) -> Vec<u8> {
    if data_size + 8 > u32::MAX as u64 {
        let mut hdr = Vec::with_capacity(16);
        hdr.extend_from_slice(&1u32.to_be_bytes());
        hdr.extend_from_slice(b"mdat");
        hdr.extend_from_slice(&(data_size + 16).to_be_bytes());
        hdr
    } else {
        let mut hdr = Vec::with_capacity(8);
        hdr.extend_from_slice(&((data_size + 8) as u32).to_be_bytes());
        hdr.extend_from_slice(b"mdat");
        hdr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    }

    #[test]
    fn test_write_box_size_and_type() {
        let b = write_box(b"test", &[1, 2, 3]);
        assert_eq!(b.len(), 11);
        assert_eq!(read_u32(&b, 0), 11);
        assert_eq!(&b[4..8], b"test");
        assert_eq!(&b[8..], &[1, 2, 3]);
    }

    #[test]
    fn test_ftyp_brands() {
        let ftyp = write_ftyp();
        assert_eq!(ftyp.len(), 28);
        assert_eq!(&ftyp[4..8], b"ftyp");
        assert_eq!(&ftyp[8..12], b"iso5");
    }

    #[test]
    fn test_version1_header_sizes() {
        assert_eq!(write_mvhd(90000, 2).len(), 120);
        assert_eq!(write_tkhd(1, 1280, 720).len(), 104);
        assert_eq!(write_mdhd(90000).len(), 44);
    }

    #[test]
    fn test_tkhd_dimensions_fixed_point() {
        let tkhd = write_tkhd(1, 1280, 720);
        let len = tkhd.len();
        assert_eq!(read_u32(&tkhd, len - 8), 1280 << 16);
        assert_eq!(read_u32(&tkhd, len - 4), 720 << 16);
    }

    #[test]
    fn test_stsd_embeds_avcc() {
        let stsd = write_avc1_stsd(640, 360, &[1, 0x42, 0xC0, 0x1E]);
        // stsd header (8) + fullbox (4) + entry_count (4) then avc1
        assert_eq!(&stsd[20..24], b"avc1");
        let avc1_size = read_u32(&stsd, 16) as usize;
        assert_eq!(&stsd[16 + 8 + 78 + 4..16 + 8 + 78 + 8], b"avcC");
        assert_eq!(16 + avc1_size, stsd.len());
    }

    #[test]
    fn test_trun_entry_layout() {
        let trun = write_trun(
            &[TrunSample {
                duration: 9000,
                size: 42,
                flags: SYNC_SAMPLE_FLAGS,
                composition_time_offset: 0,
            }],
            100,
        );
        assert_eq!(trun.len(), 8 + 12 + TRUN_SAMPLE_SIZE);
        assert_eq!(read_u32(&trun, 8) & 0x00FF_FFFF, TRUN_FLAGS);
        assert_eq!(read_u32(&trun, 12), 1);
        assert_eq!(read_u32(&trun, 16), 100);
        assert_eq!(read_u32(&trun, 20), 9000);
        assert_eq!(read_u32(&trun, 24), 42);
        assert_eq!(read_u32(&trun, 28), SYNC_SAMPLE_FLAGS);
    }

    #[test]
    fn test_mdat_header_normal_and_extended() {
        let hdr = write_mdat_header(100);
        assert_eq!(hdr.len(), 8);
        assert_eq!(read_u32(&hdr, 0), 108);

        let hdr = write_mdat_header(u32::MAX as u64);
        assert_eq!(hdr.len(), 16);
        assert_eq!(read_u32(&hdr, 0), 1);
        assert_eq!(&hdr[4..8], b"mdat");
    }
}
