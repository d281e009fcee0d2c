//! H.264 NAL unit handling.
//!
//! Access units arrive either as lists of raw NAL units or as Annex-B byte
//! streams. This module normalizes both into raw NAL units and converts them
//! into the length-prefixed (AVCC) layout used inside MP4 samples.

use hc_core::{Error, Result};

/// H.264 NAL unit types relevant to segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Coded slice of a non-IDR picture
    NonIdr,
    /// Coded slice of an IDR picture
    Idr,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Access unit delimiter
    Aud,
    /// End of sequence
    EndOfSequence,
    /// End of stream
    EndOfStream,
    /// Filler data
    Filler,
    /// Unknown/other
    Unknown(u8),
}

impl From<u8> for NalUnitType {
    /// Classify from the first byte of a NAL unit (the NAL header).
    fn from(header: u8) -> Self {
        match header & 0x1F {
            1 => NalUnitType::NonIdr,
            5 => NalUnitType::Idr,
            6 => NalUnitType::Sei,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            9 => NalUnitType::Aud,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::Filler,
            v => NalUnitType::Unknown(v),
        }
    }
}

/// Type of a raw NAL unit, `None` for an empty buffer.
pub fn nal_type(nalu: &[u8]) -> Option<NalUnitType> {
    nalu.first().map(|&b| NalUnitType::from(b))
}

/// Whether `data` begins with a 3- or 4-byte Annex-B start code.
pub fn starts_with_start_code(data: &[u8]) -> bool {
    data.starts_with(&[0, 0, 1]) || data.starts_with(&[0, 0, 0, 1])
}

/// Split an Annex-B byte stream into raw NAL units (start codes removed).
///
/// Bytes before the first start code are ignored.
pub fn split_annex_b(data: &[u8]) -> Vec<&[u8]> {
    // (position of the start code, position of the NAL payload)
    let mut starts = Vec::new();
    let mut i = 0;

    while i + 2 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            let code_start = if i > 0 && data[i - 1] == 0 { i - 1 } else { i };
            starts.push((code_start, i + 3));
            i += 3;
            continue;
        }
        i += 1;
    }

    let mut units = Vec::with_capacity(starts.len());
    for (idx, &(_, payload)) in starts.iter().enumerate() {
        let end = starts
            .get(idx + 1)
            .map(|&(code_start, _)| code_start)
            .unwrap_or(data.len());
        if payload < end {
            units.push(&data[payload..end]);
        }
    }
    units
}

/// Flatten an access unit into raw NAL units.
///
/// Each buffer is either a raw NAL unit or an Annex-B stream carrying one or
/// more NAL units. Empty units are dropped.
pub fn normalize_access_unit(buffers: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(buffers.len());
    for buf in buffers {
        if starts_with_start_code(buf) {
            out.extend(split_annex_b(buf).into_iter().map(<[u8]>::to_vec));
        } else if !buf.is_empty() {
            out.push(buf.clone());
        }
    }
    out
}

/// Whether the access unit contains an IDR slice.
pub fn is_random_access(nalus: &[Vec<u8>]) -> bool {
    nalus
        .iter()
        .any(|n| nal_type(n) == Some(NalUnitType::Idr))
}

/// Serialize an access unit as an MP4 sample: every NAL unit prefixed with
/// its 4-byte big-endian length. Delimiters and filler are not stored.
pub fn access_unit_to_avcc(nalus: &[Vec<u8>]) -> Vec<u8> {
    let kept = nalus.iter().filter(|n| {
        !matches!(
            nal_type(n),
            None | Some(NalUnitType::Aud) | Some(NalUnitType::Filler)
        )
    });

    let mut out = Vec::new();
    for nalu in kept {
        out.extend_from_slice(&(nalu.len() as u32).to_be_bytes());
        out.extend_from_slice(nalu);
    }
    out
}

/// Build an AVCDecoderConfigurationRecord (`avcC` payload) from one SPS and
/// one PPS.
pub fn decoder_configuration(sps: &[u8], pps: &[u8]) -> Result<Vec<u8>> {
    if sps.len() < 4 {
        return Err(Error::Media(format!("SPS too short ({} bytes)", sps.len())));
    }
    if pps.is_empty() {
        return Err(Error::Media("PPS is empty".into()));
    }

    let mut out = Vec::with_capacity(11 + sps.len() + pps.len());
    out.push(1); // configurationVersion
    out.push(sps[1]); // AVCProfileIndication
    out.push(sps[2]); // profile_compatibility
    out.push(sps[3]); // AVCLevelIndication
    out.push(0xFC | 3); // lengthSizeMinusOne = 3
    out.push(0xE0 | 1); // numOfSequenceParameterSets = 1
    out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    out.extend_from_slice(sps);
    out.push(1); // numOfPictureParameterSets
    out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    out.extend_from_slice(pps);
    Ok(out)
}

/// RFC 6381 codec string for an SPS, e.g. `avc1.42c01e`.
pub fn codec_string(sps: &[u8]) -> Result<String> {
    if sps.len() < 4 {
        return Err(Error::Media(format!("SPS too short ({} bytes)", sps.len())));
    }
    Ok(format!("avc1.{:02x}{:02x}{:02x}", sps[1], sps[2], sps[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 6] = [0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02];
    const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

    #[test]
    fn test_nal_type_classification() {
        assert_eq!(NalUnitType::from(0x65), NalUnitType::Idr);
        assert_eq!(NalUnitType::from(0x41), NalUnitType::NonIdr);
        assert_eq!(NalUnitType::from(0x67), NalUnitType::Sps);
        assert_eq!(NalUnitType::from(0x68), NalUnitType::Pps);
        assert_eq!(NalUnitType::from(0x09), NalUnitType::Aud);
        assert_eq!(NalUnitType::from(0x00), NalUnitType::Unknown(0));
        assert_eq!(nal_type(&[]), None);
    }

    #[test]
    fn test_split_three_byte_start_code() {
        let data = [0x00, 0x00, 0x01, 0x09, 0x10];
        let units = split_annex_b(&data);
        assert_eq!(units, vec![&[0x09, 0x10][..]]);
    }

    #[test]
    fn test_split_mixed_start_codes() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, // SPS with 4-byte code
            0x00, 0x00, 0x01, 0x68, 0xCE, // PPS with 3-byte code
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, // IDR
        ];
        let units = split_annex_b(&data);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0], &[0x67, 0x42]);
        assert_eq!(units[1], &[0x68, 0xCE]);
        assert_eq!(units[2], &[0x65, 0x88, 0x84]);
    }

    #[test]
    fn test_split_without_start_code() {
        assert!(split_annex_b(&[0x65, 0x88]).is_empty());
        assert!(split_annex_b(&[]).is_empty());
    }

    #[test]
    fn test_normalize_mixed_buffers() {
        let au = vec![
            vec![0x00, 0x00, 0x01, 0x09, 0x10],
            vec![],
            vec![0x41, 0x9A],
        ];
        let nalus = normalize_access_unit(&au);
        assert_eq!(nalus, vec![vec![0x09, 0x10], vec![0x41, 0x9A]]);
    }

    #[test]
    fn test_random_access_detection() {
        assert!(is_random_access(&[SPS.to_vec(), PPS.to_vec(), vec![0x65, 0x88]]));
        assert!(!is_random_access(&[vec![0x09, 0x10], vec![0x41, 0x9A]]));
    }

    #[test]
    fn test_avcc_sample_drops_delimiters() {
        let sample = access_unit_to_avcc(&[vec![0x09, 0x10], vec![0x65, 0x88, 0x84]]);
        assert_eq!(sample, vec![0, 0, 0, 3, 0x65, 0x88, 0x84]);
    }

    #[test]
    fn test_decoder_configuration_layout() {
        let avcc = decoder_configuration(&SPS, &PPS).unwrap();
        assert_eq!(avcc[0], 1);
        assert_eq!(&avcc[1..4], &[0x42, 0xC0, 0x1E]);
        assert_eq!(avcc[4], 0xFF);
        assert_eq!(avcc[5], 0xE1);
        assert_eq!(u16::from_be_bytes([avcc[6], avcc[7]]) as usize, SPS.len());
        assert_eq!(&avcc[8..8 + SPS.len()], &SPS);
        let pps_at = 8 + SPS.len();
        assert_eq!(avcc[pps_at], 1);
        assert_eq!(&avcc[pps_at + 3..], &PPS);
    }

    #[test]
    fn test_decoder_configuration_rejects_short_sps() {
        assert!(decoder_configuration(&[0x67, 0x42], &PPS).is_err());
        assert!(decoder_configuration(&SPS, &[]).is_err());
    }

    #[test]
    fn test_codec_string() {
        assert_eq!(codec_string(&SPS).unwrap(), "avc1.42c01e");
    }
}
