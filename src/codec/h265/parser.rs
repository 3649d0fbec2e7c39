// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use enumn::N;

use crate::bitstream_utils::BitReader;
use crate::codec::h264::sar;
use crate::error::ParseError;
use crate::error::ParseResult;
use crate::Resolution;

// 7.4.8: the value of num_negative_pics and num_positive_pics shall be in the
// range of 0 to sps_max_dec_pic_buffering_minus1[ sps_max_sub_layers_minus1 ],
// which itself cannot exceed MaxDpbSize - 1 = 15.
const MAX_SHORT_TERM_REF_PICS: u32 = 16;

/// Table 7-1 – NAL unit type codes and NAL unit type classes
#[derive(N, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaluType {
    #[default]
    TrailN = 0,
    TrailR = 1,
    TsaN = 2,
    TsaR = 3,
    StsaN = 4,
    StsaR = 5,
    RadlN = 6,
    RadlR = 7,
    RaslN = 8,
    RaslR = 9,
    RsvVclN10 = 10,
    RsvVclR11 = 11,
    RsvVclN12 = 12,
    RsvVclR13 = 13,
    RsvVclN14 = 14,
    RsvVclR15 = 15,
    BlaWLp = 16,
    BlaWRadl = 17,
    BlaNLp = 18,
    IdrWRadl = 19,
    IdrNLp = 20,
    CraNut = 21,
    RsvIrapVcl22 = 22,
    RsvIrapVcl23 = 23,
    RsvVcl24 = 24,
    RsvVcl25 = 25,
    RsvVcl26 = 26,
    RsvVcl27 = 27,
    RsvVcl28 = 28,
    RsvVcl29 = 29,
    RsvVcl30 = 30,
    RsvVcl31 = 31,
    VpsNut = 32,
    SpsNut = 33,
    PpsNut = 34,
    AudNut = 35,
    EosNut = 36,
    EobNut = 37,
    FdNut = 38,
    PrefixSeiNut = 39,
    SuffixSeiNut = 40,
    RsvNvcl41 = 41,
    RsvNvcl42 = 42,
    RsvNvcl43 = 43,
    RsvNvcl44 = 44,
    RsvNvcl45 = 45,
    RsvNvcl46 = 46,
    RsvNvcl47 = 47,
    UnspecNvcl48 = 48,
    UnspecNvcl49 = 49,
    UnspecNvcl50 = 50,
    UnspecNvcl51 = 51,
    UnspecNvcl52 = 52,
    UnspecNvcl53 = 53,
    UnspecNvcl54 = 54,
    UnspecNvcl55 = 55,
    UnspecNvcl56 = 56,
    UnspecNvcl57 = 57,
    UnspecNvcl58 = 58,
    UnspecNvcl59 = 59,
    UnspecNvcl60 = 60,
    UnspecNvcl61 = 61,
    UnspecNvcl62 = 62,
    UnspecNvcl63 = 63,
}

impl NaluType {
    /// Extracts the NAL unit type from the first byte of a NAL unit header.
    pub fn classify(byte: u8) -> Self {
        // Every value of the 6-bit field has a variant.
        Self::n((byte >> 1) & 0x3f).unwrap_or_default()
    }

    /// Whether this is an IDR NALU.
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::IdrWRadl | Self::IdrNLp)
    }

    /// Whether this is an IRAP NALU.
    pub fn is_irap(&self) -> bool {
        let type_ = *self as u32;
        type_ >= Self::BlaWLp as u32 && type_ <= Self::RsvIrapVcl23 as u32
    }

    /// Whether this is a VCL NALU.
    pub fn is_vcl(&self) -> bool {
        (*self as u32) < Self::VpsNut as u32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NaluHeader {
    /// The NALU type.
    pub type_: NaluType,
    /// Specifies the identifier of the layer to which a VCL NAL unit belongs or
    /// the identifier of a layer to which a non-VCL NAL unit applies.
    pub nuh_layer_id: u8,
    /// Minus 1 specifies a temporal identifier for the NAL unit. The value of
    /// nuh_temporal_id_plus1 shall not be equal to 0.
    pub nuh_temporal_id_plus1: u8,
}

impl NaluHeader {
    /// Parses the 2-byte header at the start of `data`.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let truncated = ParseError::Truncated {
            position: 0,
            requested: 16,
        };
        let data = data.get(..Self::len()).ok_or_else(|| truncated.clone())?;
        let mut r = bitreader::BitReader::new(data);

        // Skip forbidden_zero_bit
        r.skip(1).map_err(|_| truncated.clone())?;

        let type_ = r.read_u8(6).map_err(|_| truncated.clone())?;
        let nuh_layer_id = r.read_u8(6).map_err(|_| truncated.clone())?;
        let nuh_temporal_id_plus1 = r.read_u8(3).map_err(|_| truncated)?;

        Ok(Self {
            type_: NaluType::n(type_).unwrap_or_default(),
            nuh_layer_id,
            nuh_temporal_id_plus1,
        })
    }

    /// The length of the header, 7.3.1.2.
    pub const fn len() -> usize {
        2
    }
}

/// profile_tier_level() data for the general profile, 7.3.3.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileTierLevel {
    /// Specifies the context for the interpretation of general_profile_idc and
    /// general_profile_compatibility_flag[ j ].
    pub general_profile_space: u8,
    /// Specifies the tier context for the interpretation of general_level_idc.
    pub general_tier_flag: bool,
    /// Indicates a profile to which the CVS conforms.
    pub general_profile_idc: u8,
    /// general_profile_compatibility_flag[ 0..32 ], flag 0 being the most
    /// significant bit.
    pub general_profile_compatibility_flags: u32,
    /// The 48 bits following the compatibility flags: the four source flags,
    /// the profile-specific constraint flags and the reserved bits, first flag
    /// in bit 47.
    pub general_constraint_indicator_flags: u64,
    /// Indicates a level to which the CVS conforms.
    pub general_level_idc: u8,
}

impl ProfileTierLevel {
    /// general_profile_compatibility_flag[ j ].
    pub fn general_profile_compatibility_flag(&self, j: usize) -> bool {
        j < 32 && (self.general_profile_compatibility_flags >> (31 - j)) & 1 == 1
    }

    pub fn general_progressive_source_flag(&self) -> bool {
        self.constraint_indicator_flag(0)
    }

    pub fn general_interlaced_source_flag(&self) -> bool {
        self.constraint_indicator_flag(1)
    }

    pub fn general_non_packed_constraint_flag(&self) -> bool {
        self.constraint_indicator_flag(2)
    }

    pub fn general_frame_only_constraint_flag(&self) -> bool {
        self.constraint_indicator_flag(3)
    }

    fn constraint_indicator_flag(&self, i: u32) -> bool {
        (self.general_constraint_indicator_flags >> (47 - i)) & 1 == 1
    }
}

/// Conformance cropping window, in units of chroma samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConformanceWindow {
    pub left_offset: u32,
    pub right_offset: u32,
    pub top_offset: u32,
    pub bottom_offset: u32,
}

/// DPB sizing for one temporal sub-layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubLayerOrderingInfo {
    /// Plus 1 specifies the maximum required size of the decoded picture
    /// buffer in units of picture storage buffers.
    pub max_dec_pic_buffering_minus1: u8,
    /// Indicates the maximum allowed number of pictures that can precede any
    /// picture in decoding order and follow it in output order.
    pub max_num_reorder_pics: u8,
    /// When not 0, used to compute SpsMaxLatencyPictures.
    pub max_latency_increase_plus1: u32,
}

/// A st_ref_pic_set( ) syntax structure, 7.3.7.
///
/// Sets coded through inter RPS prediction only keep `num_delta_pocs`, which
/// is all that later sets predicting from them need.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortTermRefPicSet {
    /// When true, specifies that this set is predicted from another one.
    pub inter_ref_pic_set_prediction_flag: bool,
    /// Plus 1 specifies the distance to the set this one is predicted from.
    /// Only coded for the set carried in a slice header.
    pub delta_idx_minus1: u32,
    /// The number of entries with a negative POC delta.
    pub num_negative_pics: u32,
    /// The number of entries with a positive POC delta.
    pub num_positive_pics: u32,
    /// NumDeltaPocs for this set.
    pub num_delta_pocs: u32,
    /// delta_poc_s0_minus1[ i ] + 1, as coded.
    pub delta_poc_s0: Vec<u32>,
    pub used_by_curr_pic_s0: Vec<bool>,
    /// delta_poc_s1_minus1[ i ] + 1, as coded.
    pub delta_poc_s1: Vec<u32>,
    pub used_by_curr_pic_s1: Vec<bool>,
}

/// Restrictions signalled at the end of the VUI, E.2.1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitstreamRestrictions {
    pub tiles_fixed_structure_flag: bool,
    pub motion_vectors_over_pic_boundaries_flag: bool,
    pub restricted_ref_pic_lists_flag: bool,
    pub min_spatial_segmentation_idc: u32,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_min_cu_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
}

/// VUI parameters, E.2.1.
///
/// Fields guarded by a presence flag are left at zero when the flag is not
/// set. HRD parameters are not parsed: when `hrd_parameters_present_flag` is
/// set, nothing after it (i.e. the bitstream restrictions) is available.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VuiParams {
    pub aspect_ratio_info_present_flag: bool,
    pub aspect_ratio_idc: u8,
    /// Horizontal size of the sample aspect ratio, either looked up from
    /// `aspect_ratio_idc` or coded explicitly.
    pub sar_width: u16,
    /// Vertical size of the sample aspect ratio.
    pub sar_height: u16,
    pub overscan_info_present_flag: bool,
    pub overscan_appropriate_flag: bool,
    pub video_signal_type_present_flag: bool,
    pub video_format: u8,
    pub video_full_range_flag: bool,
    pub colour_description_present_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coeffs: u8,
    pub chroma_loc_info_present_flag: bool,
    pub chroma_sample_loc_type_top_field: u32,
    pub chroma_sample_loc_type_bottom_field: u32,
    pub neutral_chroma_indication_flag: bool,
    pub field_seq_flag: bool,
    pub frame_field_info_present_flag: bool,
    pub default_display_window_flag: bool,
    pub def_disp_win_left_offset: u32,
    pub def_disp_win_right_offset: u32,
    pub def_disp_win_top_offset: u32,
    pub def_disp_win_bottom_offset: u32,
    pub timing_info_present_flag: bool,
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub poc_proportional_to_timing_flag: bool,
    pub num_ticks_poc_diff_one_minus1: u32,
    pub hrd_parameters_present_flag: bool,
    pub bitstream_restriction_flag: bool,
    pub bitstream_restrictions: Option<BitstreamRestrictions>,
}

/// A H.265 Sequence Parameter Set.
///
/// When `max_sub_layers_minus1` is not 0, only the fields up to and including
/// `profile_tier_level` are parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sps {
    /// The NAL unit header the SPS was carried in.
    pub header: NaluHeader,
    /// Specifies the value of the vps_video_parameter_set_id of the active VPS.
    pub video_parameter_set_id: u8,
    /// `max_sub_layers_minus1` plus 1 specifies the maximum number of temporal
    /// sub-layers that may be present in each CVS referring to the SPS.
    pub max_sub_layers_minus1: u8,
    /// When sps_max_sub_layers_minus1 is greater than 0, specifies whether
    /// inter prediction is additionally restricted for CVSs referring to the
    /// SPS.
    pub temporal_id_nesting_flag: bool,
    /// profile_tier_level() data.
    pub profile_tier_level: ProfileTierLevel,
    /// Provides an identifier for the SPS for reference by other syntax
    /// elements.
    pub seq_parameter_set_id: u8,
    /// Specifies the chroma sampling relative to the luma sampling as specified
    /// in clause 6.2.
    pub chroma_format_idc: u8,
    /// When true, specifies that the three colour components of the 4:4:4
    /// chroma format are coded separately.
    pub separate_colour_plane_flag: bool,
    /// Specifies the width of each decoded picture in units of luma samples.
    pub pic_width_in_luma_samples: u32,
    /// Specifies the height of each decoded picture in units of luma samples.
    pub pic_height_in_luma_samples: u32,
    /// When true, indicates that the conformance cropping window offset
    /// parameters follow next in the SPS.
    pub conformance_window_flag: bool,
    pub conformance_window: ConformanceWindow,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    /// Specifies the value of the variable MaxPicOrderCntLsb that is used in
    /// the decoding process for picture order count.
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    /// When true, `sub_layer_ordering_info` holds one entry per sub-layer.
    /// Otherwise it only holds the entry for the highest sub-layer, which
    /// applies to all of them.
    pub sub_layer_ordering_info_present_flag: bool,
    pub sub_layer_ordering_info: Vec<SubLayerOrderingInfo>,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_luma_transform_block_size_minus2: u8,
    pub log2_diff_max_min_luma_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub scaling_list_enabled_flag: bool,
    /// When true, scaling_list_data( ) was present. Its contents are skipped.
    pub scaling_list_data_present_flag: bool,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub pcm_loop_filter_disabled_flag: bool,
    pub num_short_term_ref_pic_sets: u32,
    pub short_term_ref_pic_sets: Vec<ShortTermRefPicSet>,
    pub long_term_ref_pics_present_flag: bool,
    /// The number of long-term reference picture candidates. The candidates
    /// themselves are skipped.
    pub num_long_term_ref_pics_sps: u32,
    pub temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub vui_parameters_present_flag: bool,
    pub vui_parameters: Option<VuiParams>,
}

impl Sps {
    /// ChromaArrayType, 7.4.3.2.1.
    pub fn chroma_array_type(&self) -> u8 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    pub fn bit_depth_luma(&self) -> u32 {
        u32::from(self.bit_depth_luma_minus8) + 8
    }

    pub fn bit_depth_chroma(&self) -> u32 {
        u32::from(self.bit_depth_chroma_minus8) + 8
    }

    /// MaxPicOrderCntLsb, or `None` if the coded exponent is out of range.
    pub fn max_pic_order_cnt_lsb(&self) -> Option<u32> {
        1u32.checked_shl(u32::from(self.log2_max_pic_order_cnt_lsb_minus4) + 4)
    }

    // (7-10)
    pub fn min_cb_log2_size_y(&self) -> u32 {
        u32::from(self.log2_min_luma_coding_block_size_minus3) + 3
    }

    // (7-11)
    pub fn ctb_log2_size_y(&self) -> u32 {
        self.min_cb_log2_size_y() + u32::from(self.log2_diff_max_min_luma_coding_block_size)
    }

    // (7-13)
    pub fn ctb_size_y(&self) -> Option<u32> {
        1u32.checked_shl(self.ctb_log2_size_y())
    }

    /// The size of the pictures once the conformance window is applied.
    pub fn display_resolution(&self) -> Resolution {
        display_resolution(
            self.pic_width_in_luma_samples,
            self.pic_height_in_luma_samples,
            &self.conformance_window,
            self.chroma_format_idc,
        )
    }
}

/// SubWidthC and SubHeightC from Table 6-1. Monochrome, 4:4:4 and reserved
/// formats are not subsampled.
pub fn chroma_subsampling(chroma_format_idc: u8) -> (u32, u32) {
    match chroma_format_idc {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    }
}

/// Applies `conf_win` to a `width`x`height` picture.
///
/// Offsets are not validated against the picture size: a window larger than
/// the picture wraps around rather than failing.
pub fn display_resolution(
    width: u32,
    height: u32,
    conf_win: &ConformanceWindow,
    chroma_format_idc: u8,
) -> Resolution {
    let (sub_width_c, sub_height_c) = chroma_subsampling(chroma_format_idc);

    Resolution {
        width: width.wrapping_sub(
            conf_win
                .left_offset
                .wrapping_add(conf_win.right_offset)
                .wrapping_mul(sub_width_c),
        ),
        height: height.wrapping_sub(
            conf_win
                .top_offset
                .wrapping_add(conf_win.bottom_offset)
                .wrapping_mul(sub_height_c),
        ),
    }
}

/// A parsed value along with the first error hit while parsing it.
///
/// When `error` is set, `value` is only reliable up to the syntax element
/// where parsing failed; everything after it holds default values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    pub error: Option<ParseError>,
}

impl<T> Decoded<T> {
    /// Whether parsing went through without errors.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discards partially parsed values.
    pub fn into_result(self) -> ParseResult<T> {
        match self.error {
            None => Ok(self.value),
            Some(err) => Err(err),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Whether the payload still contains emulation prevention bytes that
    /// must be removed before parsing.
    pub needs_epb: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a SPS NALU, starting with its NAL unit header.
    ///
    /// Fails outright only if the header is missing or does not announce a
    /// SPS. Errors found in the payload are reported in the returned
    /// [`Decoded`], along with everything parsed before them.
    pub fn parse_sps(&self, data: &[u8]) -> ParseResult<Decoded<Sps>> {
        let header = NaluHeader::parse(data)?;
        if !matches!(header.type_, NaluType::SpsNut) {
            return Err(ParseError::WrongUnitType(header.type_));
        }

        log::debug!("Parsing SPS ({} bytes)", data.len());

        let mut r = BitReader::new(&data[NaluHeader::len()..], self.config.needs_epb);
        let mut sps = Sps {
            header,
            ..Default::default()
        };

        Self::parse_sps_rbsp(&mut sps, &mut r);

        Ok(Decoded {
            value: sps,
            error: r.into_status(),
        })
    }

    fn parse_sps_rbsp(sps: &mut Sps, r: &mut BitReader) {
        sps.video_parameter_set_id = r.read_bits(4);
        sps.max_sub_layers_minus1 = r.read_bits(3);
        sps.temporal_id_nesting_flag = r.read_bit();

        Self::parse_profile_tier_level(&mut sps.profile_tier_level, r);

        if sps.max_sub_layers_minus1 != 0 {
            // The sub-layer part of profile_tier_level() is not supported, and
            // nothing after it can be located without it.
            log::debug!(
                "SPS has {} sub-layers, stopping after profile_tier_level()",
                u32::from(sps.max_sub_layers_minus1) + 1
            );
            return;
        }

        sps.seq_parameter_set_id = r.read_ue();
        sps.chroma_format_idc = r.read_ue();
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = r.read_bit();
        }

        sps.pic_width_in_luma_samples = r.read_ue();
        sps.pic_height_in_luma_samples = r.read_ue();

        sps.conformance_window_flag = r.read_bit();
        if sps.conformance_window_flag {
            sps.conformance_window = ConformanceWindow {
                left_offset: r.read_ue(),
                right_offset: r.read_ue(),
                top_offset: r.read_ue(),
                bottom_offset: r.read_ue(),
            };
        }

        sps.bit_depth_luma_minus8 = r.read_ue();
        sps.bit_depth_chroma_minus8 = r.read_ue();
        sps.log2_max_pic_order_cnt_lsb_minus4 = r.read_ue();

        sps.sub_layer_ordering_info_present_flag = r.read_bit();
        let first = if sps.sub_layer_ordering_info_present_flag {
            0
        } else {
            sps.max_sub_layers_minus1
        };
        for _ in first..=sps.max_sub_layers_minus1 {
            sps.sub_layer_ordering_info.push(SubLayerOrderingInfo {
                max_dec_pic_buffering_minus1: r.read_ue(),
                max_num_reorder_pics: r.read_ue(),
                max_latency_increase_plus1: r.read_ue(),
            });
        }

        sps.log2_min_luma_coding_block_size_minus3 = r.read_ue();
        sps.log2_diff_max_min_luma_coding_block_size = r.read_ue();
        sps.log2_min_luma_transform_block_size_minus2 = r.read_ue();
        sps.log2_diff_max_min_luma_transform_block_size = r.read_ue();
        sps.max_transform_hierarchy_depth_inter = r.read_ue();
        sps.max_transform_hierarchy_depth_intra = r.read_ue();

        sps.scaling_list_enabled_flag = r.read_bit();
        if sps.scaling_list_enabled_flag {
            sps.scaling_list_data_present_flag = r.read_bit();
            if sps.scaling_list_data_present_flag {
                Self::skip_scaling_list_data(r);
            }
        }

        sps.amp_enabled_flag = r.read_bit();
        sps.sample_adaptive_offset_enabled_flag = r.read_bit();

        sps.pcm_enabled_flag = r.read_bit();
        if sps.pcm_enabled_flag {
            sps.pcm_sample_bit_depth_luma_minus1 = r.read_bits(4);
            sps.pcm_sample_bit_depth_chroma_minus1 = r.read_bits(4);
            sps.log2_min_pcm_luma_coding_block_size_minus3 = r.read_ue();
            sps.log2_diff_max_min_pcm_luma_coding_block_size = r.read_ue();
            sps.pcm_loop_filter_disabled_flag = r.read_bit();
        }

        sps.num_short_term_ref_pic_sets = r.read_ue();
        for i in 0..sps.num_short_term_ref_pic_sets {
            let st = Self::parse_short_term_ref_pic_set(
                r,
                i,
                sps.num_short_term_ref_pic_sets,
                &sps.short_term_ref_pic_sets,
            );
            sps.short_term_ref_pic_sets.push(st);

            // Later sets may be predicted from this one, don't go on with a
            // broken one.
            if r.has_failed() {
                log::warn!(
                    "Stopping SPS parsing at st_ref_pic_set({}) of {}",
                    i,
                    sps.num_short_term_ref_pic_sets
                );
                return;
            }
        }

        sps.long_term_ref_pics_present_flag = r.read_bit();
        if sps.long_term_ref_pics_present_flag {
            sps.num_long_term_ref_pics_sps = r.read_ue();
            let lt_ref_pic_poc_lsb_len = usize::from(sps.log2_max_pic_order_cnt_lsb_minus4) + 4;
            for _ in 0..sps.num_long_term_ref_pics_sps {
                if r.has_failed() {
                    break;
                }

                // lt_ref_pic_poc_lsb_sps[ i ] and used_by_curr_pic_lt_sps_flag[ i ]
                r.skip_bits(lt_ref_pic_poc_lsb_len);
                r.skip_bits(1);
            }
        }

        sps.temporal_mvp_enabled_flag = r.read_bit();
        sps.strong_intra_smoothing_enabled_flag = r.read_bit();

        sps.vui_parameters_present_flag = r.read_bit();
        if sps.vui_parameters_present_flag {
            sps.vui_parameters = Some(Self::parse_vui_parameters(r));
        }
    }

    fn parse_profile_tier_level(ptl: &mut ProfileTierLevel, r: &mut BitReader) {
        ptl.general_profile_space = r.read_bits(2);
        ptl.general_tier_flag = r.read_bit();
        ptl.general_profile_idc = r.read_bits(5);
        ptl.general_profile_compatibility_flags = r.read_bits(32);
        ptl.general_constraint_indicator_flags = r.read_bits(48);
        ptl.general_level_idc = r.read_bits(8);
    }

    /// Moves `r` past a scaling_list_data( ) structure, 7.3.4.
    fn skip_scaling_list_data(r: &mut BitReader) {
        for size_id in 0..4 {
            let step = if size_id == 3 { 3 } else { 1 };
            for _matrix_id in (0..6).step_by(step) {
                let scaling_list_pred_mode_flag = r.read_bit();
                if !scaling_list_pred_mode_flag {
                    // scaling_list_pred_matrix_id_delta
                    r.read_ue::<u64>();
                } else {
                    let coef_num = std::cmp::min(64, 1 << (4 + (size_id << 1)));

                    // scaling_list_dc_coef_minus8 and scaling_list_delta_coef
                    // are se(v), which takes as many bits as ue(v).
                    if size_id > 1 {
                        r.read_ue::<u64>();
                    }

                    for _ in 0..coef_num {
                        r.read_ue::<u64>();
                    }
                }
            }
        }
    }

    /// Parses st_ref_pic_set( `st_rps_idx` ), 7.3.7.
    ///
    /// `previous` holds the sets already parsed from the same SPS, which the
    /// set may be predicted from. Passing `st_rps_idx ==
    /// num_short_term_ref_pic_sets` parses the set coded in a slice header.
    pub fn parse_short_term_ref_pic_set(
        r: &mut BitReader,
        st_rps_idx: u32,
        num_short_term_ref_pic_sets: u32,
        previous: &[ShortTermRefPicSet],
    ) -> ShortTermRefPicSet {
        let mut st = ShortTermRefPicSet::default();

        if st_rps_idx != 0 {
            st.inter_ref_pic_set_prediction_flag = r.read_bit();
        }

        if st.inter_ref_pic_set_prediction_flag {
            if st_rps_idx == num_short_term_ref_pic_sets {
                st.delta_idx_minus1 = r.read_ue();
            }

            let delta_idx = u64::from(st.delta_idx_minus1) + 1;
            if delta_idx > u64::from(st_rps_idx) {
                r.set_error(ParseError::Malformed(format!(
                    "delta_idx {} greater than st_rps_idx {}",
                    delta_idx, st_rps_idx
                )));
                return st;
            }

            // delta_rps_sign and abs_delta_rps_minus1 only matter to the
            // derivation of the actual POCs.
            r.skip_bits(1);
            r.read_ue::<u64>();

            let ref_rps_idx = (u64::from(st_rps_idx) - delta_idx) as usize;
            let ref_st = match previous.get(ref_rps_idx) {
                Some(ref_st) => ref_st,
                None => {
                    r.set_error(ParseError::Malformed(format!(
                        "st_ref_pic_set({}) has not been parsed",
                        ref_rps_idx
                    )));
                    return st;
                }
            };

            for _ in 0..ref_st.num_delta_pocs {
                let used_by_curr_pic_flag = r.read_bit();
                let use_delta_flag = !used_by_curr_pic_flag && r.read_bit();

                if used_by_curr_pic_flag || use_delta_flag {
                    st.num_delta_pocs += 1;
                }
            }
        } else {
            st.num_negative_pics = r.read_ue();
            st.num_positive_pics = r.read_ue();

            if st.num_negative_pics > MAX_SHORT_TERM_REF_PICS
                || st.num_positive_pics > MAX_SHORT_TERM_REF_PICS
            {
                r.set_error(ParseError::TooManyReferencePictures {
                    num_negative_pics: u64::from(st.num_negative_pics),
                    num_positive_pics: u64::from(st.num_positive_pics),
                });
                return st;
            }

            st.num_delta_pocs = st.num_negative_pics + st.num_positive_pics;

            // The value of delta_poc_s0_minus1 and delta_poc_s1_minus1 shall be
            // in the range of 0 to 2^15 − 1, inclusive.
            for _ in 0..st.num_negative_pics {
                let delta_poc_s0_minus1: u16 = r.read_ue();
                st.delta_poc_s0.push(u32::from(delta_poc_s0_minus1) + 1);
                st.used_by_curr_pic_s0.push(r.read_bit());
            }

            for _ in 0..st.num_positive_pics {
                let delta_poc_s1_minus1: u16 = r.read_ue();
                st.delta_poc_s1.push(u32::from(delta_poc_s1_minus1) + 1);
                st.used_by_curr_pic_s1.push(r.read_bit());
            }
        }

        st
    }

    fn parse_vui_parameters(r: &mut BitReader) -> VuiParams {
        let mut vui = VuiParams::default();

        vui.aspect_ratio_info_present_flag = r.read_bit();
        if vui.aspect_ratio_info_present_flag {
            vui.aspect_ratio_idc = r.read_bits(8);
            if vui.aspect_ratio_idc == sar::EXTENDED_SAR {
                vui.sar_width = r.read_bits(16);
                vui.sar_height = r.read_bits(16);
            } else {
                match sar::sar_from_idc(vui.aspect_ratio_idc) {
                    Ok((sar_width, sar_height)) => {
                        vui.sar_width = sar_width;
                        vui.sar_height = sar_height;
                    }
                    Err(err) => r.set_error(err),
                }
            }
        }

        vui.overscan_info_present_flag = r.read_bit();
        if vui.overscan_info_present_flag {
            vui.overscan_appropriate_flag = r.read_bit();
        }

        vui.video_signal_type_present_flag = r.read_bit();
        if vui.video_signal_type_present_flag {
            vui.video_format = r.read_bits(3);
            vui.video_full_range_flag = r.read_bit();
            vui.colour_description_present_flag = r.read_bit();
            if vui.colour_description_present_flag {
                vui.colour_primaries = r.read_bits(8);
                vui.transfer_characteristics = r.read_bits(8);
                vui.matrix_coeffs = r.read_bits(8);
            }
        }

        vui.chroma_loc_info_present_flag = r.read_bit();
        if vui.chroma_loc_info_present_flag {
            vui.chroma_sample_loc_type_top_field = r.read_ue();
            vui.chroma_sample_loc_type_bottom_field = r.read_ue();
        }

        vui.neutral_chroma_indication_flag = r.read_bit();
        vui.field_seq_flag = r.read_bit();
        vui.frame_field_info_present_flag = r.read_bit();

        vui.default_display_window_flag = r.read_bit();
        if vui.default_display_window_flag {
            vui.def_disp_win_left_offset = r.read_ue();
            vui.def_disp_win_right_offset = r.read_ue();
            vui.def_disp_win_top_offset = r.read_ue();
            vui.def_disp_win_bottom_offset = r.read_ue();
        }

        vui.timing_info_present_flag = r.read_bit();
        if vui.timing_info_present_flag {
            vui.num_units_in_tick = r.read_bits(32);
            vui.time_scale = r.read_bits(32);

            vui.poc_proportional_to_timing_flag = r.read_bit();
            if vui.poc_proportional_to_timing_flag {
                vui.num_ticks_poc_diff_one_minus1 = r.read_ue();
            }

            vui.hrd_parameters_present_flag = r.read_bit();
            if vui.hrd_parameters_present_flag {
                log::debug!("hrd_parameters() is not supported, stopping VUI parsing");
                return vui;
            }
        }

        vui.bitstream_restriction_flag = r.read_bit();
        if vui.bitstream_restriction_flag {
            vui.bitstream_restrictions = Some(BitstreamRestrictions {
                tiles_fixed_structure_flag: r.read_bit(),
                motion_vectors_over_pic_boundaries_flag: r.read_bit(),
                restricted_ref_pic_lists_flag: r.read_bit(),
                min_spatial_segmentation_idc: r.read_ue(),
                max_bytes_per_pic_denom: r.read_ue(),
                max_bits_per_min_cu_denom: r.read_ue(),
                log2_max_mv_length_horizontal: r.read_ue(),
                log2_max_mv_length_vertical: r.read_ue(),
            });
        }

        vui
    }
}

/// Parses a SPS NALU with the default configuration. See
/// [`Parser::parse_sps`].
pub fn parse_sps(data: &[u8]) -> ParseResult<Decoded<Sps>> {
    Parser::default().parse_sps(data)
}
