//! 페이로드 디코더 선택
//!
//! 실제 바이트 레이아웃 해석은 `Unpacker` 구현체 몫이고,
//! 이 모듈은 서버 비트스트림 버전에 맞는 디코더 변형만 고른다.

use bytes::Bytes;

use crate::Result;

/// 디코더 변형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderVersion {
    /// 기본 레이아웃 (NatNet 3.x 이하)
    V3_0,

    /// 신규 레이아웃 (NatNet 4.1+)
    V4_1,
}

impl DecoderVersion {
    /// 비트스트림 버전으로 디코더 선택
    ///
    /// 4.1 이상 4.x, 또는 major 0 (알 수 없음)은 신규 디코더
    pub fn select(major: u8, minor: u8) -> Self {
        match (major, minor) {
            (4, minor) if minor >= 1 => DecoderVersion::V4_1,
            (0, _) => DecoderVersion::V4_1,
            _ => DecoderVersion::V3_0,
        }
    }
}

impl Default for DecoderVersion {
    /// 서버 정보를 받기 전에는 버전 0.0 취급
    fn default() -> Self {
        Self::select(0, 0)
    }
}

/// 프레임/모델 정의 페이로드 디코더
///
/// 백그라운드 태스크 하나에서만 호출되므로 `Sync`는 필요 없음.
/// 연결할 때마다 복제본 하나가 백그라운드 루프로 넘어감.
pub trait Unpacker: Clone + Send + 'static {
    /// 디코딩된 프레임 타입
    type Frame: Send + Sync + 'static;

    /// 디코딩된 모델 정의 타입
    type Descriptors: Send + Sync + 'static;

    /// FRAME_OF_DATA 페이로드 디코딩
    fn unpack_frame(&mut self, version: DecoderVersion, payload: &[u8]) -> Result<Self::Frame>;

    /// MODEL_DEF 페이로드 디코딩
    fn unpack_descriptors(
        &mut self,
        version: DecoderVersion,
        payload: &[u8],
    ) -> Result<Self::Descriptors>;
}

/// 해석하지 않은 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// 선택되었던 디코더
    pub version: DecoderVersion,

    /// 원본 페이로드
    pub payload: Bytes,
}

/// 해석하지 않은 모델 정의
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptors {
    pub version: DecoderVersion,
    pub payload: Bytes,
}

/// 페이로드를 그대로 넘기는 기본 디코더
#[derive(Debug, Clone, Copy, Default)]
pub struct RawUnpacker;

impl Unpacker for RawUnpacker {
    type Frame = RawFrame;
    type Descriptors = RawDescriptors;

    fn unpack_frame(&mut self, version: DecoderVersion, payload: &[u8]) -> Result<RawFrame> {
        Ok(RawFrame {
            version,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    fn unpack_descriptors(
        &mut self,
        version: DecoderVersion,
        payload: &[u8],
    ) -> Result<RawDescriptors> {
        Ok(RawDescriptors {
            version,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_selection() {
        assert_eq!(DecoderVersion::select(4, 1), DecoderVersion::V4_1);
        assert_eq!(DecoderVersion::select(4, 2), DecoderVersion::V4_1);
        assert_eq!(DecoderVersion::select(0, 0), DecoderVersion::V4_1);
        assert_eq!(DecoderVersion::select(0, 7), DecoderVersion::V4_1);

        assert_eq!(DecoderVersion::select(4, 0), DecoderVersion::V3_0);
        assert_eq!(DecoderVersion::select(3, 1), DecoderVersion::V3_0);
        assert_eq!(DecoderVersion::select(2, 9), DecoderVersion::V3_0);
        assert_eq!(DecoderVersion::select(5, 0), DecoderVersion::V3_0);
    }

    #[test]
    fn test_default_is_newer_decoder() {
        assert_eq!(DecoderVersion::default(), DecoderVersion::V4_1);
    }
}
