//! 에러 타입 정의

use thiserror::Error;

use crate::client::ConnectionState;

/// NatNet 클라이언트 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("설정 파일 파싱 에러: {0}")]
    Json(#[from] serde_json::Error),

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("이미 연결되어 있음 (현재 상태: {0:?})")]
    AlreadyConnected(ConnectionState),

    #[error("연결되어 있지 않음")]
    NotConnected,

    #[error("서버 응답 타임아웃: {0:?}")]
    Timeout(std::time::Duration),

    #[error("UNDEFINED 요청은 보낼 수 없음")]
    UndefinedRequest,

    #[error("비동기 프레임 소비자가 이미 실행 중")]
    ConsumerBusy,

    #[error("데이터그램이 너무 짧음: 최소 {needed} bytes 필요, {got} bytes 수신")]
    Truncated { needed: usize, got: usize },

    #[error("잘못된 헤더: payload_size={declared}, 실제 {available} bytes")]
    MalformedHeader { declared: u16, available: usize },

    #[error("페이로드가 너무 큼: {len} bytes (최대 {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("페이로드 디코딩 실패: {0}")]
    Decode(String),

    #[error("연결 종료")]
    ConnectionClosed,
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
